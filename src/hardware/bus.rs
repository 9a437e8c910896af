// Half-duplex serial bus for the actuator controller
//
// Dynamixel-1.0-style framing:
//   [0xFF, 0xFF, id, length, instruction, params..., checksum]
// Motors run in velocity mode and take a signed raw speed; servos run in
// position mode and take a 12-bit raw position. This runtime only writes;
// the sole read path is the status packet that acknowledges pings and
// register writes.

use serialport::{self, SerialPort};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BAUDRATE: u32 = 1_000_000;
const RESPONSE_TIMEOUT_MS: u64 = 100;

const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Broadcast id: addressed by sync writes, never answers
const BROADCAST_ID: u8 = 0xFE;

/// Full-scale raw velocity a motor power of 1.0 maps to
const MAX_VELOCITY_RAW: f64 = 3000.0;

/// Raw position for a servo position of 1.0 (12-bit encoder)
const MAX_POSITION_RAW: f64 = 4095.0;

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
enum Instruction {
    Ping = 0x01,
    Write = 0x03,
    SyncWrite = 0x83,
}

/// Writable registers used by the rig
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Register {
    OperatingMode = 33,
    TorqueEnable = 40,
    GoalPosition = 42,
    GoalVelocity = 46,
    Lock = 55,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatingMode {
    Position = 0,
    Velocity = 1,
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed response from channel {id}: {reason}")]
    InvalidResponse { id: u8, reason: String },

    #[error("checksum mismatch from channel {id}")]
    ChecksumMismatch { id: u8 },

    #[error("channel {id} reported fault status 0x{status:02X}")]
    ChannelFault { id: u8, status: u8 },

    #[error("no response from channel {id}")]
    Timeout { id: u8 },
}

pub type Result<T> = std::result::Result<T, BusError>;

/// Serial connection to the actuator controller.
pub struct ActuatorBus {
    port: Box<dyn SerialPort>,
}

impl ActuatorBus {
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(RESPONSE_TIMEOUT_MS))
            .open()?;
        Ok(Self { port })
    }

    /// One's-complement sum over everything after the header
    fn checksum(data: &[u8]) -> u8 {
        let sum: u16 = data.iter().map(|&b| u16::from(b)).sum();
        (!sum & 0xFF) as u8
    }

    fn build_packet(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
        let length = (params.len() + 2) as u8; // instruction + checksum
        let mut packet = Vec::with_capacity(6 + params.len());
        packet.extend_from_slice(&HEADER);
        packet.push(id);
        packet.push(length);
        packet.push(instruction as u8);
        packet.extend_from_slice(params);
        packet.push(Self::checksum(&packet[2..]));
        packet
    }

    fn send(&mut self, packet: &[u8]) -> Result<()> {
        self.port.write_all(packet)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read and validate the status packet that follows a ping or write
    fn read_status(&mut self, expected_id: u8) -> Result<()> {
        let mut header = [0u8; 2];
        self.port.read_exact(&mut header).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                BusError::Timeout { id: expected_id }
            } else {
                BusError::Io(e)
            }
        })?;
        if header != HEADER {
            return Err(BusError::InvalidResponse {
                id: expected_id,
                reason: format!("bad header {header:02X?}"),
            });
        }

        let mut id_length = [0u8; 2];
        self.port.read_exact(&mut id_length)?;
        let id = id_length[0];
        let length = usize::from(id_length[1]);
        if id != expected_id {
            return Err(BusError::InvalidResponse {
                id: expected_id,
                reason: format!("answered as channel {id}"),
            });
        }

        // status byte + params + checksum
        let mut body = vec![0u8; length];
        self.port.read_exact(&mut body)?;

        let mut summed = vec![id, length as u8];
        summed.extend_from_slice(&body[..body.len() - 1]);
        if Self::checksum(&summed) != body[body.len() - 1] {
            return Err(BusError::ChecksumMismatch { id });
        }

        if body[0] != 0 {
            return Err(BusError::ChannelFault { id, status: body[0] });
        }
        Ok(())
    }

    /// Check whether a channel is present on the bus
    pub fn ping(&mut self, id: u8) -> Result<bool> {
        self.send(&Self::build_packet(id, Instruction::Ping, &[]))?;
        match self.read_status(id) {
            Ok(()) => Ok(true),
            Err(BusError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn write_u8(&mut self, id: u8, register: Register, value: u8) -> Result<()> {
        debug!("write u8 id={} reg={:?} value={}", id, register, value);
        self.send(&Self::build_packet(
            id,
            Instruction::Write,
            &[register as u8, value],
        ))?;
        self.read_status(id)
    }

    /// Broadcast the same register to several channels in one packet.
    /// Sync writes are unacknowledged.
    pub fn sync_write_u16(&mut self, register: Register, data: &[(u8, u16)]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        // [start_addr, bytes_per_channel, id, lo, hi, id, lo, hi, ...]
        let mut params = vec![register as u8, 2];
        for &(id, value) in data {
            params.push(id);
            params.push((value & 0xFF) as u8);
            params.push((value >> 8) as u8);
        }

        debug!("sync write {} channels reg={:?}", data.len(), register);
        self.send(&Self::build_packet(
            BROADCAST_ID,
            Instruction::SyncWrite,
            &params,
        ))
    }

    /// Sync-write signed velocities (sign-magnitude on the wire)
    pub fn sync_write_i16(&mut self, register: Register, data: &[(u8, i16)]) -> Result<()> {
        let encoded: Vec<(u8, u16)> = data
            .iter()
            .map(|&(id, value)| (id, encode_sign_magnitude(value)))
            .collect();
        self.sync_write_u16(register, &encoded)
    }

    pub fn enable_torque(&mut self, id: u8) -> Result<()> {
        self.write_u8(id, Register::TorqueEnable, 1)?;
        self.write_u8(id, Register::Lock, 1)
    }

    pub fn disable_torque(&mut self, id: u8) -> Result<()> {
        self.write_u8(id, Register::TorqueEnable, 0)?;
        self.write_u8(id, Register::Lock, 0)
    }

    /// Must be called with torque disabled
    pub fn set_operating_mode(&mut self, id: u8, mode: OperatingMode) -> Result<()> {
        self.write_u8(id, Register::OperatingMode, mode as u8)
    }
}

/// Scale a motor power in [-1, 1] to a raw signed velocity.
/// Out-of-range input is clamped, never an error.
pub fn power_to_raw(power: f64) -> i16 {
    (power.clamp(-1.0, 1.0) * MAX_VELOCITY_RAW).round() as i16
}

/// Scale a servo position in [0, 1] to a raw encoder target.
pub fn position_to_raw(position: f64) -> u16 {
    (position.clamp(0.0, 1.0) * MAX_POSITION_RAW).round() as u16
}

/// Bit 15 carries the sign, bits 0-14 the magnitude
fn encode_sign_magnitude(value: i16) -> u16 {
    if value >= 0 {
        value as u16
    } else {
        0x8000 | (-(i32::from(value)) as u16)
    }
}
