// Bound actuator set for the competition robot
//
// Binds the twelve named channels at init, converts each cycle's command
// into bus frames, and owns the shutdown stop sequence.

use tracing::{debug, info, warn};

use super::bus::{position_to_raw, power_to_raw, ActuatorBus, BusError, OperatingMode, Register};
use super::registry::{HardwareMap, MotorChannel, RegistryError, ServoChannel};
use crate::mapper::{ActuatorCommand, MAX_POWER};

#[derive(Debug, thiserror::Error)]
pub enum RigError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("channel {id} not responding on the bus")]
    ChannelMissing { id: u8 },
}

/// The twelve bound channels, resolved once from the hardware map.
pub struct Channels {
    drive_fr: MotorChannel,
    drive_fl: MotorChannel,
    drive_br: MotorChannel,
    drive_bl: MotorChannel,
    pickup: MotorChannel,
    lift: MotorChannel,
    knockdown_r: ServoChannel,
    knockdown_l: ServoChannel,
    deposit: ServoChannel,
    basket_rotate: ServoChannel,
    basket_release: ServoChannel,
    basket_tilt: ServoChannel,
}

impl Channels {
    /// Resolve every named channel. Any miss aborts initialization.
    pub fn bind(map: &HardwareMap) -> Result<Self, RegistryError> {
        Ok(Self {
            drive_fr: map.motor("M_driveFR")?,
            drive_fl: map.motor("M_driveFL")?,
            drive_br: map.motor("M_driveBR")?,
            drive_bl: map.motor("M_driveBL")?,
            pickup: map.motor("M_pickup")?,
            lift: map.motor("M_lift")?,
            knockdown_r: map.servo("S_climbersKnockdownR")?,
            knockdown_l: map.servo("S_climbersKnockdownL")?,
            deposit: map.servo("S_climbersDeposit")?,
            basket_rotate: map.servo("S_basketRotate")?,
            basket_release: map.servo("S_basketRelease")?,
            basket_tilt: map.servo("S_basketTilt")?,
        })
    }

    fn motors(&self) -> [MotorChannel; 6] {
        [
            self.drive_fr,
            self.drive_fl,
            self.drive_br,
            self.drive_bl,
            self.pickup,
            self.lift,
        ]
    }

    fn servos(&self) -> [ServoChannel; 6] {
        [
            self.knockdown_r,
            self.knockdown_l,
            self.deposit,
            self.basket_rotate,
            self.basket_release,
            self.basket_tilt,
        ]
    }

    /// Raw velocity frame for one command, mounting direction applied
    pub fn motor_targets(&self, cmd: &ActuatorCommand) -> [(u8, i16); 6] {
        let raw = |channel: &MotorChannel, power: f64| {
            (
                channel.id,
                power_to_raw(channel.oriented(power.clamp(-MAX_POWER, MAX_POWER))),
            )
        };
        [
            raw(&self.drive_fr, cmd.drive_r),
            raw(&self.drive_fl, cmd.drive_l),
            raw(&self.drive_br, cmd.drive_r),
            raw(&self.drive_bl, cmd.drive_l),
            raw(&self.pickup, cmd.pickup),
            raw(&self.lift, cmd.lift),
        ]
    }

    /// Raw position frame for one command
    pub fn servo_targets(&self, cmd: &ActuatorCommand) -> [(u8, u16); 6] {
        [
            (self.knockdown_r.id, position_to_raw(cmd.knockdown_r)),
            (self.knockdown_l.id, position_to_raw(cmd.knockdown_l)),
            (self.deposit.id, position_to_raw(cmd.deposit)),
            (self.basket_rotate.id, position_to_raw(cmd.basket_rotate)),
            (self.basket_release.id, position_to_raw(cmd.basket_release)),
            (self.basket_tilt.id, position_to_raw(cmd.basket_tilt)),
        ]
    }
}

/// Live connection to the robot's actuators.
pub struct Rig {
    bus: ActuatorBus,
    channels: Channels,
}

impl Rig {
    /// Bind and initialize: check every channel answers, then set motors to
    /// velocity mode and servos to position mode with torque re-enabled.
    pub fn bind(map: &HardwareMap, mut bus: ActuatorBus) -> Result<Self, RigError> {
        let channels = Channels::bind(map)?;

        let motor_ids = channels.motors().map(|c| c.id);
        let servo_ids = channels.servos().map(|c| c.id);

        info!("Checking actuator channels {:?} {:?}", motor_ids, servo_ids);
        for id in motor_ids.iter().chain(&servo_ids) {
            match bus.ping(*id) {
                Ok(true) => debug!("channel {} responding", id),
                Ok(false) => return Err(RigError::ChannelMissing { id: *id }),
                Err(e) => return Err(e.into()),
            }
        }

        // Torque must be off while the operating mode changes
        for id in motor_ids.iter().chain(&servo_ids) {
            bus.disable_torque(*id)?;
        }
        for id in motor_ids {
            bus.set_operating_mode(id, OperatingMode::Velocity)?;
        }
        for id in servo_ids {
            bus.set_operating_mode(id, OperatingMode::Position)?;
        }
        for id in motor_ids.iter().chain(&servo_ids) {
            bus.enable_torque(*id)?;
        }

        info!("Rig initialized");
        Ok(Self { bus, channels })
    }

    /// Write one cycle's command: all motor powers, then all servo positions.
    /// A failed write propagates; the cycle must not silently skip.
    pub fn apply(&mut self, cmd: &ActuatorCommand) -> Result<(), BusError> {
        self.bus
            .sync_write_i16(Register::GoalVelocity, &self.channels.motor_targets(cmd))?;
        self.bus
            .sync_write_u16(Register::GoalPosition, &self.channels.servo_targets(cmd))
    }

    /// Fixed stop sequence: every motor to zero power, every servo back to
    /// its start position, whatever was last commanded.
    pub fn stop(&mut self) -> Result<(), BusError> {
        info!("Stopping rig");
        self.apply(&ActuatorCommand::neutral())
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        // Last-resort stop when the rig goes away on an error path
        if let Err(e) = self.stop() {
            warn!("Failed to stop rig on drop: {}", e);
        }
    }
}
