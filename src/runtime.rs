// Fixed-rate control loop with a gamepad watchdog
//
// Each cycle: drain gamepad events into snapshots, run the mapper, write the
// command to the rig. With no gamepad attached the runtime commands stopped
// motors instead of holding the last commanded motion. Ctrl-C leaves the
// loop and runs the stop sequence to completion.

use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::LOOP_HZ;
use crate::gamepad::{GamepadPair, GamepadReader};
use crate::hardware::{ActuatorBus, HardwareMap, Rig};
use crate::mapper::{ActuatorCommand, TeleopMapper};

pub struct RunConfig {
    /// Serial port of the actuator bus controller
    pub port: String,
    /// Run the loop without hardware attached
    pub dry_run: bool,
}

/// Per-run state: the mapper plus watchdog bookkeeping.
pub struct Runtime {
    mapper: TeleopMapper,
    pads_live: bool,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            mapper: TeleopMapper::new(),
            // Start degraded until a pad shows up
            pads_live: false,
        }
    }

    /// Compute this cycle's command, applying the watchdog.
    fn compute(&mut self, pads: &GamepadPair, connected: bool) -> ActuatorCommand {
        if !connected {
            if self.pads_live {
                warn!("Gamepads gone, stopping motors");
            }
            self.pads_live = false;
            return self.mapper.hold_command();
        }
        if !self.pads_live {
            info!("Gamepad input live");
        }
        self.pads_live = true;
        self.mapper.update(pads)
    }

    pub fn mapper(&self) -> &TeleopMapper {
        &self.mapper
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn run(cfg: RunConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut reader = GamepadReader::new().map_err(|e| format!("gamepad init failed: {e}"))?;

    let mut rig = if cfg.dry_run {
        info!("Dry run: commands logged, no hardware writes");
        None
    } else {
        info!("Opening actuator bus on {}", cfg.port);
        let bus = ActuatorBus::open(&cfg.port)?;
        Some(Rig::bind(&HardwareMap::competition_robot(), bus)?)
    };

    let mut runtime = Runtime::new();
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!("Teleop runtime started: {}Hz loop", LOOP_HZ);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let pads = reader.poll();
                let cmd = runtime.compute(&pads, reader.any_connected());

                if let Some(rig) = rig.as_mut() {
                    // A write that fails aborts the run; never skip a cycle
                    // and leave the last command standing silently
                    rig.apply(&cmd)?;
                }

                debug!("basket mode: {:?}", runtime.mapper().mode());
                debug!("command: {}", serde_json::to_string(&cmd)?);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    if let Some(rig) = rig.as_mut() {
        rig.stop()?;
    }
    info!("Teleop runtime stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamepad::GamepadState;
    use crate::mapper::{BasketMode, STOP};

    #[test]
    fn watchdog_stops_motors_without_gamepads() {
        let mut runtime = Runtime::new();
        // Snapshot claims full forward, but nothing is connected
        let pads = GamepadPair {
            driver: GamepadState {
                right_stick_y: -1.0,
                ..Default::default()
            },
            operator: GamepadState::default(),
        };
        let cmd = runtime.compute(&pads, false);
        assert_eq!(cmd.drive_r, STOP);
        assert_eq!(cmd.drive_l, STOP);
    }

    #[test]
    fn watchdog_does_not_touch_mapper_state() {
        let mut runtime = Runtime::new();
        let toggle = GamepadPair {
            driver: GamepadState::default(),
            operator: GamepadState {
                start: true,
                ..Default::default()
            },
        };
        runtime.compute(&toggle, true);
        assert_eq!(runtime.mapper().mode(), BasketMode::Manual);

        // A disconnected cycle must not flip the mode back
        runtime.compute(&toggle, false);
        assert_eq!(runtime.mapper().mode(), BasketMode::Manual);
    }

    #[test]
    fn commands_resume_after_reconnect() {
        let mut runtime = Runtime::new();
        let forward = GamepadPair {
            driver: GamepadState {
                right_stick_y: -1.0,
                ..Default::default()
            },
            operator: GamepadState::default(),
        };
        runtime.compute(&forward, true);
        runtime.compute(&forward, false);
        let cmd = runtime.compute(&forward, true);
        assert!(cmd.drive_r > 0.9);
    }
}
