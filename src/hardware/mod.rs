// Hardware access for the competition robot
//
// Provides:
// - Serial actuator-bus protocol (motors in velocity mode, servos in
//   position mode)
// - Name-keyed hardware map with fail-fast channel lookup
// - The bound rig: per-cycle command writes and the stop sequence

mod bus;
mod registry;
mod rig;

pub use bus::{ActuatorBus, BusError, OperatingMode, Register};
pub use registry::{Direction, HardwareMap, MotorChannel, RegistryError, ServoChannel};
pub use rig::{Channels, Rig, RigError};
