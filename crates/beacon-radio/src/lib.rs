//! beacon-radio — address resolution, vendor commands, the advertising
//! scheduler and the control surface on top of it.

pub mod context;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod resolver;
pub mod scheduler;
pub mod sim;
pub mod vendor;

pub use context::RadioContext;
pub use control::{ControlSurface, Flow, Input, Status};
pub use dispatcher::{CommandDispatcher, DispatcherHandle, NativeDispatcher};
pub use error::BeaconError;
pub use host::HostAdvertising;
pub use resolver::{resolve, try_resolve, ScanWindow, Signature};
pub use scheduler::{Scheduler, Ticker};
pub use sim::{SimController, SimulatedFirmware};
pub use vendor::VendorCommands;
