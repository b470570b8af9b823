// Device capabilities consumed by the automation core.
// Screenshot capture and mouse synthesis live outside this crate; callers
// inject an implementation of these traits into the runner.

pub mod error;
pub mod types;

pub use error::{DeviceError, DeviceResult};
pub use types::{MouseButton, MouseInput, ScreenCapture};
