// TCP module - device emulator for local testing
pub mod emulator;

pub use emulator::{DeviceEmulator, DeviceState};
