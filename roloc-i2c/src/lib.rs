//! Register-level access to the ROLOC locator over Linux i2c-dev.
//!
//! The kernel already speaks SMBus; this crate wraps the `/dev/i2c-*`
//! ioctl surface (the same one `i2cget`/`i2cset` use) behind a small
//! device object with a per-operation open/validate/bind/transact
//! lifecycle. The transport sits behind a trait so everything above the
//! ioctls can be exercised without hardware.

pub mod device;
pub mod error;
pub mod linux;
pub mod smbus;

pub use device::BusDevice;
pub use error::{ERR_FILE_DESCRIPTOR, ERR_NO_CAPABILITY, Error, error_string};
pub use linux::LinuxSmbus;
pub use smbus::{Functionality, Operation, Smbus, SmbusAdapter};
