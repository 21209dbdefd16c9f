//! SMBus transport abstraction.
//!
//! The three OS primitives the device core depends on (functionality query,
//! slave address binding, register transactions) sit behind these traits so
//! the core can be driven against a scripted transport in tests. The real
//! Linux transport lives in [`crate::linux`].

use std::path::Path;

use bitflags::bitflags;

bitflags! {
	/// Adapter functionality mask as reported by the `I2C_FUNCS` ioctl.
	///
	/// Bit values from `linux/i2c.h`.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct Functionality: u32 {
		const I2C = 0x0000_0001;
		const ADDR_10BIT = 0x0000_0002;
		const PROTOCOL_MANGLING = 0x0000_0004;
		const SMBUS_PEC = 0x0000_0008;
		const NOSTART = 0x0000_0010;
		const SLAVE = 0x0000_0020;
		const SMBUS_BLOCK_PROC_CALL = 0x0000_8000;
		const SMBUS_QUICK = 0x0001_0000;
		const SMBUS_READ_BYTE = 0x0002_0000;
		const SMBUS_WRITE_BYTE = 0x0004_0000;
		const SMBUS_READ_BYTE_DATA = 0x0008_0000;
		const SMBUS_WRITE_BYTE_DATA = 0x0010_0000;
		const SMBUS_READ_WORD_DATA = 0x0020_0000;
		const SMBUS_WRITE_WORD_DATA = 0x0040_0000;
		const SMBUS_PROC_CALL = 0x0080_0000;
		const SMBUS_READ_BLOCK_DATA = 0x0100_0000;
		const SMBUS_WRITE_BLOCK_DATA = 0x0200_0000;
		const SMBUS_READ_I2C_BLOCK = 0x0400_0000;
		const SMBUS_WRITE_I2C_BLOCK = 0x0800_0000;
		const SMBUS_HOST_NOTIFY = 0x1000_0000;
	}
}

/// The transaction a single device call is about to perform.
///
/// Carried as a stack-local through each call so two concurrent operations
/// on the same device can never observe each other's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	ReadByte,
	WriteByte,
	ReadWord,
	WriteWord,
}

impl Operation {
	/// The functionality bit an adapter must advertise before this
	/// operation is attempted. Write operations carry no required bit;
	/// they have never been gated on the functionality mask.
	pub fn required_functionality(self) -> Option<Functionality> {
		match self {
			Operation::ReadByte => Some(Functionality::SMBUS_READ_BYTE_DATA),
			Operation::ReadWord => Some(Functionality::SMBUS_READ_WORD_DATA),
			Operation::WriteByte | Operation::WriteWord => None,
		}
	}
}

/// An open handle to a bus adapter, bound to nothing until
/// [`bind_slave`](SmbusAdapter::bind_slave) is called.
///
/// Implementations release the underlying handle on drop; callers never
/// close anything explicitly.
pub trait SmbusAdapter {
	/// Query the adapter functionality mask.
	fn functionality(&self) -> nix::Result<Functionality>;

	/// Bind this handle to the peripheral at `address` for all
	/// subsequent transactions.
	fn bind_slave(&self, address: u16) -> nix::Result<()>;

	/// One-byte SMBus register read.
	fn read_byte_data(&self, register: u8) -> nix::Result<u8>;

	/// One-byte SMBus register write.
	fn write_byte_data(&self, register: u8, value: u8) -> nix::Result<()>;

	/// Two-byte SMBus register read.
	fn read_word_data(&self, register: u8) -> nix::Result<u16>;

	/// Two-byte SMBus register write.
	fn write_word_data(&self, register: u8, value: u16) -> nix::Result<()>;
}

/// Opens adapter handles for a device node path.
pub trait Smbus {
	type Adapter: SmbusAdapter;

	fn open(&self, path: &Path) -> nix::Result<Self::Adapter>;
}
