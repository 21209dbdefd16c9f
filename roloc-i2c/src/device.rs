//! The bus device access object.

use std::path::{Path, PathBuf};

use log::error;

use crate::error::Error;
use crate::linux::LinuxSmbus;
use crate::smbus::{Operation, Smbus, SmbusAdapter};

/// Register-level access to one peripheral on one I2C/SMBus bus.
///
/// Holds no OS handle between calls: every operation opens the device node,
/// validates the adapter functionality, binds the peripheral address, runs
/// the transaction, and releases the handle on every exit path.
///
/// Methods take `&self` and each call carries its own [`Operation`], so a
/// shared device can serve concurrent calls without them observing each
/// other's mode.
pub struct BusDevice<T: Smbus = LinuxSmbus> {
	transport: T,
	bus: u32,
	address: u16,
	device_path: PathBuf,
}

impl BusDevice<LinuxSmbus> {
	/// A device on `/dev/i2c-<bus>` at the given peripheral address.
	/// No I/O happens until the first operation.
	pub fn new(bus: u32, address: u16) -> Self {
		Self::with_transport(LinuxSmbus, bus, address)
	}
}

impl<T: Smbus> BusDevice<T> {
	/// Same as [`BusDevice::new`] but over an arbitrary transport.
	pub fn with_transport(transport: T, bus: u32, address: u16) -> Self {
		let device_path = PathBuf::from(format!("/dev/i2c-{bus}"));

		Self {
			transport,
			bus,
			address,
			device_path,
		}
	}

	/// The bus index this device was constructed with.
	pub fn bus(&self) -> u32 {
		self.bus
	}

	/// The peripheral address on the bus.
	pub fn address(&self) -> u16 {
		self.address
	}

	/// The device node path, derived from the bus index at construction
	/// and never mutated afterwards.
	pub fn device_path(&self) -> &Path {
		&self.device_path
	}

	/// Reads one byte from `register`.
	pub fn read_byte(&self, register: u8) -> Result<u8, Error> {
		self.transact(Operation::ReadByte, |adapter| {
			adapter.read_byte_data(register)
		})
	}

	/// Writes one byte to `register`.
	pub fn write_byte(&self, register: u8, value: u8) -> Result<(), Error> {
		self.transact(Operation::WriteByte, |adapter| {
			adapter.write_byte_data(register, value)
		})
	}

	/// Reads one word from `register`.
	pub fn read_word(&self, register: u8) -> Result<u16, Error> {
		self.transact(Operation::ReadWord, |adapter| {
			adapter.read_word_data(register)
		})
	}

	/// Writes one word to `register`.
	pub fn write_word(&self, register: u8, value: u16) -> Result<(), Error> {
		self.transact(Operation::WriteWord, |adapter| {
			adapter.write_word_data(register, value)
		})
	}

	/// One full operation lifecycle: open, capability check, address bind,
	/// transaction. A failure at any step short-circuits; the handle is
	/// released when `adapter` drops, on success and failure alike.
	fn transact<R>(
		&self,
		operation: Operation,
		transaction: impl FnOnce(&T::Adapter) -> nix::Result<R>,
	) -> Result<R, Error> {
		let adapter = self
			.transport
			.open(&self.device_path)
			.map_err(|_| Error::FileDescriptor)?;

		self.check_capability(&adapter, operation)?;

		if let Err(err) = adapter.bind_slave(self.address) {
			error!(
				"could not bind peripheral address 0x{:02x} on {}: {err}",
				self.address,
				self.device_path.display()
			);
			return Err(Error::Os(err));
		}

		transaction(&adapter).map_err(Error::Os)
	}

	fn check_capability(&self, adapter: &T::Adapter, operation: Operation) -> Result<(), Error> {
		let funcs = match adapter.functionality() {
			Ok(funcs) => funcs,
			Err(err) => {
				error!("could not query the adapter functionality mask: {err}");
				return Err(Error::Capability);
			}
		};

		match operation.required_functionality() {
			Some(required) if !funcs.contains(required) => {
				error!("adapter does not support {operation:?}");
				Err(Error::Capability)
			}
			_ => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::path::Path;
	use std::sync::{Arc, Mutex};

	use nix::errno::Errno;

	use super::*;
	use crate::error::{ERR_FILE_DESCRIPTOR, ERR_NO_CAPABILITY, error_string};
	use crate::smbus::Functionality;

	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	enum Call {
		Open,
		Functionality,
		BindSlave(u16),
		ReadByte(u8),
		WriteByte(u8, u8),
		ReadWord(u8),
		WriteWord(u8, u16),
	}

	/// Scripted transport: fixed outcomes per step, every invocation
	/// recorded in order.
	#[derive(Clone)]
	struct Script {
		open: Result<(), Errno>,
		functionality: Result<Functionality, Errno>,
		bind: Result<(), Errno>,
		read: Result<u16, Errno>,
		write: Result<(), Errno>,
		calls: Arc<Mutex<Vec<Call>>>,
	}

	impl Script {
		fn capable() -> Self {
			Self {
				open: Ok(()),
				functionality: Ok(Functionality::SMBUS_READ_BYTE_DATA
					| Functionality::SMBUS_WRITE_BYTE_DATA
					| Functionality::SMBUS_READ_WORD_DATA
					| Functionality::SMBUS_WRITE_WORD_DATA),
				bind: Ok(()),
				read: Ok(0),
				write: Ok(()),
				calls: Arc::new(Mutex::new(Vec::new())),
			}
		}

		fn record(&self, call: Call) {
			self.calls.lock().unwrap().push(call);
		}

		fn calls(&self) -> Vec<Call> {
			self.calls.lock().unwrap().clone()
		}

		fn device(self) -> BusDevice<Script> {
			BusDevice::with_transport(self, 1, 0x08)
		}
	}

	impl Smbus for Script {
		type Adapter = Script;

		fn open(&self, _path: &Path) -> nix::Result<Script> {
			self.record(Call::Open);
			self.open?;
			Ok(self.clone())
		}
	}

	impl SmbusAdapter for Script {
		fn functionality(&self) -> nix::Result<Functionality> {
			self.record(Call::Functionality);
			self.functionality
		}

		fn bind_slave(&self, address: u16) -> nix::Result<()> {
			self.record(Call::BindSlave(address));
			self.bind
		}

		fn read_byte_data(&self, register: u8) -> nix::Result<u8> {
			self.record(Call::ReadByte(register));
			self.read.map(|word| word as u8)
		}

		fn write_byte_data(&self, register: u8, value: u8) -> nix::Result<()> {
			self.record(Call::WriteByte(register, value));
			self.write
		}

		fn read_word_data(&self, register: u8) -> nix::Result<u16> {
			self.record(Call::ReadWord(register));
			self.read
		}

		fn write_word_data(&self, register: u8, value: u16) -> nix::Result<()> {
			self.record(Call::WriteWord(register, value));
			self.write
		}
	}

	// Exercises the real transport: the node cannot exist, so the open
	// itself must fail and map to the file-descriptor category.
	#[test]
	fn nonexistent_bus_yields_a_file_descriptor_error() {
		let device = BusDevice::new(10_000, 0x08);
		assert_eq!(device.read_word(0xDC), Err(Error::FileDescriptor));
		assert_eq!(device.read_byte(0xDC), Err(Error::FileDescriptor));
	}

	#[test]
	fn device_path_follows_the_bus_index() {
		assert_eq!(
			BusDevice::new(1, 0x08).device_path(),
			Path::new("/dev/i2c-1")
		);
		assert_eq!(
			BusDevice::new(11, 0x50).device_path(),
			Path::new("/dev/i2c-11")
		);
	}

	#[test]
	fn open_failure_short_circuits_everything_else() {
		let script = Script {
			open: Err(Errno::ENOENT),
			..Script::capable()
		};
		let calls = script.calls.clone();
		let device = script.device();

		assert_eq!(device.read_word(0xDC), Err(Error::FileDescriptor));
		assert_eq!(device.read_byte(0xDC), Err(Error::FileDescriptor));
		// no functionality query, bind, or transaction was attempted
		assert_eq!(*calls.lock().unwrap(), vec![Call::Open, Call::Open]);

		assert_eq!(Error::FileDescriptor.code(), ERR_FILE_DESCRIPTOR);
	}

	#[test]
	fn missing_word_capability_blocks_the_transaction() {
		let script = Script {
			functionality: Ok(Functionality::SMBUS_READ_BYTE_DATA),
			..Script::capable()
		};
		let calls = script.calls.clone();
		let device = script.device();

		let err = device.read_word(0xDC).unwrap_err();
		assert_eq!(err, Error::Capability);
		assert_eq!(err.code(), ERR_NO_CAPABILITY);
		assert_eq!(
			*calls.lock().unwrap(),
			vec![Call::Open, Call::Functionality]
		);
	}

	#[test]
	fn missing_byte_capability_blocks_the_transaction() {
		let script = Script {
			functionality: Ok(Functionality::SMBUS_READ_WORD_DATA),
			..Script::capable()
		};
		let device = script.device();

		assert_eq!(device.read_byte(0x00), Err(Error::Capability));
	}

	#[test]
	fn failed_functionality_query_is_a_capability_error() {
		let script = Script {
			functionality: Err(Errno::EOPNOTSUPP),
			..Script::capable()
		};
		let device = script.device();

		assert_eq!(device.read_word(0xDC), Err(Error::Capability));
	}

	#[test]
	fn bind_failure_propagates_the_raw_errno() {
		let script = Script {
			bind: Err(Errno::EBUSY),
			..Script::capable()
		};
		let calls = script.calls.clone();
		let device = script.device();

		let err = device.read_word(0xDC).unwrap_err();
		assert_eq!(err, Error::Os(Errno::EBUSY));
		assert_eq!(err.code(), -(Errno::EBUSY as i32));
		assert_eq!(error_string(err.code()), Errno::EBUSY.desc());
		assert_eq!(
			*calls.lock().unwrap(),
			vec![Call::Open, Call::Functionality, Call::BindSlave(0x08)]
		);
	}

	#[test]
	fn transaction_failure_propagates_the_raw_errno() {
		let script = Script {
			read: Err(Errno::EIO),
			..Script::capable()
		};
		let device = script.device();

		assert_eq!(device.read_word(0xDC), Err(Error::Os(Errno::EIO)));
	}

	#[test]
	fn word_read_end_to_end() {
		let script = Script {
			read: Ok(0x00DC),
			..Script::capable()
		};
		let calls = script.calls.clone();
		let device = script.device();

		assert_eq!(device.read_word(0xDC), Ok(220));
		assert_eq!(
			*calls.lock().unwrap(),
			vec![
				Call::Open,
				Call::Functionality,
				Call::BindSlave(0x08),
				Call::ReadWord(0xDC),
			]
		);
	}

	#[test]
	fn byte_read_end_to_end() {
		let script = Script {
			read: Ok(0x42),
			..Script::capable()
		};
		let calls = script.calls.clone();
		let device = script.device();

		assert_eq!(device.read_byte(0x10), Ok(0x42));
		assert_eq!(
			calls.lock().unwrap().last(),
			Some(&Call::ReadByte(0x10))
		);
	}

	#[test]
	fn writes_reach_the_peripheral() {
		let script = Script::capable();
		let calls = script.calls.clone();
		let device = script.device();

		assert_eq!(device.write_byte(0x10, 0xAB), Ok(()));
		assert_eq!(device.write_word(0x12, 0xBEEF), Ok(()));

		let calls = calls.lock().unwrap();
		assert!(calls.contains(&Call::WriteByte(0x10, 0xAB)));
		assert!(calls.contains(&Call::WriteWord(0x12, 0xBEEF)));
	}

	// Write operations are not gated on the functionality mask; an
	// adapter advertising nothing at all still gets the write
	// transaction. This pins that gap.
	#[test]
	fn writes_bypass_capability_validation() {
		let script = Script {
			functionality: Ok(Functionality::empty()),
			..Script::capable()
		};
		let calls = script.calls.clone();
		let device = script.device();

		assert_eq!(device.write_word(0x10, 0xBEEF), Ok(()));
		assert_eq!(
			calls.lock().unwrap().last(),
			Some(&Call::WriteWord(0x10, 0xBEEF))
		);
	}

	#[test]
	fn concurrent_operations_keep_their_own_mode() {
		let script = Script {
			read: Ok(0x00DC),
			..Script::capable()
		};
		let device = script.device();

		std::thread::scope(|scope| {
			scope.spawn(|| {
				for _ in 0..100 {
					assert_eq!(device.read_word(0xDC), Ok(0x00DC));
				}
			});
			scope.spawn(|| {
				for _ in 0..100 {
					assert_eq!(device.read_byte(0xDC), Ok(0xDC));
				}
			});
		});
	}
}
