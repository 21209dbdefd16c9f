//! Linux userspace SMBus transport over `/dev/i2c-*` character devices.
//!
//! Kernel interface per `Documentation/i2c/dev-interface.rst`: one ioctl to
//! query adapter functionality (`I2C_FUNCS`), one to bind the handle to a
//! slave address (`I2C_SLAVE`), and one to run an SMBus transaction
//! (`I2C_SMBUS`).

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use libc::c_ulong;
use nix::errno::Errno;

use crate::smbus::{Functionality, Smbus, SmbusAdapter};

const I2C_SLAVE: c_ulong = 0x0703;
const I2C_FUNCS: c_ulong = 0x0705;
const I2C_SMBUS: c_ulong = 0x0720;

const SMBUS_READ: u8 = 1;
const SMBUS_WRITE: u8 = 0;

const SMBUS_BYTE_DATA: u32 = 2;
const SMBUS_WORD_DATA: u32 = 3;

const SMBUS_BLOCK_MAX: usize = 32;

/// Payload block for `I2C_SMBUS`. Sized for block transfers (32 data bytes
/// plus length and PEC) even though only byte and word transactions are
/// issued here; the kernel expects the full-size union either way.
#[repr(C)]
struct SmbusData {
	block: [u8; SMBUS_BLOCK_MAX + 2],
}

impl SmbusData {
	fn zeroed() -> Self {
		Self {
			block: [0; SMBUS_BLOCK_MAX + 2],
		}
	}

	fn byte(&self) -> u8 {
		self.block[0]
	}

	fn set_byte(&mut self, value: u8) {
		self.block[0] = value;
	}

	fn word(&self) -> u16 {
		LittleEndian::read_u16(&self.block)
	}

	fn set_word(&mut self, value: u16) {
		LittleEndian::write_u16(&mut self.block, value);
	}
}

/// Mirrors `struct i2c_smbus_ioctl_data` from `linux/i2c-dev.h`.
#[repr(C)]
struct SmbusIoctlData {
	read_write: u8,
	command: u8,
	size: u32,
	data: *mut SmbusData,
}

mod ioctl {
	use super::{I2C_FUNCS, I2C_SLAVE, I2C_SMBUS, SmbusIoctlData};

	nix::ioctl_write_int_bad!(set_slave_address, I2C_SLAVE);
	nix::ioctl_read_bad!(get_functionality, I2C_FUNCS, libc::c_ulong);
	nix::ioctl_write_ptr_bad!(smbus_transfer, I2C_SMBUS, SmbusIoctlData);
}

/// Opens `/dev/i2c-*` nodes read/write.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxSmbus;

impl Smbus for LinuxSmbus {
	type Adapter = LinuxAdapter;

	fn open(&self, path: &Path) -> nix::Result<LinuxAdapter> {
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.open(path)
			.map_err(|err| Errno::from_raw(err.raw_os_error().unwrap_or(libc::EIO)))?;

		Ok(LinuxAdapter { file })
	}
}

/// An open adapter handle. The descriptor closes when this drops.
pub struct LinuxAdapter {
	file: File,
}

impl LinuxAdapter {
	fn smbus_access(
		&self,
		read_write: u8,
		register: u8,
		size: u32,
		data: &mut SmbusData,
	) -> nix::Result<()> {
		let args = SmbusIoctlData {
			read_write,
			command: register,
			size,
			data: std::ptr::from_mut(data),
		};

		unsafe { ioctl::smbus_transfer(self.file.as_raw_fd(), &args) }?;
		Ok(())
	}
}

impl SmbusAdapter for LinuxAdapter {
	fn functionality(&self) -> nix::Result<Functionality> {
		let mut raw: c_ulong = 0;
		unsafe { ioctl::get_functionality(self.file.as_raw_fd(), &mut raw) }?;
		Ok(Functionality::from_bits_truncate(raw as u32))
	}

	fn bind_slave(&self, address: u16) -> nix::Result<()> {
		unsafe { ioctl::set_slave_address(self.file.as_raw_fd(), libc::c_int::from(address)) }?;
		Ok(())
	}

	fn read_byte_data(&self, register: u8) -> nix::Result<u8> {
		let mut data = SmbusData::zeroed();
		self.smbus_access(SMBUS_READ, register, SMBUS_BYTE_DATA, &mut data)?;
		Ok(data.byte())
	}

	fn write_byte_data(&self, register: u8, value: u8) -> nix::Result<()> {
		let mut data = SmbusData::zeroed();
		data.set_byte(value);
		self.smbus_access(SMBUS_WRITE, register, SMBUS_BYTE_DATA, &mut data)
	}

	fn read_word_data(&self, register: u8) -> nix::Result<u16> {
		let mut data = SmbusData::zeroed();
		self.smbus_access(SMBUS_READ, register, SMBUS_WORD_DATA, &mut data)?;
		Ok(data.word())
	}

	fn write_word_data(&self, register: u8, value: u16) -> nix::Result<()> {
		let mut data = SmbusData::zeroed();
		data.set_word(value);
		self.smbus_access(SMBUS_WRITE, register, SMBUS_WORD_DATA, &mut data)
	}
}
