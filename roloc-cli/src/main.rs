use std::process::ExitCode;

use clap::{Parser, Subcommand};
use roloc_i2c::BusDevice;

#[derive(Parser)]
#[command(version, about = "Read and write ROLOC registers over I2C/SMBus")]
struct Args {
	/// Bus index (the N in /dev/i2c-N)
	#[arg(short, long, default_value_t = 1)]
	bus: u32,

	/// Peripheral address on the bus
	#[arg(short, long, value_parser = parse_num::<u16>, default_value = "0x08")]
	address: u16,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Read one byte from a register
	ReadByte {
		#[arg(value_parser = parse_num::<u8>)]
		register: u8,
	},
	/// Read one word from a register
	ReadWord {
		#[arg(value_parser = parse_num::<u8>)]
		register: u8,
	},
	/// Write one byte to a register
	WriteByte {
		#[arg(value_parser = parse_num::<u8>)]
		register: u8,
		#[arg(value_parser = parse_num::<u8>)]
		value: u8,
	},
	/// Write one word to a register
	WriteWord {
		#[arg(value_parser = parse_num::<u8>)]
		register: u8,
		#[arg(value_parser = parse_num::<u16>)]
		value: u16,
	},
}

/// Decimal or `0x`-prefixed hex, range-checked for the target width.
fn parse_num<T: TryFrom<u32>>(s: &str) -> Result<T, String> {
	let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
		Some(hex) => u32::from_str_radix(hex, 16),
		None => s.parse(),
	}
	.map_err(|err| err.to_string())?;

	T::try_from(value).map_err(|_| format!("value out of range: {s}"))
}

fn main() -> ExitCode {
	pretty_env_logger::init();

	let args = Args::parse();
	let device = BusDevice::new(args.bus, args.address);

	let result = match args.command {
		Command::ReadByte { register } => device
			.read_byte(register)
			.map(|value| println!("0x{value:02X}")),
		Command::ReadWord { register } => device
			.read_word(register)
			.map(|value| println!("0x{value:04X}")),
		Command::WriteByte { register, value } => device.write_byte(register, value),
		Command::WriteWord { register, value } => device.write_word(register, value),
	};

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("error: {err}");
			ExitCode::FAILURE
		}
	}
}

#[cfg(test)]
mod tests {
	use super::parse_num;

	#[test]
	fn parses_decimal_and_hex() {
		assert_eq!(parse_num::<u8>("220"), Ok(0xDC));
		assert_eq!(parse_num::<u8>("0xDC"), Ok(0xDC));
		assert_eq!(parse_num::<u16>("0xBEEF"), Ok(0xBEEF));
		assert_eq!(parse_num::<u16>("8"), Ok(8));
	}

	#[test]
	fn rejects_garbage_and_overflow() {
		assert!(parse_num::<u8>("0x1FF").is_err());
		assert!(parse_num::<u8>("bogus").is_err());
		assert!(parse_num::<u16>("0x10000").is_err());
	}
}
