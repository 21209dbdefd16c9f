use std::str::FromStr;
use std::time::{Duration, Instant};

use async_io::Timer;
use async_std::prelude::*;
use envconfig::Envconfig;
use log::{error, info};
use roloc_i2c::{BusDevice, error_string};

#[derive(Envconfig, Clone)]
pub(crate) struct Config {
	#[envconfig(from = "ROLOC_I2C_BUS", default = "1")]
	pub i2c_bus: u32,
	#[envconfig(from = "ROLOC_I2C_ADDRESS", default = "8")]
	pub i2c_address: u16,
	#[envconfig(from = "ROLOC_ID_REGISTER", default = "220")]
	pub id_register: u8,
	#[envconfig(from = "ROLOC_POLL_INTERVAL_MS", default = "2000")]
	pub poll_interval_ms: u64,
	#[envconfig(from = "USE_JOURNALD", default = "0")]
	#[allow(unused)]
	pub use_journald: u8,
	#[envconfig(from = "LEVEL", default = "info")]
	pub log_level: String,
	#[envconfig(from = "VERBOSE", default = "0")]
	pub verbose: u8,
}

#[async_std::main]
async fn main() {
	let config = Config::init_from_env().unwrap();

	let log_level = log::LevelFilter::from_str(&config.log_level)
		.expect("failed to parse LEVEL environment variable");

	log::set_max_level(log_level);

	#[cfg(all(not(feature = "journald"), not(feature = "stderr")))]
	compile_error!("one of 'journald' and/or 'stderr' must be specified as features");

	#[allow(unused)]
	let should_fallback = true;

	#[cfg(feature = "journald")]
	let should_fallback = {
		if config.use_journald != 0 {
			systemd_journal_logger::JournalLog::default()
				.with_extra_fields(vec![("VERSION", env!("CARGO_PKG_VERSION"))])
				.with_syslog_identifier("rolocd".to_string())
				.install()
				.expect("failed to start journald logger");
			false
		} else {
			true
		}
	};

	#[cfg(feature = "stderr")]
	if should_fallback {
		let mut slog = stderrlog::new();

		if config.verbose == 0 {
			slog.module(module_path!());
		}

		slog.show_module_names(true)
			.verbosity(log_level)
			.timestamp(stderrlog::Timestamp::Millisecond)
			.init()
			.expect("failed to start stderr logger");
	}

	info!("starting rolocd version {}", env!("CARGO_PKG_VERSION"));

	let device = BusDevice::new(config.i2c_bus, config.i2c_address);

	info!(
		"polling register 0x{:02X} at {} (peripheral 0x{:02x}) every {}ms",
		config.id_register,
		device.device_path().display(),
		device.address(),
		config.poll_interval_ms
	);

	// Read failures are logged and the cadence continues; a locator that
	// is unplugged now may be plugged in on the next tick.
	let mut ticks = Timer::interval(Duration::from_millis(config.poll_interval_ms));

	while ticks.next().await.is_some() {
		let started = Instant::now();
		let result = device.read_word(config.id_register);
		let elapsed = started.elapsed().as_millis();

		match result {
			Ok(id) => info!("read id in {elapsed}ms: 0x{id:04X}"),
			Err(err) => error!(
				"read id failed after {elapsed}ms: {}",
				error_string(err.code())
			),
		}
	}
}
