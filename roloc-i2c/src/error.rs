//! Error taxonomy for bus device access, plus the integer encoding used by
//! callers that log raw codes.

use nix::errno::Errno;

/// Code returned when the bus device node could not be opened.
///
/// Aliases `-ENODEV`; an `Error::Os(ENODEV)` therefore stringifies the same
/// way, which is intentional.
pub const ERR_FILE_DESCRIPTOR: i32 = -(Errno::ENODEV as i32);

/// Code returned when the adapter cannot perform the requested transaction.
/// Outside the errno range so it never collides with a real OS error.
pub const ERR_NO_CAPABILITY: i32 = -1000;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
	/// The bus device node could not be opened (missing device,
	/// permission denied, busy).
	#[error("could not open the bus device node")]
	FileDescriptor,

	/// The adapter functionality query failed, or the adapter lacks the
	/// bit required for the requested transaction size.
	#[error("adapter cannot perform the requested transaction")]
	Capability,

	/// Any other OS-level failure, with the original errno preserved.
	#[error("{0}")]
	Os(Errno),
}

impl Error {
	/// The negative integer code for this error. Sentinels for the first
	/// two variants, the negated errno otherwise.
	pub fn code(&self) -> i32 {
		match self {
			Error::FileDescriptor => ERR_FILE_DESCRIPTOR,
			Error::Capability => ERR_NO_CAPABILITY,
			Error::Os(errno) => -(*errno as i32),
		}
	}
}

/// Renders any result code as a diagnostic string.
///
/// Total over all of `i32`: non-negative codes are successes, the two
/// sentinels map to their categories, and every other negative value is
/// rendered as the platform description of errno `-code`.
pub fn error_string(code: i32) -> &'static str {
	if code >= 0 {
		"NO ERROR"
	} else if code == ERR_FILE_DESCRIPTOR {
		"FILE DESCRIPTOR"
	} else if code == ERR_NO_CAPABILITY {
		"NO CAPABILITY"
	} else {
		// saturating_neg keeps i32::MIN in range; the kernel never
		// produces an errno that large, so it lands on UnknownErrno.
		Errno::from_raw(code.saturating_neg()).desc()
	}
}
