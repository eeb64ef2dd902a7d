//! Error types for montana-flash-core
//!
//! The controller reports a closed set of statuses. Success is `Ok`, every
//! other status is an [`Error`] variant. The numeric codes match the status
//! values used by firmware callers of the flash library.

use core::fmt;

/// Flash operation error - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// Address does not belong to any flash region
    BadAddress,
    /// Range extends past the lockable part of its region
    BadLength,
    /// Controller is isolated or was never initialized
    Inaccessible,
    /// Instance number or clock frequency is invalid
    InvalidParams,
    /// A required buffer was not supplied
    NullParam,
    /// Address is not aligned to a 32-bit word
    AddressWordAlign,
    /// Zero-length range
    ZeroLen,
    /// CRC of the programmed range does not match the written data
    CrcCheck,
    /// Operation did not complete or did not verify
    Unknown,
}

impl Error {
    /// All error variants in status-code order
    pub const ALL: [Error; 9] = [
        Error::BadAddress,
        Error::BadLength,
        Error::Inaccessible,
        Error::InvalidParams,
        Error::NullParam,
        Error::AddressWordAlign,
        Error::ZeroLen,
        Error::CrcCheck,
        Error::Unknown,
    ];

    /// Numeric status code (1..=9); success is 0
    pub const fn code(self) -> u32 {
        match self {
            Self::BadAddress => 0x1,
            Self::BadLength => 0x2,
            Self::Inaccessible => 0x3,
            Self::InvalidParams => 0x4,
            Self::NullParam => 0x5,
            Self::AddressWordAlign => 0x6,
            Self::ZeroLen => 0x7,
            Self::CrcCheck => 0x8,
            Self::Unknown => 0x9,
        }
    }

    /// Map a numeric status code back to an error
    ///
    /// Returns `None` for 0 (success) and for codes outside the taxonomy.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadAddress => write!(f, "address is outside every flash region"),
            Self::BadLength => write!(f, "range exceeds the region's lockable size"),
            Self::Inaccessible => write!(f, "flash interface is inaccessible"),
            Self::InvalidParams => write!(f, "invalid parameter"),
            Self::NullParam => write!(f, "missing buffer"),
            Self::AddressWordAlign => write!(f, "address is not word aligned"),
            Self::ZeroLen => write!(f, "zero length"),
            Self::CrcCheck => write!(f, "CRC verification failed"),
            Self::Unknown => write!(f, "flash operation failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

/// Numeric status of a result: 0 on success, otherwise [`Error::code`]
pub fn status_code<T>(result: &Result<T>) -> u32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_dense_and_round_trip() {
        for (i, e) in Error::ALL.iter().enumerate() {
            assert_eq!(e.code(), i as u32 + 1);
            assert_eq!(Error::from_code(e.code()), Some(*e));
        }
        assert_eq!(Error::from_code(0), None);
        assert_eq!(Error::from_code(10), None);
    }

    #[test]
    fn test_status_code() {
        assert_eq!(status_code(&Ok::<(), Error>(())), 0);
        assert_eq!(status_code::<u32>(&Err(Error::CrcCheck)), 8);
    }
}
