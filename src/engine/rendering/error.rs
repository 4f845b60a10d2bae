//! Shared pieces of the rendering error enums.
//!
//! Every rendering error is a snafu enum whose variant is the error kind. Each variant
//! carries a native [`ErrorCode`] and a human readable message, so callers can log or
//! branch on failures without parsing display strings.

use std::fmt::{Display, Formatter};
use std::io;

/// Native numeric error code attached to every rendering error.
///
/// Negative values are the crate's own codes, positive values are raw OS error numbers
/// taken from [`io::Error::raw_os_error`].
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const OK: ErrorCode = ErrorCode(0);
    pub const FAIL: ErrorCode = ErrorCode(-1);
    pub const INVALID_ARGUMENT: ErrorCode = ErrorCode(-2);
    pub const NOT_FOUND: ErrorCode = ErrorCode(-3);
    pub const OUT_OF_MEMORY: ErrorCode = ErrorCode(-4);
    pub const UNSUPPORTED: ErrorCode = ErrorCode(-5);
    pub const DEVICE_LOST: ErrorCode = ErrorCode(-6);
    pub const SURFACE_LOST: ErrorCode = ErrorCode(-7);
    pub const TIMEOUT: ErrorCode = ErrorCode(-8);
    pub const VALIDATION: ErrorCode = ErrorCode(-9);

    pub fn is_os_error(self) -> bool {
        self.0 > 0
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::OK => "OK",
            Self::FAIL => "FAIL",
            Self::INVALID_ARGUMENT => "INVALID_ARGUMENT",
            Self::NOT_FOUND => "NOT_FOUND",
            Self::OUT_OF_MEMORY => "OUT_OF_MEMORY",
            Self::UNSUPPORTED => "UNSUPPORTED",
            Self::DEVICE_LOST => "DEVICE_LOST",
            Self::SURFACE_LOST => "SURFACE_LOST",
            Self::TIMEOUT => "TIMEOUT",
            Self::VALIDATION => "VALIDATION",
            _ if self.is_os_error() => "OS_ERROR",
            _ => "UNKNOWN",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl From<&io::Error> for ErrorCode {
    fn from(err: &io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) if code > 0 => ErrorCode(code),
            _ => match err.kind() {
                io::ErrorKind::NotFound => ErrorCode::NOT_FOUND,
                io::ErrorKind::OutOfMemory => ErrorCode::OUT_OF_MEMORY,
                io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => {
                    ErrorCode::INVALID_ARGUMENT
                }
                io::ErrorKind::TimedOut => ErrorCode::TIMEOUT,
                io::ErrorKind::Unsupported => ErrorCode::UNSUPPORTED,
                _ => ErrorCode::FAIL,
            },
        }
    }
}

impl From<wgpu::SurfaceError> for ErrorCode {
    fn from(err: wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Timeout => ErrorCode::TIMEOUT,
            wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost => ErrorCode::SURFACE_LOST,
            wgpu::SurfaceError::OutOfMemory => ErrorCode::OUT_OF_MEMORY,
            _ => ErrorCode::FAIL,
        }
    }
}

/// Implements `code()` and `message()` for an error enum whose leaf variants all carry
/// `code` and `message` fields. Wrapping variants listed after `wrap` forward to their
/// `source`.
#[macro_export]
#[doc(hidden)]
macro_rules! error_info {
    ($ty:ident { $($leaf:ident),* $(,)? } $(wrap { $($wrapped:ident),* $(,)? })?) => {
        impl $ty {
            /// The native numeric code of this error.
            pub fn code(&self) -> $crate::rendering::ErrorCode {
                match self {
                    $( $ty::$leaf { code, .. } => *code, )*
                    $($( $ty::$wrapped { source, .. } => source.code(), )*)?
                }
            }

            /// The human readable message of this error.
            pub fn message(&self) -> &str {
                match self {
                    $( $ty::$leaf { message, .. } => message.as_str(), )*
                    $($( $ty::$wrapped { source, .. } => source.message(), )*)?
                }
            }
        }
    };
}
