//! Error types for block devices.
//!
//! Errors at this level are about moving bytes. A missing file or a bad
//! directory entry is a file-system error, not a device error.

/// Errors raised by a block device.
#[derive(Debug)]
pub enum DeviceError {
    /// Generic I/O failure from the underlying hardware or host.
    Io(Box<dyn std::error::Error + Send + Sync>),

    /// The operation is not supported by this device.
    ///
    /// For example, writing to a read-only image.
    NotSupported,

    /// The requested byte range lies (partly) outside the device.
    OutOfRange {
        /// First byte requested.
        offset: u64,
        /// Number of bytes requested.
        len: usize,
        /// Total device size in bytes.
        size: u64,
    },
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::Io(e) => write!(f, "device i/o error: {}", e),
            DeviceError::NotSupported => write!(f, "operation not supported"),
            DeviceError::OutOfRange { offset, len, size } => write!(
                f,
                "range {}..{} out of bounds for device of {} bytes",
                offset,
                offset.saturating_add(*len as u64),
                size
            ),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::Io(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DeviceError {
    fn from(e: std::io::Error) -> Self {
        DeviceError::Io(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn not_supported_display() {
        assert_eq!(
            format!("{}", DeviceError::NotSupported),
            "operation not supported"
        );
    }

    #[test]
    fn out_of_range_display() {
        let e = DeviceError::OutOfRange {
            offset: 510,
            len: 4,
            size: 512,
        };
        let display = format!("{}", e);
        assert!(display.contains("510..514"));
        assert!(display.contains("512 bytes"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let e: DeviceError = io_err.into();
        assert!(matches!(e, DeviceError::Io(_)));
        assert!(StdError::source(&e).is_some());
    }
}
