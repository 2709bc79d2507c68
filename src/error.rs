use thiserror::Error;

/// Errors surfaced by the device's data plane and control surface.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// Bad attribute input, or a read buffer shorter than one record.
    #[error("invalid argument")]
    InvalidArgument,

    /// Non-blocking read found no data.
    #[error("no data available")]
    WouldBlock,

    /// The device is being torn down; the operation will never succeed.
    #[error("device is shutting down")]
    Stopping,

    /// The consumer could not take delivery of an already-consumed record.
    #[error("record delivery failed")]
    Fault,

    /// The handle no longer has a backing device instance.
    #[error("no such device")]
    NoDevice,
}

impl DeviceError {
    /// Short stable token used by the control protocol.
    pub const fn token(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid-argument",
            Self::WouldBlock => "would-block",
            Self::Stopping => "shutting-down",
            Self::Fault => "fault",
            Self::NoDevice => "no-device",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_stable() {
        assert_eq!(DeviceError::InvalidArgument.token(), "invalid-argument");
        assert_eq!(DeviceError::WouldBlock.token(), "would-block");
        assert_eq!(DeviceError::Stopping.token(), "shutting-down");
        assert_eq!(DeviceError::Fault.token(), "fault");
        assert_eq!(DeviceError::NoDevice.token(), "no-device");
    }
}
