use thiserror::Error as ThisError;

/// Failures reported by the vehicle property store.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("Permission denied for property 0x{property_id:08X} area 0x{area_id:X}")]
    PermissionDenied { property_id: i32, area_id: i32 },

    #[error("Invalid property 0x{property_id:08X} area 0x{area_id:X}")]
    InvalidIdentifier { property_id: i32, area_id: i32 },

    #[error("Property transport failure: {0}")]
    Transport(String),
}

#[derive(ThisError, Debug)]
pub enum HvacError {
    #[error("Failed to connect to property service: {0}")]
    Connect(String),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error("Temperature change listener already registered")]
    AlreadySubscribed,

    #[error("Unknown action: {0}")]
    UnknownCommand(String),

    #[error("Invalid temperature value: {0}")]
    OutOfRangeValue(f32),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Dispatch thread '{0}' is not running")]
    DispatcherStopped(String),

    #[error(transparent)]
    MqttError(#[from] rumqttc::ClientError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HvacError>;
