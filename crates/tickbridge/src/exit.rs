use std::fmt;
use std::io;

use tickbridge_bridge::BridgeError;
use tickbridge_wire::WireError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound | io::ErrorKind::InvalidInput => USAGE,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn wire_error(context: &str, err: WireError) -> CliError {
    match err {
        WireError::OutOfBounds { .. } | WireError::Malformed(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        WireError::BufferFull { .. } => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn bridge_error(context: &str, err: BridgeError) -> CliError {
    match err {
        BridgeError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        BridgeError::Spawn(source) => io_error(context, source),
        BridgeError::Wire(err) => wire_error(context, err),
        BridgeError::Startup(_) | BridgeError::WorkerExited => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
