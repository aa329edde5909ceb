use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (zero width, bad server URL, etc.).
    ConfigValidation(String),
    /// A snapshot file could not be decoded.
    SnapshotParse { kind: &'static str, message: String },
    /// A snapshot could not be encoded for writing.
    SnapshotWrite { kind: &'static str, message: String },
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::SnapshotParse { kind, message } => {
                write!(f, "{kind} snapshot: {message}")
            }
            Self::SnapshotWrite { kind, message } => {
                write!(f, "cannot encode {kind} snapshot: {message}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
