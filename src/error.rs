use crate::graph::host::HostError;
use std::fmt;

/// Result type for fallible synth operations.
pub type SynthResult<T = ()> = Result<T, SynthError>;

#[derive(Debug)]
pub enum SynthError {
    /// The audio graph could not be built. Fatal for the session.
    Init(HostError),
    /// A host call failed after initialization.
    Host(HostError),
    /// Configuration could not be parsed or failed validation.
    Config(ConfigError),
    /// A parameter path that names no known parameter.
    UnknownParam(String),
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(String),
    OutOfRange { field: &'static str, value: f64 },
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::Init(e) => write!(f, "Audio engine initialization failed: {e}"),
            SynthError::Host(e) => write!(f, "Audio host error: {e}"),
            SynthError::Config(e) => write!(f, "Config error: {e}"),
            SynthError::UnknownParam(path) => write!(f, "Unknown parameter '{path}'"),
        }
    }
}

impl std::error::Error for SynthError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "could not parse config: {msg}"),
            ConfigError::OutOfRange { field, value } => {
                write!(f, "'{field}' has out-of-range value {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<HostError> for SynthError {
    fn from(e: HostError) -> Self {
        SynthError::Host(e)
    }
}

impl From<ConfigError> for SynthError {
    fn from(e: ConfigError) -> Self {
        SynthError::Config(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failure() {
        let err = SynthError::UnknownParam("filter.cutof".to_string());
        assert_eq!(err.to_string(), "Unknown parameter 'filter.cutof'");

        let err = SynthError::Init(HostError::Unavailable);
        assert!(
            err.to_string().starts_with("Audio engine initialization failed"),
            "Init errors should say initialization failed, got {err}"
        );
    }

    #[test]
    fn config_errors_convert() {
        let err: SynthError = ConfigError::OutOfRange { field: "tuningPitch", value: -1.0 }.into();
        assert!(matches!(err, SynthError::Config(_)));
        assert!(err.to_string().contains("tuningPitch"));
    }
}
