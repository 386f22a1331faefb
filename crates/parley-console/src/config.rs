//! Console configuration read from the environment.

use std::str::FromStr;

use crate::error::ConsoleError;

/// Variable naming the conversation the console talks in.
pub const CONVERSATION_ID_VAR: &str = "PARLEY_CONVERSATION_ID";
/// Variable selecting the log formatter.
pub const LOG_FORMAT_VAR: &str = "PARLEY_LOG_FORMAT";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable, multi-line output.
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(ConsoleError::Config(format!(
                "{LOG_FORMAT_VAR} must be 'json' or 'pretty', got '{other}'"
            ))),
        }
    }
}

/// Settings for one console session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub conversation_id: String,
    pub log_format: LogFormat,
}

impl ConsoleConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Config` if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConsoleError> {
        Self::from_vars(std::env::vars())
    }

    /// Builds the configuration from `(name, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Config` if the conversation id is blank or the
    /// log format is not recognized.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConsoleError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut conversation_id = None;
        let mut log_format = LogFormat::default();
        for (name, value) in vars {
            match name.as_ref() {
                CONVERSATION_ID_VAR => conversation_id = Some(value.into()),
                LOG_FORMAT_VAR => log_format = value.into().parse()?,
                _ => {}
            }
        }

        let conversation_id = conversation_id.unwrap_or_else(|| "console".to_string());
        if conversation_id.trim().is_empty() {
            return Err(ConsoleError::Config(format!(
                "{CONVERSATION_ID_VAR} must not be blank"
            )));
        }

        Ok(Self {
            conversation_id,
            log_format,
        })
    }
}
