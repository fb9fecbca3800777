use std::io;
use thiserror::Error;

/// Errors surfaced by termfire.
///
/// Only configuration errors stop the game. Everything else is logged by the
/// caller and the frame loop carries on with whatever input is left.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("no micro:bit found on any serial port")]
    NoDevice,
    #[error("settings file {path}: {source}")]
    Settings {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("audio error: {0}")]
    Audio(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
