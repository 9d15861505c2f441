use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("driver initialisation failed: {0}")]
    Init(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("ADC read failed: {0}")]
    Read(String),
    #[error("failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
