use thiserror::Error;

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("No armies supplied for either side")]
    NoRosters,

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Unit persistence failed: {0}")]
    StoreFailed(String),

    #[error("Report delivery failed: {0}")]
    ReportFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;
