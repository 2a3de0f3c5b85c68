use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// The child could not be started at all, as opposed to exiting non-zero.
    #[error("spawn failed: {0}")]
    Spawn(String),

    #[error("wait failed: {0}")]
    Wait(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}
