#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("task submission failed: {0}")]
    Submit(String),

    #[error("task failed on the relay: {0}")]
    TaskFailed(String),

    #[error("status poll failed: {0}")]
    StatusPoll(String),

    #[error("timed out after {attempts} poll attempts")]
    Timeout { attempts: u32 },

    #[error("artifact download failed: {0}")]
    Download(String),

    #[error("downloaded artifact is missing or empty: {0}")]
    EmptyArtifact(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
