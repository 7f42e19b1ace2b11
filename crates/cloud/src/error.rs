use alertstack_core::error::CoreError;

/// Error type for artifact checks and stack deployment.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// The Lambda artifact the stack loads its code from does not exist.
    #[error("Artifact s3://{bucket}/{key} not found")]
    ArtifactMissing { bucket: String, key: String },

    /// An AWS API call failed (credentials, throttling, validation, ...).
    #[error("AWS request failed: {0}")]
    Aws(String),

    /// The stack settled in a failed or rolled-back state.
    #[error("Stack {stack} ended in {status}: {reason}")]
    StackFailed {
        stack: String,
        status: String,
        reason: String,
    },

    /// The stack was still in progress when the wait deadline passed.
    #[error("Stack {stack} did not settle within {waited_secs}s")]
    Timeout { stack: String, waited_secs: u64 },

    #[error(transparent)]
    Core(#[from] CoreError),
}
