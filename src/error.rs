pub type MockgenResult<T> = Result<T, MockgenError>;

/// Error kinds of the composition and export pipeline.
///
/// All of these are recoverable at the session boundary: a failed upload,
/// removal call, or capture leaves the prior scene state intact and never
/// leaves the busy flag stuck.
#[derive(thiserror::Error, Debug)]
pub enum MockgenError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("upload error: {0}")]
    Upload(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MockgenError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn missing_credential(msg: impl Into<String>) -> Self {
        Self::MissingCredential(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            MockgenError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            MockgenError::missing_credential("x")
                .to_string()
                .contains("missing credential:")
        );
        assert!(
            MockgenError::upload("x")
                .to_string()
                .contains("upload error:")
        );
        assert!(
            MockgenError::capture("x")
                .to_string()
                .contains("capture error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = MockgenError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
