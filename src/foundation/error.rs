pub type BookResult<T> = Result<T, BookError>;

#[derive(thiserror::Error, Debug)]
pub enum BookError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BookError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

impl From<serde_json::Error> for BookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            BookError::config("x")
                .to_string()
                .contains("configuration error:")
        );
        assert!(BookError::render("x").to_string().contains("render error:"));
        assert!(
            BookError::Serde("x".into())
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = BookError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn json_errors_map_to_serde_variant() {
        let err: BookError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, BookError::Serde(_)));
    }
}
