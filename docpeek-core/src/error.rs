use thiserror::Error;

/// Failure to open a container. Aborts the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenError {
    #[error("Failed to read source: {0}")]
    IoFailure(String),

    #[error("Unsupported container format: {0}")]
    UnsupportedFormat(String),

    #[error("Archive contains no entries")]
    EmptyArchive,

    #[error("Open cancelled")]
    Cancelled,
}

impl OpenError {
    pub(crate) fn io(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        OpenError::IoFailure(format!("{}: {}", context, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_descriptive() {
        let e = OpenError::io("report.docx", "permission denied");
        assert_eq!(e.to_string(), "Failed to read source: report.docx: permission denied");
        assert!(!OpenError::EmptyArchive.to_string().is_empty());
        assert!(!OpenError::Cancelled.to_string().is_empty());
    }
}
