use thiserror::Error;

/// Unified error type for flex-version operations
#[derive(Error, Debug)]
pub enum FlexVersionError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Could not find a version source on branch '{branch}' after examining {examined} commit(s). \
         No tags or merges qualified as a version source. If there are candidates, adapt the \
         configuration so they match; otherwise add a version tag somewhere in the history."
    )]
    VersionSourceNotFound { branch: String, examined: usize },

    #[error("Template error in output '{output}' ('{template}'): {message}")]
    Template {
        output: String,
        template: String,
        message: String,
    },

    #[error("Numeric parse error: {0}")]
    NumericParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in flex-version
pub type Result<T> = std::result::Result<T, FlexVersionError>;

impl FlexVersionError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        FlexVersionError::Config(msg.into())
    }

    /// Create a numeric parse error with context
    pub fn numeric(msg: impl Into<String>) -> Self {
        FlexVersionError::NumericParse(msg.into())
    }

    /// Create a template error for a named output
    pub fn template(
        output: impl Into<String>,
        template: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        FlexVersionError::Template {
            output: output.into(),
            template: template.into(),
            message: message.into(),
        }
    }

    /// Wrap a regex compile failure, naming what the pattern was for
    pub fn regex(context: &str, pattern: &str, err: regex::Error) -> Self {
        FlexVersionError::Config(format!(
            "Invalid {} pattern '{}': {}",
            context, pattern, err
        ))
    }
}
