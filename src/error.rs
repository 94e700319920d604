use thiserror::Error;

/// Search pipeline error types
#[derive(Error, Debug)]
pub enum SearchError {
    /// The logical index name resolved to no engine
    #[error("No search engine configured for index '{0}'")]
    NoSearchEngine(String),

    /// The reserved status value could not be parsed
    #[error("Invalid course status: {0}")]
    InvalidStatus(String),

    /// Failure reported by a search engine implementation
    #[error("Search engine error: {0}")]
    Engine(String),

    /// Failure reported by a result processor
    #[error("Result processor error: {0}")]
    Processor(String),

    /// Failure reported by a filter generator
    #[error("Filter generator error: {0}")]
    FilterGenerator(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            SearchError::NoSearchEngine(_) => "NO_SEARCH_ENGINE",
            SearchError::InvalidStatus(_) => "INVALID_STATUS",
            SearchError::Engine(_) => "ENGINE_ERROR",
            SearchError::Processor(_) => "PROCESSOR_ERROR",
            SearchError::FilterGenerator(_) => "FILTER_GENERATOR_ERROR",
            SearchError::Configuration(_) => "CONFIGURATION_ERROR",
            SearchError::Serialization(_) => "SERIALIZATION_ERROR",
            SearchError::Io(_) => "IO_ERROR",
        }
    }

    /// True when no engine was registered for the requested index
    pub fn is_no_search_engine(&self) -> bool {
        matches!(self, SearchError::NoSearchEngine(_))
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for SearchError {
    fn from(err: validator::ValidationErrors) -> Self {
        SearchError::Configuration(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        SearchError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SearchError::NoSearchEngine("course_info".to_string()).error_code(),
            "NO_SEARCH_ENGINE"
        );
        assert_eq!(
            SearchError::InvalidStatus("bogus".to_string()).error_code(),
            "INVALID_STATUS"
        );
        assert_eq!(
            SearchError::Engine("timeout".to_string()).error_code(),
            "ENGINE_ERROR"
        );
    }

    #[test]
    fn test_no_search_engine_is_distinguishable() {
        let err = SearchError::NoSearchEngine("courseware_content".to_string());
        assert!(err.is_no_search_engine());
        assert_eq!(
            err.to_string(),
            "No search engine configured for index 'courseware_content'"
        );
        assert!(!SearchError::Engine("boom".to_string()).is_no_search_engine());
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: SearchError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }
}
