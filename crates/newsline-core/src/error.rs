//! Configuration errors shared by the filter chains

/// A filter chain named a filter this build does not provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownParseFilter(String),
    UnknownUrlFilter(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownParseFilter(name) => write!(f, "unknown parse filter: {name}"),
            Self::UnknownUrlFilter(name) => write!(f, "unknown URL filter: {name}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_filter() {
        let err = ConfigError::UnknownParseFilter("xpath".into());
        assert_eq!(err.to_string(), "unknown parse filter: xpath");
        let err = ConfigError::UnknownUrlFilter("regex".into());
        assert!(err.to_string().contains("regex"));
    }
}
