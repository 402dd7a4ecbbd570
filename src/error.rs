use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, RecsError>;

#[derive(Error, Debug)]
pub enum RecsError {
    /// The queried restaurant has no case-insensitive match in the cleaned table.
    #[error("No match for '{query}'. Suggestions: {}", format_suggestions(.suggestions))]
    NotFound {
        query: String,
        suggestions: Vec<String>,
    },

    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Dataset contains no rows")]
    EmptyDataset,

    #[error("No rows left after dropping rows without a complete location")]
    NoUsableRows,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RecsError {
    /// Suggestions carried by a `NotFound` error, empty for every other kind.
    pub fn suggestions(&self) -> &[String] {
        match self {
            RecsError::NotFound { suggestions, .. } => suggestions,
            _ => &[],
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        "None".to_string()
    } else {
        suggestions.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_suggestions() {
        let err = RecsError::NotFound {
            query: "Pizza Plce".to_string(),
            suggestions: vec!["Pizza Place".to_string(), "Pizza Palace".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "No match for 'Pizza Plce'. Suggestions: Pizza Place, Pizza Palace"
        );
        assert_eq!(err.suggestions().len(), 2);
    }

    #[test]
    fn not_found_without_suggestions() {
        let err = RecsError::NotFound {
            query: "Zzyzx".to_string(),
            suggestions: Vec::new(),
        };
        assert_eq!(err.to_string(), "No match for 'Zzyzx'. Suggestions: None");
    }

    #[test]
    fn other_errors_have_no_suggestions() {
        assert!(RecsError::EmptyDataset.suggestions().is_empty());
    }
}
