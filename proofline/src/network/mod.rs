pub mod language_tool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use language_tool::{LanguageToolClient, LanguageToolConfig};

pub const DEFAULT_MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to build http client: {0}")]
    ClientBuild(String),
    #[error("request to analysis service failed: {0}")]
    Request(String),
    #[error("analysis service responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode analysis response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Spelling,
    Grammar,
}

impl IssueCategory {
    /// Maps a LanguageTool `rule.issueType` onto a category.
    pub fn from_issue_type(issue_type: &str) -> Self {
        if issue_type == "misspelling" {
            Self::Spelling
        } else {
            Self::Grammar
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Spelling => "error-spell",
            Self::Grammar => "error-grammar",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Self::Spelling => "Spelling suggestions",
            Self::Grammar => "Grammar suggestions",
        }
    }
}

/// One reported problem. `offset` and `length` are byte positions into the
/// text the check was requested for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub offset: usize,
    pub length: usize,
    pub category: IssueCategory,
    pub suggestions: Vec<String>,
}

impl Issue {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn best_suggestion(&self) -> Option<&str> {
        self.suggestions.first().map(String::as_str)
    }
}

/// The external checking collaborator.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, text: &str) -> Result<Vec<Issue>, NetworkError>;
}
