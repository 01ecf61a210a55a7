//! Output record types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized view of one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Repository name
    pub name: String,
    /// Free-text description
    pub description: Option<String>,
    /// Web URL of the repository
    pub url: String,
    /// Stargazer count
    pub stars: u64,
    /// Fork count
    pub forks: u64,
    /// Primary language
    pub language: Option<String>,
    /// Last update as `YYYY-MM-DD HH:MM:SS`, or the raw value when it
    /// could not be parsed
    pub last_updated: Option<String>,
}

impl fmt::Display for RepositoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let none = "None";
        writeln!(f, "Name: {}", self.name)?;
        writeln!(
            f,
            "Description: {}",
            self.description.as_deref().unwrap_or(none)
        )?;
        writeln!(f, "URL: {}", self.url)?;
        writeln!(f, "Stars: {}", self.stars)?;
        writeln!(f, "Forks: {}", self.forks)?;
        writeln!(f, "Language: {}", self.language.as_deref().unwrap_or(none))?;
        write!(
            f,
            "Last Updated: {}",
            self.last_updated.as_deref().unwrap_or(none)
        )
    }
}
