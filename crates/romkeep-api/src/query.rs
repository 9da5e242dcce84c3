//! Filter and sort settings for the activity list

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Setting of one tri-state filter dimension
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Ignore this dimension
    #[default]
    All,
    /// Require the flag to be set
    Match,
    /// Require the flag to be clear
    Unmatch,
}

impl FilterMode {
    /// Whether a value passes this filter
    pub fn accepts(self, value: bool) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Match => value,
            FilterMode::Unmatch => !value,
        }
    }

    /// Next setting when the user cycles the filter
    pub fn next(self) -> Self {
        match self {
            FilterMode::All => FilterMode::Match,
            FilterMode::Match => FilterMode::Unmatch,
            FilterMode::Unmatch => FilterMode::All,
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "match" | "yes" => Ok(FilterMode::Match),
            "unmatch" | "no" => Ok(FilterMode::Unmatch),
            other => Err(format!("unknown filter mode '{}'", other)),
        }
    }
}

/// Filters over the three runtime/metadata flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub running: FilterMode,
    pub favorite: FilterMode,
    pub completed: FilterMode,
}

/// Key the activity list is ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Time,
    Count,
    #[default]
    Last,
}

impl SortKey {
    /// Next key when the user cycles the sort
    pub fn next(self) -> Self {
        match self {
            SortKey::Name => SortKey::Time,
            SortKey::Time => SortKey::Count,
            SortKey::Count => SortKey::Last,
            SortKey::Last => SortKey::Name,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortKey::Name => "name",
            SortKey::Time => "time",
            SortKey::Count => "count",
            SortKey::Last => "last",
        };
        f.write_str(s)
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "time" => Ok(SortKey::Time),
            "count" => Ok(SortKey::Count),
            "last" => Ok(SortKey::Last),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

/// System selector; `All` is the wildcard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemFilter {
    #[default]
    All,
    Only(String),
}

impl SystemFilter {
    pub fn accepts(&self, system: &str) -> bool {
        match self {
            SystemFilter::All => true,
            SystemFilter::Only(wanted) => wanted == system,
        }
    }
}

impl From<Option<String>> for SystemFilter {
    fn from(system: Option<String>) -> Self {
        match system {
            Some(s) if s != "All" => SystemFilter::Only(s),
            _ => SystemFilter::All,
        }
    }
}

/// Everything the presentation layer chooses about the list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityQuery {
    pub filters: FilterState,
    pub sort: SortKey,
    pub reverse: bool,
    pub system: SystemFilter,
}
