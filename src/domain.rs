use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

/// Stable disease identifier as used by Open Targets, e.g. `EFO_0000305` or
/// `MONDO_0004992`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OntologyId(String);

impl OntologyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OntologyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OntologyId {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = normalized
            .split_once('_')
            .map(|(prefix, local)| {
                !prefix.is_empty()
                    && !local.is_empty()
                    && prefix.chars().all(|ch| ch.is_ascii_alphabetic())
                    && local.chars().all(|ch| ch.is_ascii_alphanumeric())
            })
            .unwrap_or(false);
        if !is_valid {
            return Err(KiraError::InvalidOntologyId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for OntologyId {
    type Error = KiraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OntologyId> for String {
    fn from(value: OntologyId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub name: String,
    pub ontology_id: OntologyId,
    pub display_name: String,
}

/// One gene-disease evidence record. Not deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationRow {
    pub gene_symbol: String,
    pub target_id: String,
    pub score: f64,
    pub disease_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub size: u32,
    pub index: u32,
}

impl PageWindow {
    pub fn first(size: u32) -> Self {
        Self { size, index: 0 }
    }

    pub fn next(self) -> Self {
        Self {
            size: self.size,
            index: self.index + 1,
        }
    }
}

/// The `associatedTargets` block of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPage {
    pub total_count: Option<u64>,
    pub rows: Vec<AssociationRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub disease_name: Option<String>,
    /// `None` when the service returned no associated-targets block at all.
    pub targets: Option<TargetPage>,
}

/// Result of collecting one dataset. There is no partial success: a failure
/// carries no rows even if earlier pages were fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success {
        rows: Vec<AssociationRow>,
        disease_name: Option<String>,
        total_associated: u64,
    },
    Failure {
        error: String,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn rows(&self) -> &[AssociationRow] {
        match self {
            FetchOutcome::Success { rows, .. } => rows,
            FetchOutcome::Failure { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetResult {
    pub descriptor: DatasetDescriptor,
    pub outcome: FetchOutcome,
    pub artifact_path: Utf8PathBuf,
}
