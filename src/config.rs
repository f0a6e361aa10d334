use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::domain::DatasetDescriptor;
use crate::error::KiraError;
use crate::retry::RetryPolicy;

pub const DEFAULT_ENDPOINT: &str = "https://api.platform.opentargets.org/api/v4/graphql";
pub const DEFAULT_MAPPING_FILE: &str = "tcga_efo_mapping.json";
pub const DEFAULT_OUTPUT_DIR: &str = "evidence";
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.1;

/// Everything that shapes network behavior during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub endpoint: String,
    pub page_size: u32,
    pub retry: RetryPolicy,
    pub page_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: 500,
            retry: RetryPolicy::default(),
            page_delay: Duration::from_millis(200),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl FetchConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("OPENTARGETS_API_URL") {
            if !endpoint.trim().is_empty() {
                config.endpoint = endpoint.trim().to_string();
            }
        }
        config
    }

    pub fn validate(&self) -> Result<(), KiraError> {
        if self.page_size == 0 {
            return Err(KiraError::InvalidSettings(
                "page size must be positive".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(KiraError::InvalidSettings(
                "at least one attempt is required".to_string(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(KiraError::InvalidSettings("endpoint is empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingEntry {
    #[serde(alias = "ontology_id")]
    pub efo_id: String,
    #[serde(alias = "display_name")]
    pub disease_name: String,
}

impl MappingEntry {
    fn descriptor(&self, name: &str) -> Result<DatasetDescriptor, KiraError> {
        Ok(DatasetDescriptor {
            name: name.to_string(),
            ontology_id: self.efo_id.parse()?,
            display_name: self.disease_name.clone(),
        })
    }
}

/// Dataset name to ontology mapping, sorted by dataset name. Ontology ids are
/// only validated for the datasets a run selects.
#[derive(Debug, Clone, Default)]
pub struct DatasetMapping {
    entries: BTreeMap<String, MappingEntry>,
}

impl DatasetMapping {
    pub fn from_entries(entries: BTreeMap<String, MappingEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&MappingEntry> {
        self.entries.get(name)
    }

    /// Resolves the datasets to process, sorted by name. An empty `subset`
    /// selects everything; unknown names are warned about and skipped. A
    /// malformed ontology id is an error only for a selected dataset.
    pub fn select(&self, subset: &[String]) -> Result<Vec<DatasetDescriptor>, KiraError> {
        let chosen: Vec<(&str, &MappingEntry)> = if subset.is_empty() {
            self.entries
                .iter()
                .map(|(name, entry)| (name.as_str(), entry))
                .collect()
        } else {
            let requested: BTreeSet<&str> = subset.iter().map(String::as_str).collect();
            let unknown: Vec<&str> = requested
                .iter()
                .copied()
                .filter(|name| !self.entries.contains_key(*name))
                .collect();
            if !unknown.is_empty() {
                warn!("unknown datasets: {}", unknown.join(", "));
            }
            requested
                .into_iter()
                .filter_map(|name| self.entries.get(name).map(|entry| (name, entry)))
                .collect()
        };

        if chosen.is_empty() {
            return Err(KiraError::EmptySelection);
        }
        chosen
            .into_iter()
            .map(|(name, entry)| entry.descriptor(name))
            .collect()
    }
}

pub struct MappingLoader;

impl MappingLoader {
    pub fn load(path: Option<&Path>) -> Result<DatasetMapping, KiraError> {
        let mapping_path = match path {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(DEFAULT_MAPPING_FILE),
        };

        if !mapping_path.exists() {
            return Err(KiraError::MissingMapping(mapping_path));
        }

        let content = fs::read_to_string(&mapping_path)
            .map_err(|_| KiraError::MappingRead(mapping_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<DatasetMapping, KiraError> {
        let entries: BTreeMap<String, MappingEntry> =
            serde_json::from_str(content).map_err(|err| KiraError::MappingParse(err.to_string()))?;
        Ok(DatasetMapping::from_entries(entries))
    }
}
