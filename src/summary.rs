use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{DatasetResult, FetchOutcome};
use crate::error::KiraError;
use crate::fs_util;

pub const SUMMARY_FILE: &str = "fetch_summary.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub fetch_timestamp: String,
    pub score_threshold: f64,
    pub succeeded: usize,
    pub failed: usize,
    pub datasets: BTreeMap<String, SummaryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub ontology_id: String,
    pub disease_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_associated: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub artifact_path: Utf8PathBuf,
}

impl SummaryEntry {
    pub fn from_result(result: &DatasetResult) -> Self {
        let descriptor = &result.descriptor;
        let artifact_path = result.artifact_path.clone();
        let ontology_id = descriptor.ontology_id.to_string();
        match &result.outcome {
            FetchOutcome::Success {
                rows,
                disease_name,
                total_associated,
            } => Self {
                ontology_id,
                disease_name: disease_name
                    .clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| descriptor.display_name.clone()),
                gene_count: Some(rows.len()),
                total_associated: Some(*total_associated),
                error: None,
                artifact_path,
            },
            FetchOutcome::Failure { error } => Self {
                ontology_id,
                disease_name: descriptor.display_name.clone(),
                gene_count: None,
                total_associated: None,
                error: Some(format!("API fetch failed: {error}")),
                artifact_path,
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl RunSummary {
    pub fn new(score_threshold: f64) -> Self {
        Self {
            fetch_timestamp: chrono::Utc::now().to_rfc3339(),
            score_threshold,
            succeeded: 0,
            failed: 0,
            datasets: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, result: &DatasetResult) {
        if result.outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.datasets.insert(
            result.descriptor.name.clone(),
            SummaryEntry::from_result(result),
        );
    }

    pub fn path(output_dir: &Utf8Path) -> Utf8PathBuf {
        output_dir.join(SUMMARY_FILE)
    }

    /// Overwrites any summary left by a previous run.
    pub fn write(&self, path: &Utf8Path) -> Result<(), KiraError> {
        let mut bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        bytes.push(b'\n');
        fs_util::write_atomic(path, &bytes)
    }
}
