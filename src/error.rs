use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid ontology id: {0}")]
    InvalidOntologyId(String),

    #[error("mapping file not found: {0}")]
    #[diagnostic(help("pass --mapping-file or run from the directory holding tcga_efo_mapping.json"))]
    MissingMapping(PathBuf),

    #[error("failed to read mapping file at {0}")]
    MappingRead(PathBuf),

    #[error("failed to parse mapping file: {0}")]
    MappingParse(String),

    #[error("no datasets to process")]
    EmptySelection,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Open Targets request failed: {0}")]
    OpenTargetsHttp(String),

    #[error("Open Targets returned status {status}: {message}")]
    OpenTargetsStatus { status: u16, message: String },

    #[error("Open Targets response could not be decoded: {0}")]
    OpenTargetsDecode(String),

    #[error("Open Targets query error: {0}")]
    OpenTargetsQuery(String),

    #[error("disease not found in Open Targets: {0}")]
    DiseaseNotFound(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to write evidence table: {0}")]
    EvidenceWrite(String),
}

impl KiraError {
    /// Transport failures are worth another attempt; everything else is final.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            KiraError::OpenTargetsHttp(_)
                | KiraError::OpenTargetsStatus { .. }
                | KiraError::OpenTargetsDecode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(KiraError::OpenTargetsHttp("reset".to_string()).is_transport());
        assert!(
            KiraError::OpenTargetsStatus {
                status: 502,
                message: "bad gateway".to_string()
            }
            .is_transport()
        );
        assert!(!KiraError::OpenTargetsQuery("syntax".to_string()).is_transport());
        assert!(!KiraError::DiseaseNotFound("EFO_1".to_string()).is_transport());
    }
}
