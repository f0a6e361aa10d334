use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::{AssociationRow, OntologyId};
use crate::error::KiraError;
use crate::fs_util;

pub const EVIDENCE_HEADER: [&str; 5] = [
    "gene_symbol",
    "target_id",
    "score",
    "disease_name",
    "ontology_id",
];

#[derive(Debug, Serialize)]
struct EvidenceRecord<'a> {
    gene_symbol: &'a str,
    target_id: &'a str,
    score: f64,
    disease_name: &'a str,
    ontology_id: &'a str,
}

pub fn artifact_path(output_dir: &Utf8Path, dataset: &str) -> Utf8PathBuf {
    output_dir.join(format!("{dataset}_genes.csv"))
}

/// Renders the evidence table. The header is always present.
pub fn render(rows: &[AssociationRow], ontology_id: &OntologyId) -> Result<Vec<u8>, KiraError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(EVIDENCE_HEADER)
        .map_err(|err| KiraError::EvidenceWrite(err.to_string()))?;
    for row in rows {
        writer
            .serialize(EvidenceRecord {
                gene_symbol: &row.gene_symbol,
                target_id: &row.target_id,
                score: row.score,
                disease_name: &row.disease_name,
                ontology_id: ontology_id.as_str(),
            })
            .map_err(|err| KiraError::EvidenceWrite(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| KiraError::EvidenceWrite(err.to_string()))
}

pub fn write_evidence(
    path: &Utf8Path,
    rows: &[AssociationRow],
    ontology_id: &OntologyId,
) -> Result<(), KiraError> {
    let bytes = render(rows, ontology_id)?;
    fs_util::write_atomic(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_is_header_only() {
        let id: OntologyId = "EFO_0000305".parse().unwrap();
        let bytes = render(&[], &id).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "gene_symbol,target_id,score,disease_name,ontology_id\n"
        );
    }

    #[test]
    fn rows_keep_order_and_quote_commas() {
        let id: OntologyId = "EFO_0000305".parse().unwrap();
        let rows = vec![
            AssociationRow {
                gene_symbol: "BRCA1".to_string(),
                target_id: "ENSG00000012048".to_string(),
                score: 0.88,
                disease_name: "breast carcinoma, ductal".to_string(),
            },
            AssociationRow {
                gene_symbol: "TP53".to_string(),
                target_id: "ENSG00000141510".to_string(),
                score: 0.5,
                disease_name: "breast carcinoma, ductal".to_string(),
            },
        ];
        let text = String::from_utf8(render(&rows, &id).unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "BRCA1,ENSG00000012048,0.88,\"breast carcinoma, ductal\",EFO_0000305"
        );
        assert!(lines[2].starts_with("TP53,"));
    }
}
