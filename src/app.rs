use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use tracing::{info, warn};

use crate::collector::TargetCollector;
use crate::config::FetchConfig;
use crate::domain::{DatasetDescriptor, DatasetResult, FetchOutcome};
use crate::error::KiraError;
use crate::evidence;
use crate::fs_util;
use crate::opentargets::{AssociationClient, PageFetcher};
use crate::retry::Sleeper;
use crate::summary::RunSummary;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub summary_path: Utf8PathBuf,
    pub results: Vec<DatasetResult>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.summary.succeeded
    }

    pub fn failed(&self) -> usize {
        self.summary.failed
    }
}

/// Dataset pipeline: one collector run, one artifact and one summary entry
/// per dataset, strictly in order.
pub struct App<C: AssociationClient, S: Sleeper> {
    collector: TargetCollector<C, S>,
    output_dir: Utf8PathBuf,
}

impl<C: AssociationClient, S: Sleeper> App<C, S> {
    pub fn new(client: C, sleeper: S, config: &FetchConfig, output_dir: Utf8PathBuf) -> Self {
        let fetcher = PageFetcher::new(client, config.retry, sleeper);
        let collector = TargetCollector::new(fetcher, config.page_size, config.page_delay);
        Self {
            collector,
            output_dir,
        }
    }

    /// Processes `datasets` sorted by name. Per-dataset fetch failures end up
    /// in the summary; only an empty selection or a filesystem error fails the
    /// run.
    pub fn run(
        &self,
        datasets: &[DatasetDescriptor],
        score_threshold: f64,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, KiraError> {
        if datasets.is_empty() {
            return Err(KiraError::EmptySelection);
        }
        let mut ordered = datasets.to_vec();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));

        fs_util::ensure_dir(&self.output_dir)?;

        let total = ordered.len();
        sink.event(ProgressEvent {
            message: format!(
                "Fetching genes for {total} datasets (score >= {score_threshold})"
            ),
            elapsed: None,
        });

        let mut summary = RunSummary::new(score_threshold);
        let mut results = Vec::with_capacity(total);
        for (position, descriptor) in ordered.into_iter().enumerate() {
            sink.event(ProgressEvent {
                message: format!(
                    "[{}/{total}] {}: {} ({})",
                    position + 1,
                    descriptor.name,
                    descriptor.display_name,
                    descriptor.ontology_id
                ),
                elapsed: None,
            });
            let result = self.process(descriptor, score_threshold, sink)?;
            summary.record(&result);
            results.push(result);
        }

        let summary_path = RunSummary::path(&self.output_dir);
        summary.write(&summary_path)?;
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            summary = summary_path.as_str(),
            "run complete"
        );
        sink.event(ProgressEvent {
            message: format!(
                "Done: {} succeeded, {} failed",
                summary.succeeded, summary.failed
            ),
            elapsed: None,
        });
        sink.event(ProgressEvent {
            message: format!("Summary: {summary_path}"),
            elapsed: None,
        });

        Ok(RunReport {
            summary,
            summary_path,
            results,
        })
    }

    fn process(
        &self,
        descriptor: DatasetDescriptor,
        score_threshold: f64,
        sink: &dyn ProgressSink,
    ) -> Result<DatasetResult, KiraError> {
        let start = Instant::now();
        let artifact_path = evidence::artifact_path(&self.output_dir, &descriptor.name);
        let outcome = self
            .collector
            .collect(&descriptor.ontology_id, score_threshold);

        evidence::write_evidence(&artifact_path, outcome.rows(), &descriptor.ontology_id)?;

        let message = match &outcome {
            FetchOutcome::Success { rows, .. } => {
                info!(
                    dataset = descriptor.name.as_str(),
                    genes = rows.len(),
                    "evidence written"
                );
                format!("  Saved {} genes to {artifact_path}", rows.len())
            }
            FetchOutcome::Failure { error } => {
                warn!(dataset = descriptor.name.as_str(), "fetch failed: {error}");
                format!("  Failed to fetch. Empty CSV written to {artifact_path}")
            }
        };
        sink.event(ProgressEvent {
            message,
            elapsed: Some(start.elapsed()),
        });

        Ok(DatasetResult {
            descriptor,
            outcome,
            artifact_path,
        })
    }
}
