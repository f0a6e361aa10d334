//! Paginated collection of one disease's associated targets.
//!
//! Rows are assumed to arrive score-descending; the first row below the
//! threshold ends collection. Out-of-order upstream data is not detected.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{AssociationRow, FetchOutcome, OntologyId, PageWindow};
use crate::opentargets::{AssociationClient, PageFetcher};
use crate::retry::Sleeper;

pub struct TargetCollector<C: AssociationClient, S: Sleeper> {
    fetcher: PageFetcher<C, S>,
    page_size: u32,
    page_delay: Duration,
}

impl<C: AssociationClient, S: Sleeper> TargetCollector<C, S> {
    pub fn new(fetcher: PageFetcher<C, S>, page_size: u32, page_delay: Duration) -> Self {
        Self {
            fetcher,
            page_size,
            page_delay,
        }
    }

    pub fn collect(&self, ontology_id: &OntologyId, score_threshold: f64) -> FetchOutcome {
        let mut rows: Vec<AssociationRow> = Vec::new();
        let mut window = PageWindow::first(self.page_size);
        let mut disease_name: Option<String> = None;
        let mut total_count: Option<u64> = None;

        loop {
            let page = match self.fetcher.fetch(ontology_id, window) {
                Ok(page) => page,
                Err(err) => {
                    warn!(
                        ontology_id = ontology_id.as_str(),
                        page_index = window.index,
                        discarded = rows.len(),
                        "fetch failed, dropping dataset: {err}"
                    );
                    return FetchOutcome::Failure {
                        error: err.to_string(),
                    };
                }
            };

            if window.index == 0 {
                disease_name = page.disease_name.clone();
            }

            // Only a missing targets block ends here. An unknown disease is
            // rejected by the fetcher and lands in the failure arm above.
            let Some(targets) = page.targets else {
                debug!(ontology_id = ontology_id.as_str(), "no associated targets block");
                break;
            };

            if window.index == 0 {
                total_count = targets.total_count;
                info!(
                    ontology_id = ontology_id.as_str(),
                    total = targets.total_count.unwrap_or_default(),
                    "total associated targets"
                );
            }

            if targets.rows.is_empty() {
                break;
            }

            let page_len = targets.rows.len();
            let accepted = targets
                .rows
                .iter()
                .take_while(|row| row.score >= score_threshold)
                .count();
            let hit_threshold = accepted < page_len;
            rows.extend(targets.rows.into_iter().take(accepted));

            if hit_threshold {
                debug!(
                    ontology_id = ontology_id.as_str(),
                    page_index = window.index,
                    kept = rows.len(),
                    "score fell below threshold"
                );
                break;
            }

            if page_len < self.page_size as usize {
                break;
            }

            self.fetcher.sleeper().sleep(self.page_delay);
            window = window.next();
        }

        let total_associated = total_count.unwrap_or(rows.len() as u64);
        FetchOutcome::Success {
            rows,
            disease_name,
            total_associated,
        }
    }
}
