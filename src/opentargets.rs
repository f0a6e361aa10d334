use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::config::FetchConfig;
use crate::domain::{AssociationRow, OntologyId, PageResult, PageWindow, TargetPage};
use crate::error::KiraError;
use crate::retry::{RetryPolicy, Sleeper};

pub const ASSOCIATED_TARGETS_QUERY: &str = r#"query AssociatedTargets($efoId: String!, $size: Int!, $index: Int!) {
  disease(efoId: $efoId) {
    id
    name
    associatedTargets(page: { size: $size, index: $index }) {
      count
      rows {
        target {
          id
          approvedSymbol
        }
        score
      }
    }
  }
}"#;

/// A single attempt at one page. Implementations must classify failures:
/// transport problems as [`KiraError::is_transport`] errors, error payloads as
/// anything else.
pub trait AssociationClient {
    fn query_page(
        &self,
        ontology_id: &OntologyId,
        window: PageWindow,
    ) -> Result<PageResult, KiraError>;
}

impl<T: AssociationClient + ?Sized> AssociationClient for &T {
    fn query_page(
        &self,
        ontology_id: &OntologyId,
        window: PageWindow,
    ) -> Result<PageResult, KiraError> {
        (**self).query_page(ontology_id, window)
    }
}

#[derive(Clone)]
pub struct OpenTargetsHttpClient {
    client: Client,
    endpoint: String,
}

impl OpenTargetsHttpClient {
    pub fn new(config: &FetchConfig) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-ev/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::InvalidSettings(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| KiraError::OpenTargetsHttp(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, KiraError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Open Targets request failed".to_string());
        Err(KiraError::OpenTargetsStatus { status, message })
    }
}

impl AssociationClient for OpenTargetsHttpClient {
    fn query_page(
        &self,
        ontology_id: &OntologyId,
        window: PageWindow,
    ) -> Result<PageResult, KiraError> {
        let body = query_body(ontology_id, window);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|err| KiraError::OpenTargetsHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let raw: Value = response
            .json()
            .map_err(|err| KiraError::OpenTargetsDecode(err.to_string()))?;
        parse_page(ontology_id, &raw)
    }
}

pub fn query_body(ontology_id: &OntologyId, window: PageWindow) -> Value {
    json!({
        "query": ASSOCIATED_TARGETS_QUERY,
        "variables": {
            "efoId": ontology_id.as_str(),
            "size": window.size,
            "index": window.index,
        }
    })
}

/// Interprets a decoded GraphQL response. Any non-null top-level `errors`
/// value, even an empty array, and a `null` disease are application failures.
pub fn parse_page(ontology_id: &OntologyId, raw: &Value) -> Result<PageResult, KiraError> {
    if let Some(errors) = raw.get("errors").filter(|v| !v.is_null()) {
        let message = errors
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|err| err.get("message").and_then(|v| v.as_str()))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| format!("GraphQL errors: {errors}"));
        return Err(KiraError::OpenTargetsQuery(message));
    }

    let disease = raw
        .get("data")
        .and_then(|v| v.get("disease"))
        .filter(|v| !v.is_null())
        .ok_or_else(|| KiraError::DiseaseNotFound(ontology_id.to_string()))?;

    let disease_name = disease
        .get("name")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());

    let targets = disease
        .get("associatedTargets")
        .filter(|v| !v.is_null())
        .map(|block| {
            let label = disease_name.clone().unwrap_or_default();
            let rows = block
                .get("rows")
                .and_then(|v| v.as_array())
                .map(|rows| rows.iter().map(|row| parse_row(row, &label)).collect())
                .unwrap_or_default();
            TargetPage {
                total_count: block.get("count").and_then(|v| v.as_u64()),
                rows,
            }
        });

    Ok(PageResult {
        disease_name,
        targets,
    })
}

fn parse_row(row: &Value, disease_name: &str) -> AssociationRow {
    let target = row.get("target");
    AssociationRow {
        gene_symbol: target
            .and_then(|v| v.get("approvedSymbol"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        target_id: target
            .and_then(|v| v.get("id"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        score: row.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0),
        disease_name: disease_name.to_string(),
    }
}

/// Page Fetcher: one logical page request with the retry policy applied.
pub struct PageFetcher<C: AssociationClient, S: Sleeper> {
    client: C,
    policy: RetryPolicy,
    sleeper: S,
}

impl<C: AssociationClient, S: Sleeper> PageFetcher<C, S> {
    pub fn new(client: C, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            client,
            policy,
            sleeper,
        }
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn fetch(
        &self,
        ontology_id: &OntologyId,
        window: PageWindow,
    ) -> Result<PageResult, KiraError> {
        debug!(
            ontology_id = ontology_id.as_str(),
            page_index = window.index,
            page_size = window.size,
            "requesting page"
        );
        self.policy
            .run(&self.sleeper, |_attempt| {
                self.client.query_page(ontology_id, window)
            })
            .inspect_err(|err| {
                if !err.is_transport() {
                    error!(
                        ontology_id = ontology_id.as_str(),
                        page_index = window.index,
                        "query rejected: {err}"
                    );
                }
            })
    }
}
