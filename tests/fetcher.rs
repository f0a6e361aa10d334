use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;

use kira_evidence::config::FetchConfig;
use kira_evidence::domain::{OntologyId, PageWindow};
use kira_evidence::error::KiraError;
use kira_evidence::opentargets::{AssociationClient, OpenTargetsHttpClient, PageFetcher};
use kira_evidence::retry::{RetryPolicy, Sleeper};

#[derive(Default)]
struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// Answers one request per canned `(status, body)` pair, then stops.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/api/v4/graphql", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let mut bodies = Vec::new();
        for (status, body) in responses {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).unwrap();
            bodies.push(String::from_utf8(request_body).unwrap());

            let mut stream = reader.into_inner();
            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
        bodies
    });
    (endpoint, handle)
}

fn client(endpoint: String) -> OpenTargetsHttpClient {
    let config = FetchConfig {
        endpoint,
        request_timeout: Duration::from_secs(5),
        ..FetchConfig::default()
    };
    OpenTargetsHttpClient::new(&config).unwrap()
}

fn efo() -> OntologyId {
    "EFO_0000305".parse().unwrap()
}

const PAGE: &str = r#"{"data":{"disease":{"id":"EFO_0000305","name":"breast carcinoma","associatedTargets":{"count":1,"rows":[{"target":{"id":"ENSG00000012048","approvedSymbol":"BRCA1"},"score":0.88}]}}}}"#;

#[test]
fn server_errors_are_retried_until_success() {
    let (endpoint, server) = serve(vec![(503, "{}"), (502, "{}"), (200, PAGE)]);
    let sleeper = RecordingSleeper::default();
    let fetcher = PageFetcher::new(client(endpoint), RetryPolicy::default(), &sleeper);

    let page = fetcher.fetch(&efo(), PageWindow::first(500)).unwrap();
    let rows = page.targets.unwrap().rows;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].gene_symbol, "BRCA1");
    assert_eq!(
        *sleeper.slept.lock().unwrap(),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );

    let bodies = server.join().unwrap();
    assert_eq!(bodies.len(), 3);
    let request: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(request["variables"]["efoId"], "EFO_0000305");
    assert_eq!(request["variables"]["size"], 500);
    assert_eq!(request["variables"]["index"], 0);
}

#[test]
fn persistent_server_error_gives_up_after_three_attempts() {
    let (endpoint, server) = serve(vec![(500, "{}"), (500, "{}"), (500, "{}")]);
    let sleeper = RecordingSleeper::default();
    let fetcher = PageFetcher::new(client(endpoint), RetryPolicy::default(), &sleeper);

    let err = fetcher.fetch(&efo(), PageWindow::first(500)).unwrap_err();
    assert_matches!(err, KiraError::OpenTargetsStatus { status: 500, .. });
    assert_eq!(server.join().unwrap().len(), 3);
    assert_eq!(sleeper.slept.lock().unwrap().len(), 2);
}

#[test]
fn graphql_errors_are_not_retried() {
    let (endpoint, server) = serve(vec![(
        200,
        r#"{"errors":[{"message":"Unknown argument efoId"}],"data":null}"#,
    )]);
    let sleeper = RecordingSleeper::default();
    let fetcher = PageFetcher::new(client(endpoint), RetryPolicy::default(), &sleeper);

    let err = fetcher.fetch(&efo(), PageWindow::first(500)).unwrap_err();
    assert_matches!(err, KiraError::OpenTargetsQuery(_));
    assert_eq!(server.join().unwrap().len(), 1);
    assert!(sleeper.slept.lock().unwrap().is_empty());
}

#[test]
fn unreachable_endpoint_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/graphql", listener.local_addr().unwrap());
    drop(listener);

    let err = client(endpoint)
        .query_page(&efo(), PageWindow::first(500))
        .unwrap_err();
    assert!(err.is_transport());
}
