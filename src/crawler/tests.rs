//! Tests for crawler module

use super::*;
use crate::events::MemorySink;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn repo(name: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{name} description"),
        "html_url": format!("https://github.com/acme/{name}"),
        "stargazers_count": 3,
        "forks_count": 1,
        "language": "Rust",
        "updated_at": "2023-06-15T08:30:00Z"
    })
}

fn test_config(server: &MockServer) -> CrawlerConfig {
    CrawlerConfig {
        max_retries: 1,
        backoff_factor: 0.01,
        ..CrawlerConfig::default()
    }
    .with_api_url(server.uri())
}

fn as_items(values: Vec<Value>) -> Vec<RawItem> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        })
        .collect()
}

// ============================================================================
// extract_all Tests
// ============================================================================

#[test]
fn test_extract_all_skips_bad_items_and_keeps_order() {
    let sink = Arc::new(MemorySink::new());
    let crawler = OrgCrawler::new(CrawlerConfig::default())
        .unwrap()
        .with_events(sink.clone());

    let items = as_items(vec![
        repo("alpha"),
        json!({ "name": "broken", "stargazers_count": 1 }),
        repo("beta"),
        json!({ "description": "anonymous" }),
        repo("gamma"),
    ]);

    let (records, skipped) = crawler.extract_all(&items);

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    assert_eq!(skipped.len(), 2);
    assert_eq!(skipped[0].index, 1);
    assert_eq!(skipped[0].name.as_deref(), Some("broken"));
    assert_eq!(
        skipped[0].reason,
        "Missing required field(s): forks_count, html_url"
    );
    assert_eq!(skipped[1].index, 3);
    assert_eq!(skipped[1].name, None);
    assert_eq!(sink.count_kind("record_skipped"), 2);
}

// ============================================================================
// fetch_organization_repos Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_organization_repos_sends_api_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .and(header("Accept", "application/vnd.github.v3+json"))
        .and(header("Authorization", "token t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([repo("alpha"), repo("beta")])))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let crawler = OrgCrawler::new(test_config(&server).with_token("t0ken"))
        .unwrap()
        .with_events(sink.clone());

    let repos = crawler.fetch_organization_repos("acme").await.unwrap();

    assert_eq!(repos.org, "acme");
    assert!(!repos.partial);
    assert_eq!(repos.len(), 2);
    assert_eq!(repos.pages_requested, 1);
    assert_eq!(repos.records[0].url, "https://github.com/acme/alpha");
    assert_eq!(
        repos.records[1].last_updated.as_deref(),
        Some("2023-06-15 08:30:00")
    );
    assert_eq!(
        sink.count(|e| matches!(
            e,
            CrawlEvent::OrgFetched {
                records: 2,
                partial: false,
                ..
            }
        )),
        1
    );
}

#[tokio::test]
async fn test_fetch_organization_repos_without_token_omits_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([repo("alpha")])))
        .mount(&server)
        .await;

    let crawler = OrgCrawler::new(test_config(&server)).unwrap();
    let repos = crawler.fetch_organization_repos("acme").await.unwrap();
    assert_eq!(repos.len(), 1);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_fetch_organization_repos_reports_skips_and_partial() {
    let server = MockServer::start().await;
    let mut page: Vec<Value> = (0..99).map(|i| repo(&format!("repo-{i}"))).collect();
    page.insert(10, json!({ "name": "nameless-url", "stargazers_count": 0, "forks_count": 0 }));
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(page)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let crawler = OrgCrawler::new(test_config(&server))
        .unwrap()
        .with_events(sink.clone());

    let repos = crawler.fetch_organization_repos("acme").await.unwrap();

    assert!(repos.partial);
    assert_eq!(repos.len(), 99);
    assert_eq!(repos.skipped.len(), 1);
    assert_eq!(repos.skipped[0].index, 10);
    assert!(repos.abort_reason.as_deref().unwrap().contains("HTTP 500"));
    assert_eq!(
        sink.count(|e| matches!(e, CrawlEvent::OrgFetched { partial: true, .. })),
        1
    );
}

#[tokio::test]
async fn test_fetch_organization_repos_rejects_empty_org() {
    let crawler = OrgCrawler::new(CrawlerConfig::default()).unwrap();
    let err = crawler.fetch_organization_repos("   ").await.unwrap_err();
    assert!(matches!(
        err,
        crate::error::Error::InvalidConfigValue { ref field, .. } if field == "org"
    ));
}

#[test]
fn test_new_rejects_invalid_config() {
    let config = CrawlerConfig {
        backoff_factor: f64::NAN,
        ..CrawlerConfig::default()
    };
    assert!(OrgCrawler::new(config).is_err());
}
