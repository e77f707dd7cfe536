use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use civic_scorecard::config::SourceConfig;
use civic_scorecard::sources::{
    normalize_payload, HttpSourceClient, SourceClient, SourceError, SourceQuery,
};

fn source_config(base_url: &str) -> SourceConfig {
    SourceConfig {
        name: "congress.gov".to_string(),
        base_url: base_url.to_string(),
        rate_limit: 100,
        api_key_env: None,
        timeout: "5s".to_string(),
    }
}

fn query() -> SourceQuery {
    SourceQuery {
        subject_id: "s-1".to_string(),
        from: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        to: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    }
}

async fn respond_with(status: u16) -> Result<serde_json::Value, SourceError> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects/s-1/evidence"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;

    let client = HttpSourceClient::new(&source_config(&server.uri()), None).unwrap();
    client.fetch_raw(&query()).await
}

#[tokio::test]
async fn test_fetch_sends_key_and_range() {
    let server = MockServer::start().await;
    let body = json!({
        "legislative_actions": [{
            "bill_number": "H.R. 1",
            "title": "Health Act",
            "date": "2023-03-01",
            "action": "sponsored",
            "category": "healthcare",
            "impact": "positive",
            "evidence": ["https://congress.gov/bill/1"]
        }],
        "campaign_promises": []
    });

    Mock::given(method("GET"))
        .and(path("/subjects/s-1/evidence"))
        .and(query_param("from", "2023-01-01"))
        .and(query_param("to", "2024-01-01"))
        .and(header("X-API-Key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        HttpSourceClient::new(&source_config(&server.uri()), Some("secret".to_string())).unwrap();
    let payload = client.fetch_raw(&query()).await.unwrap();
    assert_eq!(payload, body);

    let normalized = normalize_payload(client.name(), &payload).unwrap();
    assert_eq!(normalized.records.len(), 1);
    assert_eq!(normalized.records[0].source(), "congress.gov");
}

#[tokio::test]
async fn test_not_found_is_empty_payload() {
    let payload = respond_with(404).await.unwrap();
    assert!(payload.is_null());
    assert!(normalize_payload("congress.gov", &payload)
        .unwrap()
        .records
        .is_empty());
}

#[tokio::test]
async fn test_status_codes_map_to_source_errors() {
    assert_eq!(
        respond_with(429).await.unwrap_err(),
        SourceError::RateLimited {
            source_name: "congress.gov".to_string()
        }
    );
    assert_eq!(
        respond_with(403).await.unwrap_err(),
        SourceError::Unauthorized {
            source_name: "congress.gov".to_string(),
            status: 403
        }
    );
    assert!(matches!(
        respond_with(503).await.unwrap_err(),
        SourceError::Unavailable { .. }
    ));
}

#[tokio::test]
async fn test_invalid_json_is_payload_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = HttpSourceClient::new(&source_config(&server.uri()), None).unwrap();
    assert!(matches!(
        client.fetch_raw(&query()).await.unwrap_err(),
        SourceError::Payload { .. }
    ));
}

#[tokio::test]
async fn test_unreachable_source_is_unavailable() {
    // Nothing listens on this port once the server is dropped
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let client = HttpSourceClient::new(&source_config(&uri), None).unwrap();
    assert!(matches!(
        client.fetch_raw(&query()).await.unwrap_err(),
        SourceError::Unavailable { .. }
    ));
}
