//! 10jqka HTTP provider scenario tests against a local mock server.
//!
//! GREEN when:
//! - The provider requests `{base}/json_{year}.txt` with the configured UA.
//! - A non-2xx status and a malformed body are per-year failures.
//! - A batch over the HTTP provider keeps only the healthy years.

use std::collections::BTreeSet;
use std::time::Duration;

use cnmkt_fetch::{fetch_years, FetchSettings, ProviderError, TonghuashunProvider, TradingDayProvider};
use httpmock::prelude::*;

const UA: &str = "Mozilla/5.0 (test) Chrome/141.0.0.0";

fn provider(server: &MockServer) -> TonghuashunProvider {
    TonghuashunProvider::new(server.url("/mobilecfxf/data"), UA, Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn requests_year_file_with_user_agent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/mobilecfxf/data/json_2024.txt")
                .header("user-agent", UA);
            then.status(200)
                .header("content-type", "text/plain")
                .body(r#"["0102","0103","0104"]"#);
        })
        .await;

    let markers = provider(&server).fetch_year(2024).await.unwrap();

    mock.assert_async().await;
    assert_eq!(markers.len(), 3);
    assert!(markers.contains("0102"));
    assert!(!markers.contains("0101"));
}

#[tokio::test]
async fn non_2xx_is_http_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/mobilecfxf/data/json_1989.txt");
            then.status(404);
        })
        .await;

    let err = provider(&server).fetch_year(1989).await.unwrap_err();
    assert!(matches!(err, ProviderError::Http { status: 404 }), "got {err}");
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/mobilecfxf/data/json_2024.txt");
            then.status(200).body("<html>blocked</html>");
        })
        .await;

    let err = provider(&server).fetch_year(2024).await.unwrap_err();
    assert!(matches!(err, ProviderError::Decode(_)), "got {err}");
}

#[tokio::test]
async fn batch_over_http_keeps_healthy_years() {
    let server = MockServer::start_async().await;
    for year in [2022, 2024] {
        server
            .mock_async(move |when, then| {
                when.method(GET).path(format!("/mobilecfxf/data/json_{year}.txt"));
                then.status(200).body(r#"["0104"]"#);
            })
            .await;
    }
    server
        .mock_async(|when, then| {
            when.method(GET).path("/mobilecfxf/data/json_2023.txt");
            then.status(500);
        })
        .await;

    let p = provider(&server);
    let years: BTreeSet<i32> = (2022..=2024).collect();
    let settings = FetchSettings {
        max_concurrency: 3,
        request_timeout: Duration::from_secs(5),
    };
    let index = fetch_years(&p, &years, settings).await;

    assert_eq!(index.years().collect::<Vec<_>>(), vec![2022, 2024]);
}
