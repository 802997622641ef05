//! HTTP market data gateway against a mocked quote service

use crate::test_utils::{bars, mock_history, mock_quote, mock_ratios, mock_status};
use alertwatch::models::market::Interval;
use alertwatch::services::http_gateway::HttpMarketDataGateway;
use alertwatch::services::market_data::{GatewayError, MarketDataGateway};
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> HttpMarketDataGateway {
    HttpMarketDataGateway::with_client(format!("{}/", server.uri()), reqwest::Client::new())
}

#[tokio::test]
async fn fetches_fast_quote() {
    let server = MockServer::start().await;
    mock_quote(&server, "AAPL", 190.25).await;

    let quote = gateway(&server).fast_quote("AAPL").await.unwrap();
    assert_eq!(quote.current_price, 190.25);
    assert_eq!(quote.last_volume, Some(1_250_000.0));
    assert_eq!(quote.average_volume, None);
}

#[tokio::test]
async fn fetches_extended_data() {
    let server = MockServer::start().await;
    mock_ratios(
        &server,
        "MSFT",
        json!({ "pe_ratio": 35.2, "volatility_30d": 0.21, "next_earnings_date": "2024-07-23" }),
    )
    .await;

    let data = gateway(&server).extended_data("MSFT").await.unwrap();
    assert_eq!(data.pe_ratio, Some(35.2));
    assert_eq!(data.volatility_30d, Some(0.21));
    assert_eq!(data.next_earnings_date, NaiveDate::from_ymd_opt(2024, 7, 23));
}

#[tokio::test]
async fn fetches_history_oldest_first() {
    let server = MockServer::start().await;
    let mut payload = bars(&[101.0, 102.0, 103.0]);
    payload.reverse();
    Mock::given(method("GET"))
        .and(path("/history/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "bars": payload })))
        .mount(&server)
        .await;

    let series = gateway(&server)
        .history("AAPL", 90, Interval::Daily)
        .await
        .unwrap();
    assert_eq!(series.ticker, "AAPL");
    assert_eq!(series.closes(), vec![101.0, 102.0, 103.0]);
}

#[tokio::test]
async fn sends_lookback_and_interval() {
    let server = MockServer::start().await;
    mock_history(&server, "AAPL", 180, &[100.0, 101.0]).await;

    let gw = gateway(&server);
    assert!(gw.history("AAPL", 180, Interval::Daily).await.is_ok());
    // no mock matches a different window
    assert!(matches!(
        gw.history("AAPL", 90, Interval::Daily).await,
        Err(GatewayError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn empty_history_is_an_error() {
    let server = MockServer::start().await;
    mock_history(&server, "AAPL", 90, &[]).await;

    let err = gateway(&server)
        .history("AAPL", 90, Interval::Daily)
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::Empty { ticker: "AAPL".to_string() });
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let server = MockServer::start().await;
    mock_status(&server, "/quote/AAPL", 503).await;

    let err = gateway(&server).fast_quote("AAPL").await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Status {
            ticker: "AAPL".to_string(),
            status: 503
        }
    );
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = gateway(&server).fast_quote("AAPL").await.unwrap_err();
    assert!(matches!(err, GatewayError::Decode { .. }));
}

#[tokio::test]
async fn earnings_date_may_be_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/earnings/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "next_earnings_date": null })))
        .mount(&server)
        .await;

    let date = gateway(&server).next_earnings_date("AAPL").await.unwrap();
    assert_eq!(date, None);
}

#[tokio::test]
async fn trims_trailing_slash_from_base_url() {
    let server = MockServer::start().await;
    let gw = HttpMarketDataGateway::with_client(format!("{}/", server.uri()), reqwest::Client::new());
    assert_eq!(gw.base_url(), server.uri());
}
