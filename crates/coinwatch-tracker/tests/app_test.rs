//! End-to-end command tests against a local market API and a SQLite file.

use axum::{routing::get, Router};
use chrono::{TimeDelta, Utc};
use coinwatch_core::CoinSnapshot;
use coinwatch_persistence::PriceStore;
use coinwatch_tracker::{AppConfig, AppError, Application, Command, Settings};
use serde_json::Value;
use std::net::SocketAddr;
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn start_market_api(body: String) -> SocketAddr {
    let app = Router::new().route(
        "/api/v3/coins/markets",
        get(move || {
            let body = body.clone();
            async move { ([("content-type", "application/json")], body) }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn settings(dir: &TempDir, api: Option<SocketAddr>, extra: &str) -> Settings {
    let db_path = dir.path().join("prices.db");
    let base_url = match api {
        Some(addr) => format!("http://{addr}/api/v3"),
        None => "http://127.0.0.1:9/api/v3".to_string(),
    };
    let toml = format!(
        r#"
[database]
backend = "sqlite"
name = "{}"

[tracking]
coins = "bitcoin,ethereum"
{extra}

[api]
base_url = "{base_url}"
timeout_secs = 5

[api.retry]
max_attempts = 1

[telemetry]
metrics_port = 0
"#,
        db_path.display()
    );
    AppConfig::from_toml_str(&toml, None)
        .unwrap()
        .validate()
        .unwrap()
}

async fn run(app: &Application, command: Command) -> Result<Vec<Value>, AppError> {
    let mut out = Vec::new();
    app.execute(command, &mut out).await?;
    Ok(String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect())
}

async fn seed(settings: &Settings, coin: &str, prices: &[f64]) {
    let store = PriceStore::connect(&settings.database).await.unwrap();
    store.ensure_schema().await.unwrap();
    let start = Utc::now() - TimeDelta::days(prices.len() as i64) + TimeDelta::hours(1);
    let batch: Vec<_> = prices
        .iter()
        .enumerate()
        .map(|(i, price)| {
            CoinSnapshot::new(
                coin,
                coin,
                *price,
                price * 1000.0,
                start + TimeDelta::days(i as i64),
            )
            .unwrap()
        })
        .collect();
    store.upsert_snapshots(&batch).await.unwrap();
    store.close().await;
}

#[tokio::test]
async fn test_collect_once_then_latest() {
    let now = Utc::now().to_rfc3339();
    let body = format!(
        r#"[{{"id":"bitcoin","name":"Bitcoin","current_price":62000.0,"market_cap":1.2e12,"total_volume":3.0e10,"price_change_percentage_24h":1.5,"last_updated":"{now}"}},
            {{"id":"ethereum","name":"Ethereum","current_price":3000.0,"market_cap":3.6e11,"total_volume":1.0e10,"price_change_percentage_24h":null,"last_updated":"{now}"}}]"#
    );
    let addr = start_market_api(body).await;
    let dir = TempDir::new().unwrap();
    let app = Application::new(settings(&dir, Some(addr), ""));

    let report = run(&app, Command::Collect { once: true, max_cycles: None })
        .await
        .unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0]["fetched"], 2);
    assert_eq!(report[0]["inserted"], 2);
    assert!(report[0]["error"].is_null());

    // Same last_updated again: nothing new to insert.
    let again = run(&app, Command::Collect { once: true, max_cycles: None })
        .await
        .unwrap();
    assert_eq!(again[0]["inserted"], 0);

    let latest = run(&app, Command::Latest).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0]["coin_id"], "bitcoin");
    assert_eq!(latest[1]["coin_id"], "ethereum");
}

#[tokio::test]
async fn test_collect_once_fails_when_api_unreachable() {
    let dir = TempDir::new().unwrap();
    let app = Application::new(settings(&dir, None, ""));

    let mut out = Vec::new();
    let err = app
        .execute(Command::Collect { once: true, max_cycles: None }, &mut out)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CycleFailed { cycle: 1, .. }));

    // The report is still written before the error is returned.
    let report: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["inserted"], 0);
    assert!(report["error"].is_string());
}

#[tokio::test]
async fn test_trend_and_returns_from_stored_series() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, None, "");
    seed(&settings, "bitcoin", &[100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 106.0, 107.0]).await;
    let app = Application::new(settings);

    let trend = run(
        &app,
        Command::Trend {
            coin: " Bitcoin ".to_string(),
            lookback: 7,
            threshold: 4,
        },
    )
    .await
    .unwrap();
    assert_eq!(trend.len(), 1);
    assert_eq!(trend[0]["coin_id"], "bitcoin");
    assert_eq!(trend[0]["label"], "bullish");

    let returns = run(&app, Command::Returns { coin: "bitcoin".to_string() })
        .await
        .unwrap();
    assert_eq!(returns.len(), 7);
}

#[tokio::test]
async fn test_correlate_needs_overlap() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, None, "");
    seed(&settings, "bitcoin", &[100.0]).await;
    seed(&settings, "ethereum", &[10.0]).await;
    let app = Application::new(settings);

    let err = run(
        &app,
        Command::Correlate {
            coin_a: "bitcoin".to_string(),
            coin_b: "ethereum".to_string(),
            window: 30,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Analysis(_)));
}

#[tokio::test]
async fn test_prune_uses_override_or_retention() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, None, "");
    seed(&settings, "bitcoin", &[1.0, 2.0, 3.0, 4.0, 5.0]).await;
    let app = Application::new(settings);

    // Retention disabled and no override.
    let err = run(&app, Command::Prune { older_than_days: None })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Config(_)));

    let pruned = run(&app, Command::Prune { older_than_days: Some(3) })
        .await
        .unwrap();
    assert_eq!(pruned[0]["pruned"], 2);

    let history = run(
        &app,
        Command::History {
            coin: "bitcoin".to_string(),
            days: 30,
        },
    )
    .await
    .unwrap();
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn test_out_of_range_day_counts_are_errors() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, None, "");
    seed(&settings, "bitcoin", &[1.0, 2.0]).await;
    let app = Application::new(settings);

    let err = run(
        &app,
        Command::History {
            coin: "bitcoin".to_string(),
            days: 100_000_000,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Analysis(_)));

    let err = run(&app, Command::Prune { older_than_days: Some(u32::MAX) })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[tokio::test]
async fn test_prune_with_configured_retention() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, None, "retention_days = 2");
    seed(&settings, "bitcoin", &[1.0, 2.0, 3.0, 4.0]).await;
    let app = Application::new(settings);

    let pruned = run(&app, Command::Prune { older_than_days: None })
        .await
        .unwrap();
    assert_eq!(pruned[0]["pruned"], 2);
}

#[tokio::test]
async fn test_init_db() {
    let dir = TempDir::new().unwrap();
    let app = Application::new(settings(&dir, None, ""));

    let out = run(&app, Command::InitDb).await.unwrap();
    assert_eq!(out[0]["status"], "ok");
    assert_eq!(out[0]["backend"], "sqlite");
    assert_eq!(out[0]["table"], "crypto_prices");
}
