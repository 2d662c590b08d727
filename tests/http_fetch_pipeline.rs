//! Real HTTP fetcher against a local page server, feeding the runner
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use restock_monitor::application::{ProductOutcome, StockCheckRunner};
use restock_monitor::domain::{FailureKind, StockStatus, TrackedProduct};
use restock_monitor::infrastructure::{AvailabilityParser, HttpClientConfig, HttpPageFetcher, SqliteProductStore};
use restock_monitor::test_utils::{RecordingNotifier, TestDatabase, availability_page};

/// Serves `/in-stock`, `/gone` and `/blocked` until the test ends
async fn spawn_shop() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            tokio::spawn(async move {
                let mut buf = vec![0_u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                let (status, body) = match path.as_str() {
                    "/in-stock" => ("200 OK", availability_page("In Stock. <b>Add to Cart</b>")),
                    "/gone" => ("200 OK", availability_page("Currently unavailable.")),
                    _ => ("503 Service Unavailable", "<html>robot check</html>".to_string()),
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn pages_served_over_http_drive_status_updates() {
    let base = spawn_shop().await;
    let db = TestDatabase::new().await.unwrap();
    let store = Arc::new(SqliteProductStore::new(db.pool()));
    store.upsert_user("u1", Some("u1@example.com")).await.unwrap();
    for (id, path, status) in [
        ("p1", "/in-stock", StockStatus::OutOfStock),
        ("p2", "/gone", StockStatus::InStock),
        ("p3", "/blocked", StockStatus::InStock),
    ] {
        let product = TrackedProduct::new(id, format!("{base}{path}"), "u1").with_status(status);
        store.upsert_product(&product).await.unwrap();
    }

    let fetcher = HttpPageFetcher::new(HttpClientConfig {
        timeout_seconds: 5,
        max_requests_per_second: 0,
        ..HttpClientConfig::default()
    })
    .unwrap();
    let notifier = Arc::new(RecordingNotifier::default().with_user("u1", "u1@example.com"));
    let runner = StockCheckRunner::new(
        store.clone(),
        Arc::new(fetcher),
        notifier.clone(),
        AvailabilityParser::new().unwrap(),
    );

    let report = runner.run().await.unwrap();

    assert_eq!(report.product("p1").unwrap().outcome, ProductOutcome::UpdatedAndNotified);
    assert_eq!(report.product("p2").unwrap().outcome, ProductOutcome::Updated);
    assert_eq!(report.product("p3").unwrap().outcome, ProductOutcome::Skipped(FailureKind::Fetch));
    assert_eq!(store.stored_status("p1").await.unwrap().as_deref(), Some("In Stock"));
    assert_eq!(store.stored_status("p2").await.unwrap().as_deref(), Some("Out of Stock"));
    assert_eq!(store.stored_status("p3").await.unwrap().as_deref(), Some("In Stock"));
    assert_eq!(notifier.sent().len(), 1);
}
