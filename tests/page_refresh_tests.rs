//! View refresh integration tests: realtime events drive page refetches and the newest
//! refresh wins even when an older fetch finishes last.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::ChannelConnector;
use facepay::config::ReconnectPolicy;
use facepay::error::AppError;
use facepay::page::{PageData, RefreshOutcome};
use facepay::realtime::{refresh_on, ConnectionManager, EventFilter};

#[tokio::test(start_paused = true)]
async fn attendance_events_refetch_and_latest_wins() {
    let page: Arc<PageData<Vec<String>>> = Arc::new(PageData::new("attendance"));
    assert_eq!(page.refresh_with(|| async { Ok(vec!["initial".to_string()]) }).await, RefreshOutcome::Applied);

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let action = page.refresh_action(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            // the first refetch is the slow one
            let delay = if n == 1 { 500 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, AppError>(vec![format!("rows@{}", n)])
        }
    });

    let (connector, mut links) = ChannelConnector::new();
    let mut manager = ConnectionManager::with_connector("ws://backend", ReconnectPolicy::default(), Arc::new(connector));
    let handle = manager.connect(refresh_on(EventFilter::Attendance, action).into_callback()).await;
    let link = links.recv().await.unwrap();

    link.push(r#"42["attendance_created",{"id":"a1"}]"#);
    link.push(r#"42["employee_updated",{"id":"e1"}]"#);
    link.push(r#"42["attendance_updated",{"id":"a1"}]"#);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(page.data(), Some(vec!["rows@2".to_string()]));
    assert!(!page.is_loading());
    assert_eq!(page.error(), None);

    handle.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn failed_refetch_keeps_rows_and_shows_banner() {
    let page: Arc<PageData<u32>> = Arc::new(PageData::new("payroll"));
    page.refresh_with(|| async { Ok(10) }).await;

    let action = page.refresh_action(|| async {
        Err::<u32, _>(AppError::transport("http_error", "backend returned 502"))
    });

    let (connector, mut links) = ChannelConnector::new();
    let mut manager = ConnectionManager::with_connector("ws://backend", ReconnectPolicy::default(), Arc::new(connector));
    let handle = manager.connect(refresh_on(EventFilter::Payroll, action).into_callback()).await;
    let link = links.recv().await.unwrap();
    link.push(r#"42["payroll_calculated",{"period":"2024-05"}]"#);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(page.data(), Some(10));
    assert!(page.error().unwrap().contains("502"));

    handle.disconnect().await;
}
