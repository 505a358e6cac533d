// tests/monitor_http.rs
use stockmine::monitor::{router, Monitor, HEALTH_BODY};

#[tokio::test]
async fn health_over_tcp_until_stopped() {
    let m = Monitor::start("127.0.0.1:0", router(None)).await.expect("bind");
    let url = format!("http://{}/health", m.local_addr());

    let resp = reqwest::get(&url).await.expect("request");
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), HEALTH_BODY);

    m.stop().await;
    assert!(reqwest::get(&url).await.is_err());
}
