//! Operator API against a running gateway.

mod common;

use common::*;
use ddos_gateway::admin;
use tokio::net::TcpListener;

async fn spawn_admin(gateway: &TestGateway) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(admin::serve(
        listener,
        gateway.state.clone(),
        gateway.shutdown.clone(),
    ));
    format!("http://{addr}")
}

#[tokio::test]
async fn manual_block_and_unblock() {
    let (backend_addr, _) = start_mock_backend("ok").await;
    let mut config = test_config(vec![backend(backend_addr)]);
    config.admin.api_key = Some("admin-secret".into());
    let gateway = spawn_gateway(config).await;
    let admin_url = spawn_admin(&gateway).await;
    let client = reqwest::Client::new();

    let denied = client
        .post(format!("{admin_url}/admin/block/127.0.0.1"))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);

    let blocked = client
        .post(format!("{admin_url}/admin/block/127.0.0.1?duration=120"))
        .bearer_auth("admin-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status(), 200);

    let refused = client.get(gateway.url("/")).send().await.unwrap();
    assert_eq!(refused.status(), 403);
    assert_eq!(refused.text().await.unwrap(), "Access Denied - IP Blacklisted");

    let list: serde_json::Value = client
        .get(format!("{admin_url}/admin/blocklist"))
        .bearer_auth("admin-secret")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list[0]["ip"], "127.0.0.1");
    assert_eq!(list[0]["duration_secs"], 120);

    client
        .post(format!("{admin_url}/admin/unblock/127.0.0.1"))
        .bearer_auth("admin-secret")
        .send()
        .await
        .unwrap();

    let admitted = client.get(gateway.url("/")).send().await.unwrap();
    assert_eq!(admitted.status(), 200);
}

#[tokio::test]
async fn reports_traffic_and_backends() {
    let (backend_addr, _) = start_mock_backend("ok").await;
    let gateway = spawn_gateway(test_config(vec![backend(backend_addr)])).await;
    let admin_url = spawn_admin(&gateway).await;
    let client = reqwest::Client::new();

    client.get(gateway.url("/a")).send().await.unwrap();
    client.get(gateway.url("/b")).send().await.unwrap();

    let backends: serde_json::Value = client
        .get(format!("{admin_url}/admin/backends"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(backends["total_targets"], 1);
    assert_eq!(backends["targets"][0]["url"], format!("http://{backend_addr}"));
    assert_eq!(backends["targets"][0]["health"], true);
    assert_eq!(backends["targets"][0]["requests_handled"], 2);

    let stats: serde_json::Value = client
        .get(format!("{admin_url}/admin/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["statistics"]["total_requests"], 2);
    assert_eq!(stats["statistics"]["allowed_requests"], 2);
    assert_eq!(stats["detection"]["total_ips"], 1);
    assert_eq!(stats["detection"]["threshold"], 0.35);
    assert_eq!(
        stats["backend_distribution"][format!("http://{backend_addr}")],
        2
    );
}
