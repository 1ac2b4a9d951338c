//! End-to-end client address resolution over real connections.

use serde_json::Value;

mod common;

async fn whoami(server: &common::TestServer, header: Option<(&str, &str)>) -> Value {
    let mut req = common::client().get(server.url("/ip"));
    if let Some((name, value)) = header {
        req = req.header(name, value);
    }
    let res = req.send().await.expect("server unreachable");
    assert_eq!(res.status(), 200);
    res.json().await.unwrap()
}

#[tokio::test]
async fn test_direct_connection_uses_peer() {
    let server = common::start_server(Default::default()).await;

    // Header is ignored entirely when not behind a proxy
    let json = whoami(&server, Some(("x-forwarded-for", "1.2.3.4"))).await;
    assert_eq!(json["ip"], "127.0.0.1");
    assert_eq!(json["source"], "peer");
}

#[tokio::test]
async fn test_forwarded_for_chain() {
    let config = common::proxied_config("X-Forwarded-For", &["9.10.11.0/24"]);
    let server = common::start_server(config).await;

    let json = whoami(&server, Some(("x-forwarded-for", "1.2.3.4, 5.6.7.8, 9.10.11.12"))).await;
    assert_eq!(json["ip"], "5.6.7.8");
    assert_eq!(json["source"], "header");
}

#[tokio::test]
async fn test_rfc7239_forwarded() {
    let config = common::proxied_config("Forwarded", &["10.0.0.0/8"]);
    let server = common::start_server(config).await;

    let json = whoami(
        &server,
        Some(("forwarded", r#"for="[2001:db8::1]";proto=https, for=10.1.1.1:8080"#)),
    )
    .await;
    assert_eq!(json["ip"], "2001:db8::1");
}

#[tokio::test]
async fn test_all_trusted_falls_back_to_peer() {
    let config = common::proxied_config("X-Forwarded-For", &["10.0.0.0/8"]);
    let server = common::start_server(config).await;

    let json = whoami(&server, Some(("x-forwarded-for", "10.0.0.1, 10.0.0.2"))).await;
    assert_eq!(json["ip"], "127.0.0.1");
    assert_eq!(json["source"], "peer");
}

#[tokio::test]
async fn test_missing_header_falls_back_to_peer() {
    let config = common::proxied_config("X-Real-IP", &[]);
    let server = common::start_server(config).await;

    let json = whoami(&server, None).await;
    assert_eq!(json["ip"], "127.0.0.1");
}

#[tokio::test]
async fn test_text_format_and_request_id() {
    let config = common::proxied_config("X-Forwarded-For", &[]);
    let server = common::start_server(config).await;

    let res = common::client()
        .get(server.url("/ip?format=text"))
        .header("x-forwarded-for", "203.0.113.50")
        .send()
        .await
        .unwrap();

    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "203.0.113.50\n");
}

#[tokio::test]
async fn test_rate_limit_keyed_by_resolved_client() {
    let mut config = common::proxied_config("X-Forwarded-For", &["127.0.0.0/8"]);
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst_size = 2;
    let server = common::start_server(config).await;
    let client = common::client();

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let res = client
            .get(server.url("/health"))
            .header("x-forwarded-for", "198.51.100.1")
            .send()
            .await
            .unwrap();
        statuses.push(res.status().as_u16());
    }
    assert_eq!(statuses, vec![200, 200, 429]);

    // Same socket, different client behind the proxy
    let res = client
        .get(server.url("/health"))
        .header("x-forwarded-for", "198.51.100.2")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}
