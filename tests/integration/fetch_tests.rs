//! HTTP fetcher tests against a wiremock server

use crate::common::{memory_store, wire, MemorySink};
use catalog_trawler::crawler::{Fetcher, FetcherSettings, HttpFetcher, SessionContext};
use catalog_trawler::output::StatsKey;
use catalog_trawler::sites::ObiAdapter;
use catalog_trawler::{host_key, FetchError, Request, StageLabel};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(FetcherSettings {
        user_agent: "TestTrawler/1.0 (+https://example.com/bot; bot@example.com)".to_string(),
        timeout: Duration::from_secs(5),
        max_requests_per_minute: 60_000,
        session_pool_size: 4,
        proxies: Vec::new(),
    })
    .unwrap()
}

fn session(attempt: u32) -> SessionContext {
    SessionContext {
        host: "127.0.0.1".to_string(),
        attempt,
    }
}

fn at(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

#[tokio::test]
async fn test_fetch_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zahrada"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let body = fetcher()
        .fetch(&at(&server, "/zahrada"), &session(0))
        .await
        .unwrap();
    assert_eq!(body, b"<html>ok</html>");
}

#[tokio::test]
async fn test_status_classification() {
    let server = MockServer::start().await;
    for (route, status) in [("/missing", 404), ("/down", 503), ("/slow-down", 429), ("/denied", 403)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
    }

    let fetcher = fetcher();
    let fetch = |route: &'static str| {
        let url = at(&server, route);
        let fetcher = &fetcher;
        async move { fetcher.fetch(&url, &session(0)).await }
    };

    assert!(matches!(fetch("/missing").await, Err(FetchError::Permanent(_))));
    assert!(matches!(fetch("/down").await, Err(FetchError::Transient(_))));
    assert!(matches!(fetch("/slow-down").await, Err(FetchError::Transient(_))));
    assert!(matches!(fetch("/denied").await, Err(FetchError::Transient(_))));
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "session=abc; Path=/"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/check"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome back"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/check"))
        .respond_with(ResponseTemplate::new(401))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_cookies_stick_to_session() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let fetcher = fetcher();
    fetcher.fetch(&at(&server, "/login"), &session(0)).await.unwrap();
    let body = fetcher.fetch(&at(&server, "/check"), &session(0)).await.unwrap();
    assert_eq!(body, b"welcome back");
}

#[tokio::test]
async fn test_transient_failure_retires_session() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/blocked"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = fetcher();
    fetcher.fetch(&at(&server, "/login"), &session(0)).await.unwrap();
    let blocked = fetcher.fetch(&at(&server, "/blocked"), &session(0)).await;
    assert!(matches!(blocked, Err(FetchError::Transient(_))));

    // The replacement session starts without cookies
    let check = fetcher.fetch(&at(&server, "/check"), &session(1)).await;
    assert!(matches!(check, Err(FetchError::Permanent(_))));
}

#[tokio::test]
async fn test_block_page_retry_uses_fresh_session() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    // The shop only blocks the session that picked up the login cookie
    Mock::given(method("GET"))
        .and(path("/p/1"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Access Denied</title></head><body></body></html>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <input name="code" value="1">
                <meta itemprop="priceCurrency" content="CZK">
                <div class="overview__description"><h1 class="overview__heading">Hrablo</h1></div>
                <strong data-ui-name="ads.price.strong">199,-</strong>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let fetcher = Arc::new(fetcher());
    let login = at(&server, "/login");
    let pinned = SessionContext {
        host: host_key(&login).unwrap(),
        attempt: 0,
    };
    fetcher.fetch(&login, &pinned).await.unwrap();

    let sink = Arc::new(MemorySink::default());
    let (coordinator, stats) = wire(
        ObiAdapter::new(),
        &format!("{}/", server.uri()),
        fetcher,
        sink.clone(),
        memory_store(),
        2,
        1,
    );
    let seed = Request::parse(at(&server, "/p/1").as_str(), StageLabel::Detail).unwrap();
    coordinator.run(vec![seed]).await;

    assert_eq!(stats.get(StatsKey::Items), 1);
    assert_eq!(stats.get(StatsKey::Failed), 0);
    assert_eq!(sink.records.lock().unwrap()[0].item_name, "Hrablo");
}
