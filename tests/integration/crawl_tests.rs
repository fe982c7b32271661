//! Integration tests for the crawler
//!
//! These tests use wiremock to serve storefront markup and run the full crawl
//! cycle end-to-end, from the config file to the stored records.

use catalog_trawler::config::load_config_with_hash;
use catalog_trawler::crawler::run_crawl;
use catalog_trawler::output::load_latest_summary;
use catalog_trawler::storage::{RunStatus, SqliteStorage, Storage};
use std::path::Path;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(dir: &Path, home: &str, db_path: &Path) -> std::path::PathBuf {
    write_config_with(dir, home, db_path, true, "")
}

/// Writes a config file; `extra` is appended verbatim
fn write_config_with(
    dir: &Path,
    home: &str,
    db_path: &Path,
    development: bool,
    extra: &str,
) -> std::path::PathBuf {
    let config = format!(
        r#"
development = {development}

[crawler]
max-concurrency = 3
max-request-retries = 1
max-requests-per-minute = 60000
request-timeout-secs = 5
checkpoint-interval = 2

[site]
name = "obi"
country = "cz"
home-url = "{home}"

[user-agent]
crawler-name = "TestTrawler"
crawler-version = "1.0.0"
contact-url = "https://example.com/bot"
contact-email = "bot@example.com"

[output]
database-path = "{db}"
{extra}
"#,
        development = development,
        home = home,
        db = db_path.display(),
        extra = extra
    );

    let path = dir.join("trawler.toml");
    std::fs::write(&path, config).unwrap();
    path
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

fn home_page() -> String {
    r#"<html><head><title>OBI</title></head><body>
        <div class="headr__nav-cat-col-inner">
          <div class="headr__nav-cat-row"><a class="headr__nav-cat-link" href="/dilna">Dilna</a></div>
          <div class="headr__nav-cat-row"><a class="headr__nav-cat-link" href="/zahrada">Zahrada</a></div>
          <div class="headr__nav-cat-row"><a class="headr__nav-cat-link" href="/akce" data-webtrekk="promo">Akce</a></div>
        </div>
    </body></html>"#
        .to_string()
}

fn listing(count: Option<u32>, products: &[&str]) -> String {
    let count = count
        .map(|c| format!(r#"<div class="variants" data-productcount="{}"></div>"#, c))
        .unwrap_or_default();
    let items: String = products
        .iter()
        .map(|href| format!(r#"<li class="product"><a data-ui-name="ads.product" href="{}">P</a></li>"#, href))
        .collect();
    format!("<html><body>{}<ul>{}</ul></body></html>", count, items)
}

fn detail(code: &str, name: &str, price: &str) -> String {
    format!(
        r#"<html><body>
            <input name="code" value="{code}">
            <meta itemprop="priceCurrency" content="CZK">
            <div class="overview__description"><h1 class="overview__heading">{name}</h1></div>
            <strong data-ui-name="ads.price.strong">{price}</strong>
            <div class="marg_b5">Skladem 12 ks</div>
        </body></html>"#
    )
}

async fn mount_store(server: &MockServer) {
    serve(server, "/", home_page()).await;

    // Leaf category spread over two pages
    serve(
        server,
        "/dilna",
        listing(Some(3), &["/vrtacka/p/101", "/bruska/p/102"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/dilna/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(None, &["/pila/p/103"])))
        .mount(server)
        .await;

    // Intermediate category without a declared count
    serve(
        server,
        "/zahrada",
        r#"<html><body><a wt_name="assortment_menu.level2" href="/zahrada/sekacky">S</a></body></html>"#
            .to_string(),
    )
    .await;
    serve(server, "/zahrada/sekacky", listing(Some(1), &["/sekacka/p/104"])).await;

    serve(server, "/vrtacka/p/101", detail("101", "Vrtacka", "1 299,-")).await;
    serve(server, "/bruska/p/102", detail("102", "Bruska", "899,50")).await;
    serve(server, "/pila/p/103", detail("103", "Pila", "459,-")).await;
    serve(server, "/sekacka/p/104", detail("104", "Sekacka", "5 990,-")).await;
}

#[tokio::test]
async fn test_full_obi_crawl() {
    let server = MockServer::start().await;
    mount_store(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("trawl.db");
    let config_path = write_config(dir.path(), &format!("{}/", server.uri()), &db);

    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    let report = run_crawl(config, &hash, false).await.unwrap();

    // 2 categories, dilna's second page and 2 products, sekacky, then 1 product each
    assert_eq!(report.stats.urls, 8);
    assert_eq!(report.stats.total_items, 4);
    assert_eq!(report.stats.items, 4);
    assert_eq!(report.stats.failed, 0);

    let storage = SqliteStorage::new(&db).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.site_table, "obi_cz");
    assert_eq!(storage.count_records(run.id).unwrap(), 4);

    let mut records = storage.records_for_run(run.id).unwrap();
    records.sort_by(|a, b| a.item_id.cmp(&b.item_id));
    assert_eq!(records[0].item_name, "Vrtacka");
    assert_eq!(records[0].current_price, 1299.0);
    assert_eq!(records[1].current_price, 899.5);
    assert_eq!(records[3].item_url, format!("{}/sekacka/p/104", server.uri()));
    assert!(records.iter().all(|r| r.currency == "CZK" && r.in_stock));

    let summary = load_latest_summary(&storage).unwrap().unwrap();
    assert_eq!(summary.records, 4);
    assert_eq!(summary.stats, report.stats);
}

#[tokio::test]
async fn test_completed_run_is_not_resumed() {
    let server = MockServer::start().await;
    mount_store(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("trawl.db");
    let config_path = write_config(dir.path(), &format!("{}/", server.uri()), &db);

    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    run_crawl(config.clone(), &hash, false).await.unwrap();
    let second = run_crawl(config, &hash, false).await.unwrap();

    // A fresh run starts its counters from zero
    assert_eq!(second.stats.items, 4);

    let storage = SqliteStorage::new(&db).unwrap();
    let latest = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(storage.count_records(latest.id).unwrap(), 4);
    let first = storage.get_run(latest.id - 1).unwrap();
    assert_eq!(first.status, RunStatus::Completed);
}

fn upload_section(server: &MockServer) -> String {
    format!(
        "\n[upload]\nendpoint = \"{}/import\"\ntoken = \"s3cret\"\n",
        server.uri()
    )
}

#[tokio::test]
async fn test_production_run_uploads_dataset_once() {
    let server = MockServer::start().await;
    mount_store(&server).await;
    Mock::given(method("POST"))
        .and(path("/import/obi_cz"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("trawl.db");
    let config_path = write_config_with(
        dir.path(),
        &format!("{}/", server.uri()),
        &db,
        false,
        &upload_section(&server),
    );

    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    run_crawl(config, &hash, false).await.unwrap();
    server.verify().await;

    let uploads: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/import/obi_cz")
        .collect();
    assert_eq!(uploads.len(), 1);
    let body: Vec<serde_json::Value> = serde_json::from_slice(&uploads[0].body).unwrap();
    assert_eq!(body.len(), 4);
    let mut ids: Vec<&str> = body.iter().map(|r| r["itemId"].as_str().unwrap()).collect();
    ids.sort();
    assert_eq!(ids, vec!["101", "102", "103", "104"]);
    assert!(body.iter().all(|r| r["currency"] == "CZK"));
}

#[tokio::test]
async fn test_failed_upload_keeps_run_completed() {
    let server = MockServer::start().await;
    mount_store(&server).await;
    Mock::given(method("POST"))
        .and(path("/import/obi_cz"))
        .respond_with(ResponseTemplate::new(500).set_body_string("import failed"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("trawl.db");
    let config_path = write_config_with(
        dir.path(),
        &format!("{}/", server.uri()),
        &db,
        false,
        &upload_section(&server),
    );

    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    let report = run_crawl(config, &hash, false).await.unwrap();
    server.verify().await;

    assert_eq!(report.stats.items, 4);
    let storage = SqliteStorage::new(&db).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(storage.count_records(run.id).unwrap(), 4);
    assert_eq!(storage.load_stats(run.id).unwrap(), report.stats);
}

#[tokio::test]
async fn test_development_run_skips_upload() {
    let server = MockServer::start().await;
    mount_store(&server).await;
    Mock::given(method("POST"))
        .and(path("/import/obi_cz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("trawl.db");
    let config_path = write_config_with(
        dir.path(),
        &format!("{}/", server.uri()),
        &db,
        true,
        &upload_section(&server),
    );

    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    run_crawl(config, &hash, false).await.unwrap();
    server.verify().await;
}
