//! End-to-end crawl tests
//!
//! The mock site has one index page, one directory page and three detail
//! pages: two rated charities and one without a rating.

use charity_crawler::config::Config;
use charity_crawler::crawler::Coordinator;
use charity_crawler::output::{MemorySink, StagedCsvSink};
use charity_crawler::{CrawlError, SkipReason};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, extra: &str) -> Config {
    toml::from_str(&format!(
        r#"
        [crawler]
        start-url = "{}/index.cfm?bay=search.alpha"
        allowed-domains = ["127.0.0.1"]
        max-concurrent-fetches = 2
        minimum-time-between-requests = 100
        max-domain-requests = 100
        https-only = false
        {}

        [user-agent]
        crawler-name = "TestBot"
        crawler-version = "1.0.0"
        contact-url = "https://example.com/contact"
        contact-email = "test@example.com"

        [output]
        dataset-path = "charities.csv"
        "#,
        base_url, extra
    ))
    .expect("test config parses")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

async fn serve(server: &MockServer, at: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .mount(server)
        .await;
}

fn index_page() -> String {
    r#"
    <div class="letters">
      <a href="/directory/A">A</a>
    </div>
    <div class="letters"><a href="/directory/Z">Z</a></div>
    "#
    .to_string()
}

fn directory_page() -> String {
    r#"
    <div class="mobile-padding charities">
      <a href="/ein/1">Helping Hands</a>
      <a href="/ein/2">Open Shelter</a>
      <a href="/ein/1">Helping Hands (again)</a>
    </div>
    <div class="mobile-padding charities">
      <a href="/ein/3">River Trust</a>
      <a href="https://elsewhere.org/ein/4">Elsewhere</a>
    </div>
    "#
    .to_string()
}

fn identity(name: &str, city_line: &str) -> String {
    format!(
        r#"
        <h1 class="charityname">{}</h1>
        <p class="crumbs">Human Services : Food Banks</p>
        <div id="leftnavcontent"><div><p>1 Main St<br>{}</p></div></div>
        "#,
        name, city_line
    )
}

fn attribute_rows(checked: &[usize], count: usize) -> String {
    (0..count)
        .map(|i| {
            let img = if checked.contains(&i) {
                "/images/checked.gif"
            } else {
                "/images/x.gif"
            };
            format!(r#"<tr><td>item {}</td><td></td><td><img src="{}"></td></tr>"#, i, img)
        })
        .collect()
}

/// Income statement with 24 rows; rows without a value have no value cell
fn income_rows() -> String {
    let values = [
        (2, "$1,000"),
        (8, "$1,000"),
        (10, "$1,200"),
        (11, "$300"),
        (15, "$900"),
        (16, "$100"),
        (17, "$50"),
        (23, "$5,000"),
    ];
    (0..24)
        .map(|i| match values.iter().find(|(row, _)| *row == i) {
            Some((_, v)) => format!("<tr><td>line {}</td><td>{}</td></tr>", i, v),
            None => format!("<tr><td>line {}</td></tr>", i),
        })
        .collect()
}

fn rated_detail(name: &str, overall: &str, compensation: &str) -> String {
    format!(
        r#"{}
        <div class="rating-wrapper">
          <div class="summaryBox">
            <div class="shadedtable"><table>
              <tr><th>Category</th><th>Score</th><th>Rating</th></tr>
              <tr><td>Overall</td><td>{}</td><td><strong><svg><title>four stars</title></svg></strong></td></tr>
              <tr><td>Financial</td><td>90.00</td><td><strong><svg><title>three stars</title></svg></strong></td></tr>
              <tr><td>Accountability</td><td>95.00</td><td><strong><svg><title>four stars</title></svg></strong></td></tr>
            </table></div>
            <div class="summaryBox cn-table"><h3>Mission</h3><p>Serving the community.</p></div>
            <div class="shadedtable cn-accordion-rating"><div><table>
              <tr><td>history</td></tr>
            </table></div></div>
            <div class="shadedtable cn-accordion-rating"><div><table>
              <tr><th>Form 990</th></tr>
              {}
              <tr><th>Website</th></tr>
              {}
            </table></div></div>
          </div>
          <div class="summaryBox income-table"><div><div><table>{}</table></div></div></div>
          <div class="summaryBox cn-accordion-rating"><div><table>
            <tr><td>board</td></tr>
          </table></div></div>
          <div class="summaryBox cn-accordion-rating"><div><table>
            <tr><th>Compensation</th></tr>
            <tr><td><span>{}</span> (President)</td></tr>
          </table></div></div>
        </div>"#,
        identity(name, "Springfield, IL 62701"),
        overall,
        attribute_rows(&[0, 2], 12),
        attribute_rows(&[1], 5),
        income_rows(),
        compensation
    )
}

fn unrated_detail(name: &str) -> String {
    identity(name, "Dayton, OH 45402")
}

/// Mounts the index, the directory and the first two detail pages
async fn mount_site(server: &MockServer) {
    serve(server, "/index.cfm", html(index_page())).await;
    serve(server, "/directory/A", html(directory_page())).await;
    serve(server, "/ein/1", html(rated_detail("Helping Hands", "91.54", "$120,000"))).await;
    serve(server, "/ein/2", html(rated_detail("Open Shelter", "80.25", "$95,500"))).await;
}

fn sorted_names(sink: &MemorySink) -> Vec<String> {
    let mut names: Vec<String> = sink
        .records
        .iter()
        .map(|r| r.identity.name.clone())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_full_crawl_emits_every_detail() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    serve(&server, "/ein/3", html(unrated_detail("River Trust"))).await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri(), ""))
        .unwrap()
        .with_config_hash("test-hash");
    let mut sink = MemorySink::new();
    let report = coordinator.run(&mut sink).await.unwrap();

    assert_eq!(
        sorted_names(&sink),
        vec!["Helping Hands", "Open Shelter", "River Trust"]
    );
    assert!(sink.finished);

    let rated: Vec<_> = sink.records.iter().filter(|r| r.is_rated()).collect();
    assert_eq!(rated.len(), 2);
    let unrated = sink
        .records
        .iter()
        .find(|r| r.identity.name == "River Trust")
        .unwrap();
    assert!(unrated.rating.is_none());
    assert_eq!(unrated.location.as_ref().unwrap().state, "OH");

    assert_eq!(report.records_emitted, 3);
    assert_eq!(report.identity_only, 1);
    assert_eq!(report.index.succeeded, 1);
    assert_eq!(report.directories.attempted, 1);
    assert_eq!(report.details.attempted, 3);
    assert_eq!(report.details.succeeded, 3);
    assert_eq!(report.skipped_count(SkipReason::OffDomain), 1);
    assert_eq!(report.config_hash, "test-hash");
    assert!(!report.cancelled);
    assert!(report.finished_at.is_some());
}

#[tokio::test]
async fn test_failing_detail_is_reported() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    serve(&server, "/ein/3", ResponseTemplate::new(500)).await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri(), "")).unwrap();
    let mut sink = MemorySink::new();
    let report = coordinator.run(&mut sink).await.unwrap();

    assert_eq!(sorted_names(&sink), vec!["Helping Hands", "Open Shelter"]);
    assert_eq!(report.records_emitted, 2);
    assert_eq!(report.details.attempted, 3);
    assert_eq!(report.details.skipped, 1);
    assert_eq!(report.details.filtered, 1);
    assert_eq!(
        report.details.attempted,
        report.details.succeeded + report.details.skipped
    );
    assert_eq!(report.skipped_count(SkipReason::HttpError), 1);
    assert_eq!(report.skipped_count(SkipReason::OffDomain), 1);

    let failed = report
        .skipped
        .iter()
        .find(|s| s.reason == SkipReason::HttpError)
        .unwrap();
    assert!(failed.url.ends_with("/ein/3"));
}

#[tokio::test]
async fn test_unparseable_detail_is_schema_mismatch() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    serve(&server, "/ein/3", html("<p>Page moved</p>".to_string())).await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri(), "")).unwrap();
    let mut sink = MemorySink::new();
    let report = coordinator.run(&mut sink).await.unwrap();

    assert_eq!(sink.records.len(), 2);
    assert_eq!(report.skipped_count(SkipReason::SchemaMismatch), 1);
}

#[tokio::test]
async fn test_index_failure_is_fatal() {
    let server = MockServer::start().await;
    serve(&server, "/index.cfm", ResponseTemplate::new(503)).await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri(), "")).unwrap();
    let mut sink = MemorySink::new();
    let result = coordinator.run(&mut sink).await;

    assert!(matches!(result, Err(CrawlError::IndexFetch { .. })));
    assert!(sink.records.is_empty());
}

#[tokio::test]
async fn test_failed_crawl_keeps_previous_dataset() {
    let server = MockServer::start().await;
    serve(&server, "/index.cfm", ResponseTemplate::new(503)).await;

    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("charities.csv");
    std::fs::write(&dataset, "name\nLast Month\n").unwrap();

    let mut coordinator = Coordinator::new(create_test_config(&server.uri(), "")).unwrap();
    let mut sink = StagedCsvSink::create(&dataset).unwrap();
    let staging = sink.staging_path().to_path_buf();
    assert!(coordinator.run(&mut sink).await.is_err());
    sink.discard();

    assert_eq!(
        std::fs::read_to_string(&dataset).unwrap(),
        "name\nLast Month\n"
    );
    assert!(!staging.exists());
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    serve(&server, "/ein/3", html(unrated_detail("River Trust"))).await;
    serve(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /ein/2"),
    )
    .await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri(), "")).unwrap();
    let mut sink = MemorySink::new();
    let report = coordinator.run(&mut sink).await.unwrap();

    assert_eq!(sorted_names(&sink), vec!["Helping Hands", "River Trust"]);
    assert_eq!(report.skipped_count(SkipReason::RobotsDenied), 1);
    assert_eq!(report.details.attempted, 2);
}

#[tokio::test]
async fn test_detail_sampling_limit() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    serve(&server, "/ein/3", html(unrated_detail("River Trust"))).await;

    let config = create_test_config(&server.uri(), "max-detail-pages = 1");
    let mut coordinator = Coordinator::new(config).unwrap();
    let mut sink = MemorySink::new();
    let report = coordinator.run(&mut sink).await.unwrap();

    assert_eq!(sink.records.len(), 1);
    assert_eq!(report.details.attempted, 1);
}

#[tokio::test]
async fn test_consecutive_failures_abort_crawl() {
    let server = MockServer::start().await;
    serve(&server, "/index.cfm", html(index_page())).await;
    serve(&server, "/directory/A", html(directory_page())).await;
    for at in ["/ein/1", "/ein/2", "/ein/3"] {
        serve(&server, at, ResponseTemplate::new(503)).await;
    }

    let config = create_test_config(&server.uri(), "max-consecutive-failures = 2");
    let mut coordinator = Coordinator::new(config).unwrap();
    let mut sink = MemorySink::new();
    let result = coordinator.run(&mut sink).await;

    assert!(matches!(
        result,
        Err(CrawlError::TooManyFailures { count: 2, .. })
    ));
}

#[tokio::test]
async fn test_cancelled_crawl_fetches_nothing() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri(), "")).unwrap();
    coordinator.cancellation_token().cancel();

    let mut sink = MemorySink::new();
    let report = coordinator.run(&mut sink).await.unwrap();

    assert!(report.cancelled);
    assert!(sink.records.is_empty());
    assert!(sink.finished);
    assert_eq!(report.pages_attempted(), 0);
    assert_eq!(report.skipped_count(SkipReason::Cancelled), 1);
}

#[tokio::test]
async fn test_csv_dataset_written() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    serve(&server, "/ein/3", html(unrated_detail("River Trust"))).await;

    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("charities.csv");

    let mut coordinator = Coordinator::new(create_test_config(&server.uri(), "")).unwrap();
    let mut sink = StagedCsvSink::create(&dataset).unwrap();
    coordinator.run(&mut sink).await.unwrap();
    assert_eq!(sink.commit().unwrap(), 3);

    let mut reader = csv::Reader::from_path(&dataset).unwrap();
    let headers = reader.headers().unwrap().clone();
    let mut rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    rows.sort_by(|a, b| a[0].cmp(&b[0]));

    let cell = |row: &csv::StringRecord, name: &str| -> String {
        let idx = headers.iter().position(|h| h == name).unwrap();
        row[idx].to_string()
    };

    let names: Vec<String> = rows.iter().map(|r| cell(r, "name")).collect();
    assert_eq!(names, vec!["Helping Hands", "Open Shelter", "River Trust"]);

    let helping = &rows[0];
    assert_eq!(cell(helping, "score_overall"), "91.54");
    assert_eq!(cell(helping, "rating_overall"), "4");
    assert_eq!(cell(helping, "rating_financial"), "3");
    assert_eq!(cell(helping, "mission"), "Serving the community.");
    assert_eq!(cell(helping, "attributes_990"), "5");
    assert_eq!(cell(helping, "form990_independent_voting_board"), "true");
    assert_eq!(cell(helping, "form990_no_material_diversion"), "false");
    assert_eq!(cell(helping, "num_990_attributes"), "2");
    assert_eq!(cell(helping, "attributes_website"), "2");
    assert_eq!(cell(helping, "num_website_attributes"), "1");
    assert_eq!(cell(helping, "contributions_gifts_grants"), "1000");
    assert_eq!(cell(helping, "contributions_federated_campaigns"), "0");
    assert_eq!(cell(helping, "net_assets"), "5000");
    assert_eq!(cell(helping, "revenue_total"), "1500");
    assert_eq!(cell(helping, "expenses_total"), "1050");
    assert_eq!(cell(helping, "leader_comp"), "120000");

    let shelter = &rows[1];
    assert_eq!(cell(shelter, "score_overall"), "80.25");
    assert_eq!(cell(shelter, "leader_comp"), "95500");

    let unrated = &rows[2];
    assert_eq!(cell(unrated, "location_state"), "OH");
    assert_eq!(cell(unrated, "score_overall"), "");
    assert_eq!(cell(unrated, "rating_overall"), "");
    assert_eq!(cell(unrated, "attributes_990"), "");
    assert_eq!(cell(unrated, "revenue_total"), "");
    assert_eq!(cell(unrated, "leader_comp"), "");
}
