//! Integration tests for bookmeta
//!
//! These tests run the catalogue source end to end against a local mock
//! server standing in for the remote catalogue.

use bookmeta::config::Config;
use bookmeta::models::BatchSummary;
use bookmeta::sources::{CatalogueSource, Source, SourceError, TransportError};
use bookmeta::utils::ValidationError;
use mockito::{Matcher, Server, ServerGuard};

const SYNOPSIS: &str = "蒸汽与机械的浪潮中，谁能触及非凡？历史和黑暗的迷雾里，又是谁在耳语？";

/// Configuration pointing at the mock server, with a short, fast ladder
fn test_config(server: &ServerGuard) -> Config {
    let mut config = Config::default();
    config.source.base_url = server.url();
    config.transport.timeout_ladder_secs = vec![2, 2];
    config.transport.backoff_base_ms = 1;
    config
}

fn source_for(server: &ServerGuard) -> CatalogueSource {
    CatalogueSource::from_config(&test_config(server)).unwrap()
}

fn search_query(keyword: &str) -> Matcher {
    Matcher::UrlEncoded("search_value".to_string(), keyword.to_string())
}

fn listing_row(id: u32, title: &str, author: &str, words: &str) -> String {
    format!(
        r#"<div class="book-item">
            <img data-src="https://img.example.com/{id}.jpg">
            <h3><a href="/book/{id}">{title}</a></h3>
            <p class="author">作者：{author}</p>
            <p><span>类型：</span><span>玄幻</span><span>字数：</span><span>{words}</span></p>
            <p class="intro">{title}的简介</p>
        </div>"#
    )
}

fn listing(rows: &[String]) -> String {
    format!(
        r#"<html><head><meta charset="utf-8"><title>搜索结果</title></head>
        <body><div class="book-list">{}</div></body></html>"#,
        rows.join("\n")
    )
}

fn detail_page(title: &str) -> String {
    format!(
        r#"<html><head><meta charset="utf-8"><title>{title}_书评</title></head><body>
        <div class="book-detail">
            <div class="detail-cover"><img src="https://img.example.com/cover.jpg"></div>
            <span class="font-large">{title}</span>
            <p>作者：<a href="/author/3">爱潜水的乌贼</a></p>
        </div>
        <div class="tab-pane"><div>{SYNOPSIS}</div></div>
        <div class="tab-pane"><table>
            <tr><td>类型：西方奇幻</td><td>来源：起点中文网</td></tr>
            <tr><td>字数：446.5万字</td><td>状态：完结</td></tr>
        </table></div>
        </body></html>"#
    )
}

#[tokio::test]
async fn test_search_listing_returns_records_in_order() {
    let mut server = Server::new_async().await;
    let html = listing(&[
        listing_row(1, "斗破苍穹", "天蚕土豆", "532.5万"),
        listing_row(2, "凡人修仙传", "忘语", "7,440,000"),
    ]);
    let mock = server
        .mock("GET", "/search/")
        .match_query(search_query("修仙"))
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(html)
        .expect(1)
        .create_async()
        .await;

    let records = source_for(&server).search("修仙").await.unwrap();
    mock.assert_async().await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title(), "斗破苍穹");
    assert_eq!(records[0].author(), "天蚕土豆");
    assert_eq!(records[0].word_count(), 5_325_000);
    assert_eq!(records[0].category(), "玄幻");
    assert_eq!(records[0].source_url(), format!("{}/book/1", server.url()));
    assert_eq!(
        records[0].cover(),
        "https://images.weserv.nl/?url=ssl%3Aimg.example.com%2F1.jpg"
    );
    assert_eq!(records[1].title(), "凡人修仙传");
    assert_eq!(records[1].word_count(), 7_440_000);
    assert_eq!(records[1].description(), "凡人修仙传的简介");
}

#[tokio::test]
async fn test_search_all_empty_rows_is_no_results() {
    let mut server = Server::new_async().await;
    let html = listing(&[
        r#"<div class="book-item"><h3>热门推荐</h3></div>"#.to_string(),
        r#"<div class="book-item"><h3>猜你喜欢</h3></div>"#.to_string(),
    ]);
    server
        .mock("GET", "/search/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(html)
        .create_async()
        .await;

    let records = source_for(&server).search("不存在的书").await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_blank_keyword_is_rejected_without_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let result = source_for(&server).search("   ").await;
    mock.assert_async().await;

    assert_eq!(
        result,
        Err(SourceError::Validation(ValidationError::EmptyKeyword))
    );
}

#[tokio::test]
async fn test_search_redirected_to_detail_page() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/search/")
        .match_query(search_query("诡秘之主"))
        .with_status(302)
        .with_header("location", "/book/42")
        .create_async()
        .await;
    server
        .mock("GET", "/book/42")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(detail_page("诡秘之主"))
        .create_async()
        .await;

    let records = source_for(&server).search("诡秘之主").await.unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.title(), "诡秘之主");
    assert_eq!(record.author(), "爱潜水的乌贼");
    assert_eq!(record.category(), "西方奇幻");
    assert_eq!(record.platform(), Some("起点中文网"));
    assert_eq!(record.word_count(), 4_465_000);
    assert_eq!(record.description(), SYNOPSIS);
    assert_eq!(record.source_url(), format!("{}/book/42", server.url()));
}

#[tokio::test]
async fn test_fetch_detail_partial_metadata() {
    let mut server = Server::new_async().await;
    let html = format!(
        r#"<html><head><meta charset="utf-8"></head><body>
        <span class="font-large">某书</span>
        <div class="tab-pane"><div>{SYNOPSIS}</div></div>
        <div class="tab-pane"><table><tr><td>来源：X</td></tr></table></div>
        </body></html>"#
    );
    server
        .mock("GET", "/book/9")
        .with_status(200)
        .with_body(html)
        .create_async()
        .await;

    let meta = source_for(&server).fetch_detail("/book/9").await.unwrap();

    assert_eq!(meta.platform.as_deref(), Some("X"));
    assert_eq!(meta.category, None);
    assert_eq!(meta.description.as_deref(), Some(SYNOPSIS));
}

#[tokio::test]
async fn test_fetch_detail_blank_url_is_rejected() {
    let server = Server::new_async().await;
    let result = source_for(&server).fetch_detail("  ").await;
    assert_eq!(
        result,
        Err(SourceError::Validation(ValidationError::EmptyUrl))
    );
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/book/404")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let result = source_for(&server).fetch_detail("/book/404").await;
    mock.assert_async().await;

    match result {
        Err(SourceError::Transport(TransportError::Status { status, .. })) => {
            assert_eq!(status, 404)
        }
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gbk_body_without_declared_charset() {
    let mut server = Server::new_async().await;
    let html = listing(&[listing_row(5, "雪中悍刀行", "烽火戏诸侯", "456万")])
        .replace(r#"<meta charset="utf-8">"#, "");
    let (body, _, had_errors) = encoding_rs::GBK.encode(&html);
    assert!(!had_errors);

    server
        .mock("GET", "/search/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(body.into_owned())
        .create_async()
        .await;

    let records = source_for(&server).search("雪中").await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title(), "雪中悍刀行");
    assert_eq!(records[0].author(), "烽火戏诸侯");
    assert_eq!(records[0].word_count(), 4_560_000);
}

#[tokio::test]
async fn test_keyword_truncation_is_opt_in() {
    let mut server = Server::new_async().await;
    let empty = listing(&[]);
    let full = listing(&[listing_row(1, "斗罗大陆", "唐家三少", "298万")]);

    server
        .mock("GET", "/search/")
        .match_query(search_query("斗罗大陆2"))
        .with_status(200)
        .with_body(&empty)
        .expect(2)
        .create_async()
        .await;
    let shortened = server
        .mock("GET", "/search/")
        .match_query(search_query("斗罗大陆"))
        .with_status(200)
        .with_body(&full)
        .expect(1)
        .create_async()
        .await;

    let strict = source_for(&server);
    assert!(strict.search("斗罗大陆2").await.unwrap().is_empty());

    let mut config = test_config(&server);
    config.extraction.allow_keyword_truncation = true;
    let lenient = CatalogueSource::from_config(&config).unwrap();
    let records = lenient.search("斗罗大陆2").await.unwrap();

    shortened.assert_async().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title(), "斗罗大陆");
}

#[tokio::test]
async fn test_batch_search_is_ordered_and_isolates_failures() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/search/")
        .match_query(search_query("凡人"))
        .with_status(200)
        .with_body(listing(&[listing_row(2, "凡人修仙传", "忘语", "744万")]))
        .create_async()
        .await;
    server
        .mock("GET", "/search/")
        .match_query(search_query("坏"))
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("GET", "/search/")
        .match_query(search_query("无"))
        .with_status(200)
        .with_body(listing(&[]))
        .create_async()
        .await;

    let keywords: Vec<String> = ["凡人", "坏", " ", "无"].iter().map(|s| s.to_string()).collect();
    let entries = source_for(&server).search_batch(&keywords).await;

    let order: Vec<_> = entries.iter().map(|entry| entry.keyword.as_str()).collect();
    assert_eq!(order, vec!["凡人", "坏", " ", "无"]);
    assert_eq!(entries[0].records()[0].author(), "忘语");
    assert!(matches!(
        entries[1].outcome,
        Err(SourceError::Transport(TransportError::Status { status: 500, .. }))
    ));
    assert!(matches!(entries[2].outcome, Err(SourceError::Validation(_))));
    assert_eq!(
        BatchSummary::from_entries(&entries),
        BatchSummary {
            keywords: 4,
            matched: 1,
            empty: 1,
            failed: 2
        }
    );
}
