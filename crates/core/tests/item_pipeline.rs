//! Item pipeline integration tests.
//!
//! These tests drive the item manager into the real file and database loaders:
//! - Vetoed items never reach any sink
//! - Output formats of the JSON, CSV and SQLite loaders
//! - Loader lifecycle across batches and teardown
//! - Output directories created on open

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio_test::assert_ok;

use crawlkit_core::{
    create_loaders,
    loader::LoaderState,
    testing::{MockDownloader, MockResponse, ScriptedSpider},
    Engine, FnMiddleware, Item, ItemManager, MiddlewareError, OutputConfig, Request, Yielded,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Quote {
    author: String,
    text: String,
    likes: u32,
}

impl Item for Quote {
    fn table_name() -> Option<&'static str> {
        Some("quotes")
    }
}

fn quote(author: &str, likes: u32) -> Quote {
    Quote {
        author: author.to_string(),
        text: format!("a quote by {}", author),
        likes,
    }
}

fn unpopular_filter() -> FnMiddleware<Quote> {
    FnMiddleware::new("min_likes", |quote: &mut Quote| {
        if quote.likes < 10 {
            Err(MiddlewareError::ignore("not enough likes"))
        } else {
            Ok(())
        }
    })
}

fn output(dir: &TempDir) -> OutputConfig {
    OutputConfig {
        json: Some(dir.path().join("quotes.json")),
        csv: Some(dir.path().join("quotes.csv")),
        sqlite: Some(dir.path().join("quotes.db")),
        ..Default::default()
    }
}

fn sqlite_authors(dir: &TempDir) -> Vec<String> {
    let conn = Connection::open(dir.path().join("quotes.db")).unwrap();
    let mut stmt = conn
        .prepare("SELECT payload FROM quotes ORDER BY id")
        .unwrap();
    let mut authors: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .map(|payload| {
            let quote: Quote = serde_json::from_str(&payload.unwrap()).unwrap();
            quote.author
        })
        .collect();
    authors.sort();
    authors
}

#[tokio::test]
async fn test_vetoed_items_reach_no_sink() {
    let dir = TempDir::new().unwrap();
    let ignored = Arc::new(Mutex::new(Vec::new()));
    let ignored_log = Arc::clone(&ignored);

    let manager = ItemManager::new(create_loaders::<Quote>(&output(&dir)).unwrap())
        .with_middleware(unpopular_filter())
        .on_item_ignored(move |quote: &Quote, middleware| {
            ignored_log
                .lock()
                .unwrap()
                .push(format!("{}:{}", middleware, quote.author));
        });

    let batch = vec![
        quote("ada", 50),
        quote("bob", 3),
        quote("cyd", 12),
        quote("dee", 0),
    ];
    let report = assert_ok!(manager.process_items(batch).await);
    assert_eq!(report.accepted, 2);
    assert_eq!(report.ignored, 2);
    assert_eq!(report.dumped, 6);

    assert_ok!(manager.tear_down_loaders().await);

    let mut ignored = ignored.lock().unwrap().clone();
    ignored.sort();
    assert_eq!(ignored, vec!["min_likes:bob", "min_likes:dee"]);

    let json = std::fs::read_to_string(dir.path().join("quotes.json")).unwrap();
    let mut from_json: Vec<Quote> = serde_json::from_str(&json).unwrap();
    from_json.sort_by(|a, b| a.author.cmp(&b.author));
    assert_eq!(from_json, vec![quote("ada", 50), quote("cyd", 12)]);

    let csv = std::fs::read_to_string(dir.path().join("quotes.csv")).unwrap();
    let mut lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.remove(0), "author,text,likes");
    lines.sort();
    assert_eq!(lines, vec!["ada,a quote by ada,50", "cyd,a quote by cyd,12"]);

    assert_eq!(sqlite_authors(&dir), vec!["ada", "cyd"]);
}

#[tokio::test]
async fn test_batches_append_to_the_same_outputs() {
    let dir = TempDir::new().unwrap();
    let manager: ItemManager<Quote> =
        ItemManager::new(create_loaders::<Quote>(&output(&dir)).unwrap());

    assert_ok!(manager.process_items(vec![quote("ada", 1)]).await);
    assert_ok!(manager.process_items(vec![quote("bob", 2), quote("cyd", 3)]).await);
    for loader in manager.loaders() {
        assert_eq!(loader.state().await, LoaderState::Dumping);
    }
    assert_ok!(manager.tear_down_loaders().await);

    let json = std::fs::read_to_string(dir.path().join("quotes.json")).unwrap();
    let from_json: Vec<Quote> = serde_json::from_str(&json).unwrap();
    assert_eq!(from_json.len(), 3);

    let csv = std::fs::read_to_string(dir.path().join("quotes.csv")).unwrap();
    assert_eq!(csv.lines().count(), 4, "one header and three rows");

    assert_eq!(sqlite_authors(&dir), vec!["ada", "bob", "cyd"]);
}

#[tokio::test]
async fn test_teardown_of_untouched_loaders_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let manager: ItemManager<Quote> =
        ItemManager::new(create_loaders::<Quote>(&output(&dir)).unwrap());

    assert_ok!(manager.tear_down_loaders().await);

    for loader in manager.loaders() {
        assert_eq!(loader.state().await, LoaderState::Closed);
    }
    assert!(!dir.path().join("quotes.json").exists());
    assert!(!dir.path().join("quotes.csv").exists());
    assert!(!dir.path().join("quotes.db").exists());
}

#[tokio::test]
async fn test_outputs_in_missing_directory() {
    let dir = TempDir::new().unwrap();
    let config = OutputConfig {
        json: Some(dir.path().join("out/quotes.json")),
        sqlite: Some(dir.path().join("out/quotes.db")),
        ..Default::default()
    };
    let manager: ItemManager<Quote> = ItemManager::new(create_loaders::<Quote>(&config).unwrap());

    let report = assert_ok!(manager.process_items(vec![quote("ada", 1)]).await);
    assert_eq!(report.dumped, 2);
    assert_ok!(manager.tear_down_loaders().await);

    let json = std::fs::read_to_string(dir.path().join("out/quotes.json")).unwrap();
    let from_json: Vec<Quote> = serde_json::from_str(&json).unwrap();
    assert_eq!(from_json, vec![quote("ada", 1)]);

    let conn = Connection::open(dir.path().join("out/quotes.db")).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_crawl_into_json_file() {
    let dir = TempDir::new().unwrap();
    let downloader = MockDownloader::new();
    for (n, likes) in [(1, 40), (2, 5), (3, 90)] {
        downloader
            .set_response(
                format!("https://quotes.test/{}", n),
                MockResponse::new(200, format!("q{}:{}", n, likes)),
            )
            .await;
    }

    let spider = ScriptedSpider::new(vec![Request::get("https://quotes.test/1")], |response| {
        let body = response.text().into_owned();
        let (name, likes) = body.split_once(':').unwrap();
        let mut out = vec![Ok(Yielded::Item(quote(name, likes.parse().unwrap())))];
        if response.url.ends_with("/1") {
            out.push(Ok(Yielded::Request(Request::get("https://quotes.test/2"))));
            out.push(Ok(Yielded::Request(Request::get("https://quotes.test/3"))));
        }
        out
    });

    let config = OutputConfig {
        json: Some(dir.path().join("out/quotes.json")),
        pretty_json: true,
        ..Default::default()
    };
    let manager = ItemManager::new(create_loaders::<Quote>(&config).unwrap())
        .with_middleware(unpopular_filter());

    let summary = assert_ok!(
        Engine::new(spider, Arc::new(downloader.clone()))
            .with_item_manager(manager)
            .run()
            .await
    );
    assert_eq!(summary.generations, 2);
    assert_eq!(summary.items_accepted, 2);
    assert_eq!(summary.items_ignored, 1);

    let json = std::fs::read_to_string(dir.path().join("out/quotes.json")).unwrap();
    assert!(json.starts_with("[\n"));
    assert!(json.ends_with("\n]"));
    let mut authors: Vec<String> = serde_json::from_str::<Vec<Quote>>(&json)
        .unwrap()
        .into_iter()
        .map(|q| q.author)
        .collect();
    authors.sort();
    assert_eq!(authors, vec!["q1", "q3"]);
}
