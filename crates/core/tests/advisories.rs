//! Advisory warning integration tests.
//!
//! The advisory counter is process-wide, so everything that moves it lives in
//! this one test binary and runs as a single test:
//! - Closing a loader that was never opened emits exactly one advisory
//! - Building an item manager without loaders emits one advisory
//! - Running an engine without an item manager emits one advisory

use std::sync::Arc;

use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use crawlkit_core::{
    metrics::ADVISORIES,
    testing::{MockDownloader, MockLoader, ScriptedSpider},
    CloseOutcome, Engine, ItemManager, Request, StatefulLoader, Yielded,
};

fn advisories(kind: &str) -> u64 {
    ADVISORIES.with_label_values(&[kind]).get()
}

#[tokio::test]
async fn test_each_advisory_is_emitted_once() {
    // Loader closed from CREATED
    let before = advisories("loader_never_opened");
    let idle: StatefulLoader<Value> = StatefulLoader::new(MockLoader::new("idle"));
    assert_eq!(assert_ok!(idle.close().await), CloseOutcome::NeverOpened);
    assert_eq!(advisories("loader_never_opened"), before + 1);

    assert_err!(idle.close().await);
    let used: StatefulLoader<Value> = StatefulLoader::new(MockLoader::new("used"));
    assert_ok!(used.open().await);
    assert_eq!(assert_ok!(used.close().await), CloseOutcome::Closed);
    assert_eq!(advisories("loader_never_opened"), before + 1);

    // Manager without loaders
    let before = advisories("no_loaders");
    let manager: ItemManager<Value> = ItemManager::new(Vec::new());
    assert_eq!(advisories("no_loaders"), before + 1);

    assert_ok!(manager.process_items(vec![json!({ "n": 1 })]).await);
    assert_ok!(manager.tear_down_loaders().await);
    assert_eq!(advisories("no_loaders"), before + 1);

    // Engine without an item manager
    let before = advisories("no_item_manager");
    let spider = ScriptedSpider::new(vec![Request::get("https://site.test/1")], |_| {
        vec![Ok(Yielded::Item(json!({ "ok": true })))]
    });
    let summary = assert_ok!(
        Engine::new(spider, Arc::new(MockDownloader::new()))
            .run()
            .await
    );
    assert_eq!(summary.items_yielded, 1);
    assert_eq!(summary.items_accepted, 0);
    assert_eq!(advisories("no_item_manager"), before + 1);
}
