use async_trait::async_trait;
use fieldmark_common::{
    ExtractionResult, FieldKind, NodeId, Request, Response, StoreError,
};
use fieldmark_core::config::FieldmarkConfig;
use fieldmark_core::{
    ClickEvent, ClickOutcome, Dom, HintClassifier, LearningState, MemoryDom,
};
use fieldmark_engine::{KeyValueStore, MemoryKeyValueStore, PageSession};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn init_tracing() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
}

struct Listing {
    dom: MemoryDom,
    title: NodeId,
    company: NodeId,
}

fn listing() -> Listing {
    let mut dom = MemoryDom::new();
    let body = dom.body().unwrap();
    let card = dom.element(body, "article", &[]);
    let title = dom.element(card, "h2", &[("class", "job-card__title")]);
    dom.text_node(title, "Backend Engineer");
    let company = dom.element(card, "div", &[]);
    dom.text_node(company, "Acme Corp");
    Listing {
        dom,
        title,
        company,
    }
}

async fn open(
    dom: MemoryDom,
    kv: MemoryKeyValueStore,
) -> PageSession<MemoryDom, MemoryKeyValueStore> {
    PageSession::open(
        dom,
        kv,
        &FieldmarkConfig::default(),
        Box::new(HintClassifier),
    )
    .await
}

/// Store whose writes always fail.
struct BrokenStore {
    writes: Arc<AtomicUsize>,
}

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _keys: &[String]) -> Result<HashMap<String, String>, StoreError> {
        Err(StoreError::Backend("quota exceeded".into()))
    }

    async fn set(&self, _entries: HashMap<String, String>) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Backend("quota exceeded".into()))
    }
}

#[tokio::test]
async fn test_enable_selection_responds_success() {
    init_tracing();
    let page = listing();
    let mut session = open(page.dom, MemoryKeyValueStore::new()).await;

    let response = session
        .handle_request(Request::EnableSelection {
            mode: Some(FieldKind::CompanyName),
        })
        .await;
    assert_eq!(response, Response::ok());
    assert_eq!(session.learner().state(), LearningState::Listening);
    assert_eq!(session.learner().hint(), Some(FieldKind::CompanyName));

    let response = session.handle_request(Request::DisableSelection).await;
    assert!(response.success);
    assert_eq!(session.learner().state(), LearningState::Idle);
}

#[tokio::test]
async fn test_commit_persists_and_publishes() {
    init_tracing();
    let page = listing();
    let kv = MemoryKeyValueStore::new();
    let mut session = open(page.dom, kv.clone()).await;
    let results = session.subscribe();

    session
        .handle_request(Request::EnableSelection {
            mode: Some(FieldKind::JobTitle),
        })
        .await;
    session.pointer_over(page.title);
    let result = session
        .click(&ClickEvent::new(page.title, "Backend Engineer"))
        .await;
    assert!(matches!(result.outcome, ClickOutcome::Committed(_)));

    let stored = kv.entries().unwrap();
    assert_eq!(stored["jobTitleSelector"], ".job-card__title");
    assert_eq!(stored["jobTitleSelectorText"], "Backend Engineer");
    assert!(stored.contains_key("jobTitleSelectorCapturedAt"));

    assert_eq!(
        results.borrow().job_title.as_deref(),
        Some("Backend Engineer")
    );
}

#[tokio::test]
async fn test_reopened_session_extracts_from_stored_bindings() {
    init_tracing();
    let mut entries = HashMap::new();
    entries.insert(
        "companyNameSelector".to_string(),
        "article > div:nth-child(2)".to_string(),
    );
    entries.insert("companyNameSelectorText".to_string(), "Old Name".to_string());
    let kv = MemoryKeyValueStore::with_entries(entries);

    let page = listing();
    let session = open(page.dom, kv.clone()).await;

    let current = session.subscribe().borrow().clone();
    assert_eq!(current.company_name.as_deref(), Some("Acme Corp"));
    assert_eq!(current.job_title, None);
    assert_eq!(kv.entries().unwrap()["companyNameSelectorText"], "Acme Corp");
}

#[tokio::test]
async fn test_extract_message_returns_result() {
    init_tracing();
    let page = listing();
    let mut session = open(page.dom, MemoryKeyValueStore::new()).await;

    let response = session.handle_request(Request::Extract).await;
    assert_eq!(response, Response::with_result(ExtractionResult::default()));
}

#[tokio::test]
async fn test_mutations_refresh_cache_without_reteaching() {
    init_tracing();
    let page = listing();
    let kv = MemoryKeyValueStore::new();
    let mut session = open(page.dom, kv.clone()).await;

    session
        .handle_request(Request::EnableSelection {
            mode: Some(FieldKind::CompanyName),
        })
        .await;
    session
        .click(&ClickEvent::new(page.company, "Acme Corp"))
        .await;
    let locator = kv.entries().unwrap()["companyNameSelector"].clone();

    session
        .dom_mut()
        .set_text_content(page.company, "Acme Corp Inc");
    session.pump().await;

    let stored = kv.entries().unwrap();
    assert_eq!(stored["companyNameSelectorText"], "Acme Corp Inc");
    assert_eq!(stored["companyNameSelector"], locator);
    assert_eq!(
        session.subscribe().borrow().company_name.as_deref(),
        Some("Acme Corp Inc")
    );
}

/// Binds the company name, then rewrites it three times with each
/// rewrite queued as its own batch. Returns the final result and how many
/// extractions the batches triggered.
async fn rewrite_company_three_times(coalesce: bool) -> (Option<String>, u64) {
    let page = listing();
    let mut config = FieldmarkConfig::default();
    config.watcher.coalesce = coalesce;
    let mut session = PageSession::open(
        page.dom,
        MemoryKeyValueStore::new(),
        &config,
        Box::new(HintClassifier),
    )
    .await;
    session
        .handle_request(Request::EnableSelection {
            mode: Some(FieldKind::CompanyName),
        })
        .await;
    session
        .click(&ClickEvent::new(page.company, "Acme Corp"))
        .await;
    session.pump().await;

    let mut results = session.subscribe();
    results.borrow_and_update();
    let before = session.watcher().extractions();

    let mut batches = Vec::new();
    for name in ["Acme", "Acme Co", "Acme Corp Inc"] {
        session.dom_mut().set_text_content(page.company, name);
        batches.push(session.dom_mut().take_mutation_records());
    }
    session.deliver(batches).await;

    assert!(results.has_changed().unwrap());
    let latest = results.borrow_and_update().company_name.clone();
    (latest, session.watcher().extractions() - before)
}

#[tokio::test]
async fn test_coalesced_batches_extract_once() {
    init_tracing();
    let (latest, extractions) = rewrite_company_three_times(true).await;
    assert_eq!(latest.as_deref(), Some("Acme Corp Inc"));
    assert_eq!(extractions, 1);
}

#[tokio::test]
async fn test_uncoalesced_batches_extract_per_batch() {
    init_tracing();
    let (latest, extractions) = rewrite_company_three_times(false).await;
    assert_eq!(latest.as_deref(), Some("Acme Corp Inc"));
    assert_eq!(extractions, 3);
}

#[tokio::test]
async fn test_store_failures_are_not_fatal() {
    init_tracing();
    let page = listing();
    let writes = Arc::new(AtomicUsize::new(0));
    let kv = BrokenStore {
        writes: writes.clone(),
    };
    let mut session = PageSession::open(
        page.dom,
        kv,
        &FieldmarkConfig::default(),
        Box::new(HintClassifier),
    )
    .await;
    assert!(session.bindings().is_empty());

    session
        .handle_request(Request::EnableSelection {
            mode: Some(FieldKind::JobTitle),
        })
        .await;
    let result = session
        .click(&ClickEvent::new(page.title, "Backend Engineer"))
        .await;

    assert!(matches!(result.outcome, ClickOutcome::Committed(_)));
    assert_eq!(writes.load(Ordering::SeqCst), 1);
    assert!(session.bindings().get(FieldKind::JobTitle).is_some());
    assert!(!session.bindings().has_pending());
}

#[tokio::test]
async fn test_spawned_session_round_trip() {
    init_tracing();
    let page = listing();
    let kv = MemoryKeyValueStore::new();
    let session = open(page.dom, kv.clone()).await;
    let handle = session.spawn();
    let mut results = handle.results();

    let response = handle
        .request(Request::EnableSelection {
            mode: Some(FieldKind::CompanyName),
        })
        .await
        .unwrap();
    assert!(response.success);

    handle.pointer_over(page.company).unwrap();
    let clicked = handle
        .click(ClickEvent::new(page.company, " Acme Corp "))
        .await
        .unwrap();
    assert!(matches!(clicked.outcome, ClickOutcome::Committed(_)));

    let company = page.company;
    handle
        .edit(move |dom: &mut MemoryDom| dom.set_text_content(company, "Acme Corp Inc"))
        .unwrap();

    results
        .wait_for(|r| r.company_name.as_deref() == Some("Acme Corp Inc"))
        .await
        .unwrap();

    let dom = handle.close().await.unwrap();
    assert!(dom.has_class(page.company, "selected-element"));
    assert!(!dom.has_class(page.company, "highlight-element"));
    assert_eq!(kv.entries().unwrap()["companyNameSelectorText"], "Acme Corp Inc");
}

/// Store that counts successful writes.
#[derive(Clone)]
struct CountingStore {
    inner: MemoryKeyValueStore,
    writes: Arc<AtomicUsize>,
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, String>, StoreError> {
        self.inner.get(keys).await
    }

    async fn set(&self, entries: HashMap<String, String>) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(entries).await
    }
}

#[tokio::test]
async fn test_spawned_session_drains_one_turn_before_extracting() {
    init_tracing();
    let mut entries = HashMap::new();
    entries.insert(
        "companyNameSelector".to_string(),
        "article > div".to_string(),
    );
    entries.insert("companyNameSelectorText".to_string(), "Acme Corp".to_string());
    let inner = MemoryKeyValueStore::with_entries(entries);
    let writes = Arc::new(AtomicUsize::new(0));
    let kv = CountingStore {
        inner: inner.clone(),
        writes: writes.clone(),
    };

    let page = listing();
    let company = page.company;
    let session = PageSession::open(
        page.dom,
        kv,
        &FieldmarkConfig::default(),
        Box::new(HintClassifier),
    )
    .await;
    let handle = session.spawn();
    let mut results = handle.results();
    let before = writes.load(Ordering::SeqCst);

    // All three edits are queued before the session task gets to run.
    for name in ["Acme", "Acme Co", "Acme Corp Inc"] {
        handle
            .edit(move |dom: &mut MemoryDom| dom.set_text_content(company, name))
            .unwrap();
    }

    results
        .wait_for(|r| r.company_name.as_deref() == Some("Acme Corp Inc"))
        .await
        .unwrap();
    handle.close().await.unwrap();

    // One extraction saw only the final text, so only it was written.
    assert_eq!(writes.load(Ordering::SeqCst) - before, 1);
    assert_eq!(
        inner.entries().unwrap()["companyNameSelectorText"],
        "Acme Corp Inc"
    );
}
