use fieldmark_core::config::WatcherConfig;
use fieldmark_core::dom::node_at_path;
use fieldmark_core::{
    extract_visible_text, BoxSize, ClickEvent, ClickOutcome, Dom, FieldKind, HintClassifier,
    LearningController, LocatorStore, MemoryDom, MutationWatcher, PageSnapshot,
};

fn listing() -> MemoryDom {
    let snapshot: PageSnapshot = serde_yaml::from_str(
        r#"
root:
  tag: html
  children:
    - tag: head
    - tag: body
      children:
        - tag: header
          children:
            - tag: h1
              attributes: { class: "posting-title" }
              children: ["  Staff\n\tEngineer "]
            - tag: div
              children:
                - tag: span
                  children: ["Acme Corp"]
"#,
    )
    .unwrap();
    MemoryDom::from_snapshot(&snapshot)
}

#[test]
fn test_extraction_is_idempotent() {
    let dom = listing();
    let header = node_at_path(&dom, "1/0");
    let first = extract_visible_text(&dom, header);
    assert_eq!(first, "Staff Engineer Acme Corp");
    assert_eq!(extract_visible_text(&dom, header), first);
}

#[test]
fn test_acme_corp_rerender_refreshes_cache() {
    let mut dom = listing();
    let mut store = LocatorStore::new();
    let mut learner = LearningController::new(&Default::default());
    let mut watcher = MutationWatcher::new(&WatcherConfig::default());

    let company = node_at_path(&dom, "1/0/1/0").unwrap();
    learner.enable(&mut dom, &store, Some(FieldKind::CompanyName));
    let event = ClickEvent::new(company, "Acme Corp");
    let outcome = learner
        .click(&mut dom, &mut store, &event, &mut HintClassifier)
        .outcome;
    let ClickOutcome::Committed(binding) = outcome else {
        panic!("expected commit, got {:?}", outcome);
    };
    assert_eq!(
        binding.locator.as_str(),
        "body:nth-child(2) > header:nth-child(1) > div:nth-child(2) > span:nth-child(1)"
    );
    dom.take_mutation_records();

    let initial = watcher.start(&dom, &mut store);
    assert_eq!(initial.company_name.as_deref(), Some("Acme Corp"));
    assert_eq!(initial.job_title, None);

    dom.set_text_content(company, "Acme Corp Inc");
    let records = dom.take_mutation_records();
    let result = watcher.on_batch(&dom, &mut store, &records).unwrap();

    assert_eq!(result.company_name.as_deref(), Some("Acme Corp Inc"));
    let binding = store.get(FieldKind::CompanyName).unwrap();
    assert_eq!(binding.last_known_text, "Acme Corp Inc");
    assert_eq!(
        binding.locator.as_str(),
        "body:nth-child(2) > header:nth-child(1) > div:nth-child(2) > span:nth-child(1)"
    );
}

#[test]
fn test_replaced_element_is_found_again() {
    let mut dom = listing();
    let mut store = LocatorStore::new();
    let mut learner = LearningController::new(&Default::default());
    let mut watcher = MutationWatcher::new(&WatcherConfig::default());

    let title = node_at_path(&dom, "1/0/0").unwrap();
    learner.enable(&mut dom, &store, Some(FieldKind::JobTitle));
    learner.click(
        &mut dom,
        &mut store,
        &ClickEvent::new(title, "Staff Engineer"),
        &mut HintClassifier,
    );
    watcher.start(&dom, &mut store);
    dom.take_mutation_records();

    // Framework re-render: the old node is dropped and a new one inserted.
    let header = node_at_path(&dom, "1/0").unwrap();
    dom.remove(title);
    let replacement = dom.create_element("h1");
    dom.set_attribute(replacement, "class", "posting-title");
    let text = dom.create_text("Principal Engineer");
    dom.append_child(replacement, text);
    let first = dom.element_children(header)[0];
    dom.insert_before(header, replacement, first);

    let records = dom.take_mutation_records();
    let result = watcher.on_batch(&dom, &mut store, &records).unwrap();
    assert_eq!(result.job_title.as_deref(), Some("Principal Engineer"));
}

#[test]
fn test_hidden_match_yields_absent_field() {
    let mut dom = listing();
    let mut store = LocatorStore::new();
    let mut learner = LearningController::new(&Default::default());
    let mut watcher = MutationWatcher::new(&WatcherConfig::default());

    let title = node_at_path(&dom, "1/0/0").unwrap();
    learner.enable(&mut dom, &store, Some(FieldKind::JobTitle));
    learner.click(
        &mut dom,
        &mut store,
        &ClickEvent::new(title, "Staff Engineer"),
        &mut HintClassifier,
    );

    dom.set_box_size(title, BoxSize::ZERO);
    let result = watcher.start(&dom, &mut store);
    assert_eq!(result.job_title, None);
    assert_eq!(
        store.get(FieldKind::JobTitle).unwrap().last_known_text,
        "Staff Engineer"
    );
}
