#![allow(clippy::expect_used, reason = "Fine in tests")]
use crosslink::{
  Crosslinker,
  DocumentStore,
  MemoryStore,
  Page,
  PageId,
  model::{ConceptId, WorldId},
};
use crosslink_config::LinksConfig;

fn page(id: u64, world: u64, name: &str, content: &str) -> Page {
  Page {
    id:               PageId(id),
    gameworld_id:     WorldId(world),
    concept_id:       ConceptId(10 + world),
    name:             name.to_string(),
    content:          Some(content.to_string()),
    allow_crosslinks: true,
    allow_crossworld: false,
    ignore_crosslink: false,
  }
}

fn engine(pages: &[Page]) -> Crosslinker<MemoryStore> {
  let store = MemoryStore::new();
  for p in pages {
    store.save_page(p).expect("seed page");
  }
  Crosslinker::new(store, &LinksConfig::default())
}

fn content(engine: &Crosslinker<MemoryStore>, id: u64) -> String {
  engine
    .store()
    .get_page(PageId(id))
    .expect("get")
    .expect("page exists")
    .content
    .unwrap_or_default()
}

#[test]
fn second_scan_changes_nothing() {
  let engine = engine(&[
    page(1, 1, "Town", "<p>The Castle stands by the River. The Castle!</p>"),
    page(2, 1, "Castle", ""),
    page(3, 1, "River", ""),
  ]);

  let first = engine.crosslink_page(PageId(1)).expect("first scan");
  assert_eq!(first.pages_updated, 1);
  assert_eq!(first.links_added, 2);
  let after_first = content(&engine, 1);

  let second = engine.crosslink_page(PageId(1)).expect("second scan");
  assert_eq!(second.pages_updated, 0);
  assert_eq!(second.links_added, 0);
  assert_eq!(content(&engine, 1), after_first);
}

#[test]
fn text_only_elements_are_never_linked() {
  let original = "<title>Castle</title><form><textarea>Notes on the \
                  Castle</textarea></form><p>The Castle.</p>";
  let engine = engine(&[page(1, 1, "Town", original), page(2, 1, "Castle", "")]);

  let first = engine.crosslink_page(PageId(1)).expect("first scan");
  assert_eq!(first.links_added, 1);
  let after_first = content(&engine, 1);
  assert!(after_first.starts_with(
    "<title>Castle</title><form><textarea>Notes on the Castle</textarea></form>"
  ));
  assert!(after_first.ends_with(">Castle</a>.</p>"));

  let second = engine.crosslink_page(PageId(1)).expect("second scan");
  assert!(second.is_noop(), "unexpected rescan: {second}");
  assert_eq!(content(&engine, 1), after_first);
}

#[test]
fn names_match_whole_words_only() {
  let engine = engine(&[
    page(1, 1, "Sea", "<p>A Swordfish swims here.</p>"),
    page(2, 1, "Sword", ""),
  ]);
  let report = engine.crosslink_page(PageId(1)).expect("scan");
  assert!(report.is_noop());
  assert_eq!(content(&engine, 1), "<p>A Swordfish swims here.</p>");
}

#[test]
fn text_inside_anchors_is_skipped() {
  let original = r#"<p><a href="/elsewhere">The Dragon Keep</a> guards the road.</p>"#;
  let engine = engine(&[
    page(1, 1, "Road", original),
    page(2, 1, "Dragon", ""),
  ]);
  engine.crosslink_page(PageId(1)).expect("scan");
  assert_eq!(content(&engine, 1), original);
}

#[test]
fn only_the_first_occurrence_is_linked() {
  let engine = engine(&[
    page(1, 1, "Town", "<p>Castle.</p><p>Castle, Castle.</p>"),
    page(2, 1, "Castle", ""),
  ]);
  engine.crosslink_page(PageId(1)).expect("scan");
  assert_eq!(
    content(&engine, 1),
    r#"<p><a href="/worlds/1/concept/11/page/2" class="wiki-link" title="Castle">Castle</a>.</p><p>Castle, Castle.</p>"#
  );
}

#[test]
fn other_worlds_are_gated_by_allow_crossworld() {
  let text = "<p>Travellers speak of Atlantis.</p>";
  let engine = engine(&[page(1, 1, "Harbour", text), page(2, 2, "Atlantis", "")]);

  engine.crosslink_page(PageId(1)).expect("scan");
  assert_eq!(content(&engine, 1), text);

  let mut roaming = page(1, 1, "Harbour", text);
  roaming.allow_crossworld = true;
  engine.store().save_page(&roaming).expect("update flags");
  engine.crosslink_page(PageId(1)).expect("scan");
  assert!(content(&engine, 1).contains(r#"href="/worlds/2/concept/12/page/2""#));
}

#[test]
fn ignored_pages_are_never_targets() {
  let mut hidden = page(2, 1, "Castle", "");
  hidden.ignore_crosslink = true;
  let engine = engine(&[page(1, 1, "Town", "<p>Castle</p>"), hidden]);
  assert!(engine.crosslink_page(PageId(1)).expect("scan").is_noop());
}

#[test]
fn duplicate_names_link_the_first_page() {
  let engine = engine(&[
    page(1, 1, "Town", "<p>The Oracle speaks.</p>"),
    page(2, 1, "Oracle", ""),
    page(3, 1, "oracle", ""),
  ]);
  engine.crosslink_page(PageId(1)).expect("scan");
  let linked = content(&engine, 1);
  assert!(linked.contains("/page/2\""));
  assert!(!linked.contains("/page/3\""));
}

#[test]
fn missing_page_is_a_noop() {
  let engine = engine(&[page(1, 1, "Town", "")]);
  assert!(engine.crosslink_page(PageId(99)).expect("scan").is_noop());
  assert!(
    engine
      .crosslink_batch_for_new_page(PageId(99))
      .expect("batch")
      .is_noop()
  );
}

#[test]
fn new_page_is_linked_from_existing_pages() {
  let engine = engine(&[
    page(1, 1, "Town", "<p>Beware the Wyrm.</p>"),
    page(2, 1, "Forest", "<p>The wyrm sleeps.</p>"),
    page(3, 2, "Far Away", "<p>No Wyrm here, other world.</p>"),
    page(4, 1, "Wyrm", "<p>A great beast.</p>"),
  ]);

  let report = engine
    .crosslink_batch_for_new_page(PageId(4))
    .expect("batch");
  assert_eq!(report.pages_updated, 2);
  assert_eq!(report.links_added, 2);
  assert!(content(&engine, 1).contains("/page/4\""));
  assert!(content(&engine, 2).contains(">wyrm</a>"));
  assert_eq!(content(&engine, 3), "<p>No Wyrm here, other world.</p>");
}

#[test]
fn batch_respects_pages_that_refuse_links() {
  let mut locked = page(1, 1, "Town", "<p>Beware the Wyrm.</p>");
  locked.allow_crosslinks = false;
  let engine = engine(&[locked, page(4, 1, "Wyrm", "")]);
  assert!(
    engine
      .crosslink_batch_for_new_page(PageId(4))
      .expect("batch")
      .is_noop()
  );
}

#[test]
fn relink_all_matches_single_page_scans() {
  let pages = [
    page(1, 1, "Town", "<p>The Castle and the River.</p>"),
    page(2, 1, "Castle", "<p>Built near the Town.</p>"),
    page(3, 1, "River", "<p>Flows past the Castle.</p>"),
  ];

  let bulk = engine(&pages);
  let report = bulk.relink_all().expect("relink");
  assert_eq!(report.pages_scanned, 3);
  assert_eq!(report.pages_updated, 3);

  let single = engine(&pages);
  for id in 1..=3 {
    single.crosslink_page(PageId(id)).expect("scan");
  }
  for id in 1..=3 {
    assert_eq!(content(&bulk, id), content(&single, id));
  }

  assert!(bulk.relink_all().expect("relink again").is_noop());
}
