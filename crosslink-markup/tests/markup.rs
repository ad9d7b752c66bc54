#![allow(clippy::expect_used, reason = "Fine in tests")]
use crosslink_markup::{
  LinkSpec,
  MatchOptions,
  NamePattern,
  find_first_unlinked_occurrence,
  parse,
  serialize,
  unwrap_link,
  wrap_with_link,
};

fn link_once(html: &str, name: &str, href: &str) -> String {
  let mut tree = parse(html);
  let pattern = NamePattern::new(name).expect("pattern");
  if let Some(found) =
    find_first_unlinked_occurrence(&tree, &pattern, &MatchOptions::default())
  {
    let link = LinkSpec {
      href:  href.to_string(),
      class: Some("wiki-link".to_string()),
      title: Some(name.to_string()),
    };
    wrap_with_link(&mut tree, &found, &link).expect("wrap");
  }
  serialize(&tree)
}

#[test]
fn linking_is_first_occurrence_only() {
  let html = "<p>Castle, Castle and more Castle.</p>";
  let out = link_once(html, "Castle", "/c");
  assert_eq!(out.matches("<a ").count(), 1);
  assert!(out.starts_with(r#"<p><a href="/c" class="wiki-link" title="Castle">Castle</a>, Castle"#));
}

#[test]
fn second_pass_sees_the_first_link() {
  let html = "<p>The Castle.</p><p>Castle again.</p>";
  let once = link_once(html, "Castle", "/c");
  let twice = link_once(&once, "Castle", "/c");
  // The matcher skips the linked text and finds the next plain occurrence;
  // callers guard against that with the already-linked check.
  assert_eq!(twice.matches("<a ").count(), 2);
  assert!(once.contains("<p>Castle again.</p>"));
}

#[test]
fn link_then_unlink_restores_markup() {
  let html = "<div><p>Visit the <em>old</em> Castle &amp; rest.</p></div>";
  let linked = link_once(html, "Castle", "/c");
  assert_ne!(linked, html);

  let mut tree = parse(&linked);
  for anchor in tree.anchors() {
    unwrap_link(&mut tree, anchor).expect("unwrap");
  }
  assert_eq!(serialize(&tree), html);
}

#[test]
fn malformed_markup_degrades_gracefully() {
  let inputs = [
    "<p unclosed",
    "<<<>>>",
    "</a></a></p>",
    "<a href='/x'>dangling",
    "<!-- never closed",
    "&notanentity; & < >",
  ];
  for input in inputs {
    let tree = parse(input);
    let once = serialize(&tree);
    assert_eq!(serialize(&parse(&once)), once, "stable output for {input}");
  }
}

#[test]
fn text_inside_links_is_never_relinked() {
  let html = r#"<p><a href="/elsewhere">Sword of Dawn</a> is a sword.</p>"#;
  let out = link_once(html, "Sword of Dawn", "/s");
  assert_eq!(out, html);
}
