// ABOUTME: Tests for the session registry - selection walkthrough, namespace flush,
// inventory reconciliation, and delete idempotence, plus property tests over selection sequences

mod common;

use common::endpoint;
use podterm::models::{Inventory, SelectionEvent, SessionKey};
use podterm::session::SessionRegistry;
use podterm::terminal::compute_grid;
use podterm::terminal::resize::{MAX_COLS, MAX_ROWS};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

fn registry() -> (SessionRegistry, Arc<Mutex<Vec<SessionKey>>>) {
    let deleted = Arc::new(Mutex::new(Vec::new()));
    let recorded = deleted.clone();
    let registry = SessionRegistry::new(
        endpoint(),
        "dev",
        Box::new(move |key: &SessionKey| recorded.lock().unwrap().push(key.clone())),
    );
    (registry, deleted)
}

fn visible_count(registry: &SessionRegistry) -> usize {
    registry
        .renderable_entries()
        .into_iter()
        .filter(|d| d.visible)
        .count()
}

fn select(registry: &mut SessionRegistry, event: SelectionEvent) {
    let key = event.into_key();
    registry.select(key.as_ref());
}

#[test]
fn test_selection_walkthrough() {
    let (mut registry, _) = registry();

    // BEHAVIOR: first selection opens a visible entry
    select(
        &mut registry,
        SelectionEvent {
            pod: Some("a".to_string()),
            container: Some("c1".to_string()),
            interactive: Some(true),
            multiple: None,
        },
    );
    assert_eq!(registry.entries().len(), 1);
    assert!(registry.entries()[0].visible);

    // BEHAVIOR: a second container opens alongside and takes the foreground
    select(
        &mut registry,
        SelectionEvent {
            pod: Some("a".to_string()),
            container: Some("c2".to_string()),
            interactive: Some(true),
            multiple: None,
        },
    );
    assert_eq!(registry.entries().len(), 2);
    assert!(!registry.get(&SessionKey::singleton("a", "c1", true)).unwrap().visible);
    assert!(registry.get(&SessionKey::singleton("a", "c2", true)).unwrap().visible);

    // BEHAVIOR: merged logs hide every singleton and keep selector order
    select(
        &mut registry,
        SelectionEvent {
            multiple: Some(vec!["img1".to_string(), "img2".to_string()]),
            ..Default::default()
        },
    );
    assert!(registry.entries().iter().all(|e| !e.visible));
    let merged = registry.merged_entry().unwrap();
    assert!(merged.visible);
    assert!(merged
        .stream_url
        .as_str()
        .ends_with("imageSelector=img1&imageSelector=img2"));

    let renderable: Vec<String> = registry
        .renderable_entries()
        .into_iter()
        .map(|d| d.key.label())
        .collect();
    assert_eq!(
        renderable,
        vec!["multi-logs", "a:c1:interactive", "a:c2:interactive"]
    );

    // BEHAVIOR: a namespace change flushes everything
    assert!(registry.update_namespace("other-ns"));
    assert!(registry.entries().is_empty());
    assert!(registry.merged_entry().is_none());
}

#[test]
fn test_update_namespace_twice_is_noop_second_time() {
    let (mut registry, deleted) = registry();
    registry.select(Some(&SessionKey::singleton("a", "c1", false)));
    assert!(registry.update_namespace("staging"));

    registry.select(Some(&SessionKey::singleton("b", "c1", false)));
    registry.select(Some(&SessionKey::merged(["img"])));
    let before: Vec<_> = registry.renderable_entries().into_iter().cloned().collect();

    assert!(!registry.update_namespace("staging"));
    let after: Vec<_> = registry.renderable_entries().into_iter().cloned().collect();
    assert_eq!(before, after);

    // BEHAVIOR: a flush is not a deletion
    assert!(deleted.lock().unwrap().is_empty());
}

#[test]
fn test_reconcile_prunes_vanished_and_keeps_order() {
    // Arrange
    let (mut registry, _) = registry();
    for (pod, container) in [("a", "c1"), ("b", "c1"), ("a", "c2"), ("c", "c1")] {
        registry.select(Some(&SessionKey::singleton(pod, container, false)));
    }
    registry.select(Some(&SessionKey::merged(["img"])));
    let inventory = Inventory::new()
        .with_pod("a", ["c1"])
        .with_pod("c", ["c1", "c9"]);

    // Act
    let removed = registry.reconcile(&inventory);

    // Assert
    assert_eq!(
        removed,
        vec![
            SessionKey::singleton("b", "c1", false),
            SessionKey::singleton("a", "c2", false),
        ]
    );
    let remaining: Vec<String> = registry.entries().iter().map(|e| e.key.label()).collect();
    assert_eq!(remaining, vec!["a:c1:non-interactive", "c:c1:non-interactive"]);
    assert!(registry.merged_entry().is_some());
}

#[test]
fn test_reconcile_from_pod_list() {
    let (mut registry, _) = registry();
    registry.select(Some(&SessionKey::singleton("api-0", "app", true)));
    registry.select(Some(&SessionKey::singleton("api-0", "sidecar", false)));

    let inventory = Inventory::from_pod_list_json(
        r#"{"kind":"PodList","items":[
            {"metadata":{"name":"api-0"},"spec":{"containers":[{"name":"app"}]}}
        ]}"#,
    )
    .unwrap();
    registry.reconcile(&inventory);

    assert_eq!(registry.entries().len(), 1);
    assert_eq!(registry.entries()[0].key, SessionKey::singleton("api-0", "app", true));
}

#[test]
fn test_delete_is_idempotent() {
    let (mut registry, deleted) = registry();
    let key = SessionKey::singleton("a", "c1", true);
    registry.select(Some(&key));

    assert!(registry.delete(&key).is_some());
    assert!(registry.delete(&key).is_none());
    assert!(registry.delete(&SessionKey::singleton("zz", "c1", true)).is_none());

    assert_eq!(*deleted.lock().unwrap(), vec![key]);
}

fn key_strategy() -> impl Strategy<Value = Option<SessionKey>> {
    prop_oneof![
        Just(None),
        (0..3usize, 0..2usize, any::<bool>()).prop_map(|(pod, container, interactive)| {
            Some(SessionKey::singleton(
                format!("pod-{pod}"),
                format!("c{container}"),
                interactive,
            ))
        }),
        prop::collection::vec(prop_oneof![Just("img1"), Just("img2")], 1..3)
            .prop_map(|selectors| Some(SessionKey::merged(selectors))),
    ]
}

proptest! {
    #[test]
    fn prop_at_most_one_visible(keys in prop::collection::vec(key_strategy(), 0..30)) {
        let (mut registry, _) = registry();
        for key in &keys {
            registry.select(key.as_ref());
            prop_assert!(visible_count(&registry) <= 1);
            if let Some(key) = key {
                prop_assert!(registry.get(key).is_some_and(|d| d.visible));
            }
        }
    }

    #[test]
    fn prop_reconcile_keeps_exactly_present(
        keys in prop::collection::vec((0..4usize, 0..3usize), 0..12),
        present in prop::collection::vec((0..4usize, 0..3usize), 0..12),
    ) {
        let (mut registry, _) = registry();
        for (pod, container) in &keys {
            registry.select(Some(&SessionKey::singleton(format!("p{pod}"), format!("c{container}"), false)));
        }
        let mut inventory = Inventory::new();
        for (pod, container) in &present {
            inventory.insert_pod(format!("p{pod}"), [format!("c{container}")]);
        }

        registry.reconcile(&inventory);

        for entry in registry.entries() {
            let (pod, container) = entry.key.target().unwrap();
            prop_assert!(inventory.contains(pod, container));
        }
        for (pod, container) in &keys {
            let key = SessionKey::singleton(format!("p{pod}"), format!("c{container}"), false);
            let expected = inventory.contains(&format!("p{pod}"), &format!("c{container}"));
            prop_assert_eq!(registry.get(&key).is_some(), expected);
        }
    }

    #[test]
    fn prop_grid_never_below_floor(
        width in -1.0e6f64..1.0e6,
        height in -1.0e6f64..1.0e6,
        cell_width in -10.0f64..40.0,
        cell_height in -10.0f64..40.0,
        scrollbar in 0.0f64..100.0,
    ) {
        let grid = compute_grid(width, height, cell_width, cell_height, scrollbar);
        prop_assert!(grid.cols >= 2);
        prop_assert!(grid.rows >= 1);
        prop_assert!(grid.cols <= MAX_COLS);
        prop_assert!(grid.rows <= MAX_ROWS);
    }
}
