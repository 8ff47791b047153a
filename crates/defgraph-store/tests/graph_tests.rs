//! Graph build and neighborhood integration tests
//!
//! Run against in-memory SQLite; the reopen test uses a temporary directory.

use std::collections::{BTreeSet, HashMap};

use defgraph_core::{
    AppConfig, BuildConfig, DefinitionRecord, DefinitionSource, GraphError, GraphSize,
    NeighborhoodMethod, Result, GRAPH_VERSION,
};
use defgraph_store::{Database, DictionaryGraph, GraphWriter};

async fn build(records: Vec<DefinitionRecord>) -> DictionaryGraph {
    let db = Database::in_memory().await.unwrap();
    let mut graph = DictionaryGraph::with_database("OPTED", db, BuildConfig::default())
        .await
        .unwrap();
    graph.rebuild(&records).await.unwrap();
    graph
}

fn animals() -> Vec<DefinitionRecord> {
    vec![
        DefinitionRecord::new("Dog", "n.", "An animal."),
        DefinitionRecord::new("Animal", "n.", "A dog, for example."),
        DefinitionRecord::new("Cat", "n.", "Another animal."),
    ]
}

/// Edges as (word, word) pairs
async fn labeled_edges(graph: &mut DictionaryGraph) -> BTreeSet<(String, String)> {
    let labels: HashMap<i64, String> = graph
        .vertices()
        .await
        .unwrap()
        .into_iter()
        .map(|v| (v.id, v.value))
        .collect();
    graph
        .edges()
        .await
        .unwrap()
        .into_iter()
        .map(|e| (labels[&e.id1].clone(), labels[&e.id2].clone()))
        .collect()
}

fn pairs(list: &[(&str, &str)]) -> BTreeSet<(String, String)> {
    list.iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

/// `leafaa`, `leafab`, ... distinct letter-only words
fn leaf(i: usize) -> String {
    let letters = |n: usize| (b'a' + (n % 26) as u8) as char;
    format!("leaf{}{}{}", letters(i / 676), letters(i / 26), letters(i))
}

// =============================================================================
// Build
// =============================================================================

#[tokio::test]
async fn test_end_to_end_example() {
    let mut graph = build(animals()).await;

    assert_eq!(
        graph.size().await.unwrap(),
        GraphSize {
            vertices: 3,
            edges: 3
        }
    );
    assert_eq!(
        labeled_edges(&mut graph).await,
        pairs(&[("dog", "animal"), ("animal", "dog"), ("cat", "animal")])
    );

    let ids: HashMap<String, i64> = graph
        .vertices()
        .await
        .unwrap()
        .into_iter()
        .map(|v| (v.value, v.id))
        .collect();
    let indegrees = graph.indegrees().await.unwrap();
    assert_eq!(indegrees.len(), 2);
    assert_eq!(indegrees[&ids["animal"]], 2);
    assert_eq!(indegrees[&ids["dog"]], 1);
    assert!(!indegrees.contains_key(&ids["cat"]));

    let neighborhood = graph
        .neighborhood("animal", NeighborhoodMethod::Full, None)
        .await
        .unwrap();
    assert_eq!(neighborhood.len(), 3);
    assert_eq!(neighborhood.matrix.nnz(), 3);
    assert!(neighborhood.matrix.iter().all(|(_, _, w)| w == 1.0));
    assert_eq!(neighborhood.weight("cat", "animal"), 1.0);
    assert_eq!(neighborhood.weight("animal", "dog"), 1.0);
    assert_eq!(neighborhood.weight("animal", "cat"), 0.0);
}

#[tokio::test]
async fn test_referential_closure() {
    let mut graph = build(vec![
        DefinitionRecord::new("wolf", "n.", "A wild animal living in packs; kin of dogs."),
        DefinitionRecord::new("dog", "n.", "A domestic wolf that barked."),
        DefinitionRecord::new("bark", "v. i.", "To make the noise dogs make."),
        DefinitionRecord::new("make", "v. t.", "To cause."),
        DefinitionRecord::new("animal", "n.", "Living being."),
    ])
    .await;

    let (vertices, edges) = graph.reader().snapshot().await.unwrap();
    let ids: BTreeSet<i64> = vertices.iter().map(|v| v.id).collect();
    assert_eq!(ids, (0..vertices.len() as i64).collect());
    assert!(!edges.is_empty());
    for edge in &edges {
        assert!(ids.contains(&edge.id1) && ids.contains(&edge.id2));
    }
}

#[tokio::test]
async fn test_inflected_references_resolve() {
    let mut graph = build(vec![
        DefinitionRecord::new("wolf", "n.", "Hunts in packs with other wolves."),
        DefinitionRecord::new("city", "n.", "A large town."),
        DefinitionRecord::new("try", "v. t.", "To attempt."),
        DefinitionRecord::new("play", "v. i.", "To act for fun."),
        DefinitionRecord::new("game", "n.", "Tried by cities; playing or played."),
        DefinitionRecord::new("pack", "n.", "A group."),
    ])
    .await;

    assert_eq!(
        labeled_edges(&mut graph).await,
        pairs(&[
            ("wolf", "pack"),
            ("wolf", "wolf"),
            ("game", "try"),
            ("game", "city"),
            ("game", "play"),
        ])
    );
}

#[tokio::test]
async fn test_rebuild_is_isomorphic() {
    let mut graph = build(animals()).await;
    let first = labeled_edges(&mut graph).await;

    graph.rebuild(&animals()).await.unwrap();
    let second = labeled_edges(&mut graph).await;

    assert_eq!(first, second);
    assert_eq!(graph.size().await.unwrap().vertices, 3);
}

#[tokio::test]
async fn test_non_word_headwords_skipped() {
    let mut graph = build(vec![
        DefinitionRecord::new("A-la-mode", "adv.", "In fashion."),
        DefinitionRecord::new("Fashion", "n.", "The mode, a-la-mode."),
        DefinitionRecord::new("Mode", "n.", "Fashion."),
    ])
    .await;

    let words: Vec<String> = graph
        .vertices()
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.value)
        .collect();
    assert_eq!(words, vec!["fashion", "mode"]);
}

#[tokio::test]
async fn test_repeated_headword_merges_definitions() {
    let mut graph = build(vec![
        DefinitionRecord::new("Bear", "n.", "A large animal."),
        DefinitionRecord::new("Bear", "v. t.", "To carry."),
        DefinitionRecord::new("Animal", "n.", "A being."),
        DefinitionRecord::new("Carry", "v. t.", "To bear."),
    ])
    .await;

    assert_eq!(
        labeled_edges(&mut graph).await,
        pairs(&[("bear", "animal"), ("bear", "carry"), ("carry", "bear")])
    );
}

// =============================================================================
// Versioning
// =============================================================================

struct BrokenSource;

impl DefinitionSource for BrokenSource {
    fn name(&self) -> &str {
        "broken"
    }

    fn records(&self) -> Result<Vec<DefinitionRecord>> {
        Err(GraphError::MalformedRecord {
            source_name: "a.html".to_string(),
            reason: "unexpected entry shape".to_string(),
        })
    }
}

#[tokio::test]
async fn test_stale_until_built() {
    let db = Database::in_memory().await.unwrap();
    let mut graph = DictionaryGraph::with_database("OPTED", db, BuildConfig::default())
        .await
        .unwrap();

    assert!(graph.is_stale().await.unwrap());
    assert_eq!(graph.stored_version().await.unwrap(), None);

    assert!(graph.ensure_built(&animals()).await.unwrap());
    assert!(!graph.is_stale().await.unwrap());
    assert_eq!(
        graph.stored_version().await.unwrap().as_deref(),
        Some(GRAPH_VERSION)
    );
    assert!(graph.built_at().await.unwrap().is_some());

    // Up to date: the source is not consulted again
    assert!(!graph.ensure_built(&BrokenSource).await.unwrap());
}

#[tokio::test]
async fn test_malformed_source_aborts_build() {
    let mut graph = build(animals()).await;

    let result = graph.rebuild(&BrokenSource).await;
    assert!(matches!(result, Err(GraphError::MalformedRecord { .. })));

    // Previous graph untouched
    assert_eq!(graph.size().await.unwrap().edges, 3);
}

#[tokio::test]
async fn test_reopen_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.database.data_dir = dir.path().join("graphs");

    let mut graph = DictionaryGraph::open(&config).await.unwrap();
    assert!(graph.ensure_built(&animals()).await.unwrap());
    graph.close().await.unwrap();

    assert!(config.database.database_path().is_file());

    let mut reopened = DictionaryGraph::open(&config).await.unwrap();
    assert!(!reopened.is_stale().await.unwrap());
    assert_eq!(reopened.size().await.unwrap().edges, 3);
}

#[tokio::test]
async fn test_rebuild_on_disk_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.database.data_dir = dir.path().to_path_buf();

    let mut graph = DictionaryGraph::open(&config).await.unwrap();
    graph.rebuild(&animals()).await.unwrap();

    let smaller = vec![
        DefinitionRecord::new("Dog", "n.", "A loyal animal."),
        DefinitionRecord::new("Animal", "n.", "A living thing."),
    ];
    let size = graph.rebuild(&smaller).await.unwrap();
    assert_eq!(size, GraphSize { vertices: 2, edges: 1 });
    assert_eq!(labeled_edges(&mut graph).await, pairs(&[("dog", "animal")]));
    assert!(!graph.is_stale().await.unwrap());
}

#[tokio::test]
async fn test_failed_save_keeps_previous_graph() {
    let mut graph = build(animals()).await;
    let before = labeled_edges(&mut graph).await;

    let writer = GraphWriter::new(graph.reader().database()).await.unwrap();
    let result = writer
        .save(&["dog".to_string(), "dog".to_string()])
        .await;
    assert!(matches!(result, Err(GraphError::DuplicateVertex(value)) if value == "dog"));

    // Reset rolled back with the failed save; version still matches the data
    assert_eq!(labeled_edges(&mut graph).await, before);
    assert_eq!(graph.size().await.unwrap().vertices, 3);
    assert!(!graph.is_stale().await.unwrap());
}

#[tokio::test]
async fn test_unsupported_dictionary() {
    let mut config = AppConfig::default();
    config.database.dictionary = "WordNet".to_string();

    let result = DictionaryGraph::open(&config).await;
    assert!(matches!(result, Err(GraphError::UnsupportedDictionary(name)) if name == "WordNet"));
}

// =============================================================================
// Neighborhoods
// =============================================================================

#[tokio::test]
async fn test_unknown_word() {
    let mut graph = build(animals()).await;

    let result = graph
        .neighborhood("doesnotexist", NeighborhoodMethod::Full, None)
        .await;
    assert!(matches!(result, Err(GraphError::NotFound(word)) if word == "doesnotexist"));
    assert_eq!(graph.size().await.unwrap().edges, 3);
}

#[tokio::test]
async fn test_full_neighborhood_is_one_hop() {
    // fish -> cat is outside the ego-network of dog
    let mut records = animals();
    records.push(DefinitionRecord::new("Fish", "n.", "Eaten by a cat."));
    records.push(DefinitionRecord::new("Eaten", "v. t.", "Consumed."));
    let mut graph = build(records).await;

    let neighborhood = graph
        .neighborhood("dog", NeighborhoodMethod::Full, None)
        .await
        .unwrap();

    let labels: BTreeSet<&str> = neighborhood.labels.iter().map(String::as_str).collect();
    assert_eq!(labels, BTreeSet::from(["animal", "dog"]));
    assert_eq!(neighborhood.matrix.shape(), (2, 2));
    assert_eq!(neighborhood.matrix.nnz(), 2);
}

#[tokio::test]
async fn test_hub_pruned_neighborhood() {
    // Every leaf references both "hub" and "center"; "center" references "hub".
    let mut records = vec![
        DefinitionRecord::new("center", "n.", "Near the hub."),
        DefinitionRecord::new("hub", "n.", "A busy place."),
    ];
    for i in 0..1000 {
        records.push(DefinitionRecord::new(leaf(i), "n.", "Linked to hub and center."));
    }
    let mut graph = build(records).await;

    let full = graph
        .neighborhood("center", NeighborhoodMethod::Full, None)
        .await
        .unwrap();
    assert_eq!(full.len(), 1002);
    assert_eq!(full.matrix.nnz(), 2001);

    let pruned = graph
        .neighborhood("center", NeighborhoodMethod::HubPruned, None)
        .await
        .unwrap();
    assert_eq!(pruned.len(), 1001);
    assert!(pruned.index_of("hub").is_none());
    // center keeps its own indegree of 1000
    assert!(pruned.index_of("center").is_some());
    assert_eq!(pruned.matrix.nnz(), 1000);
    assert!(pruned.matrix.iter().all(|(_, _, w)| w == 1.0));

    let full_labels: BTreeSet<&String> = full.labels.iter().collect();
    assert!(pruned.labels.iter().all(|l| full_labels.contains(l)));

    // The ego word itself survives pruning; center (1000 leaves in) does not
    let around_hub = graph
        .neighborhood("hub", NeighborhoodMethod::HubPruned, None)
        .await
        .unwrap();
    assert_eq!(around_hub.len(), 1001);
    assert!(around_hub.index_of("hub").is_some());
    assert!(around_hub.index_of("center").is_none());
    assert_eq!(around_hub.matrix.nnz(), 1000);
}

#[tokio::test]
async fn test_weighted_neighborhood_uses_global_indegree() {
    let mut graph = build(animals()).await;

    // cat -> animal lies outside the ego-network of dog but counts for animal
    let neighborhood = graph
        .neighborhood("dog", NeighborhoodMethod::Weighted, None)
        .await
        .unwrap();
    assert_eq!(neighborhood.len(), 2);
    assert_eq!(neighborhood.weight("dog", "animal"), 0.5);
    assert_eq!(neighborhood.weight("animal", "dog"), 1.0);

    let double = |count: f64| count * 2.0;
    let scaled = graph
        .neighborhood("dog", NeighborhoodMethod::Weighted, Some(&double))
        .await
        .unwrap();
    assert_eq!(scaled.weight("dog", "animal"), 0.25);
    assert_eq!(scaled.weight("animal", "dog"), 0.5);
}

#[tokio::test]
async fn test_weighted_zero_transform_fails() {
    let mut graph = build(animals()).await;

    let zero = |_: f64| 0.0;
    let result = graph
        .neighborhood("animal", NeighborhoodMethod::Weighted, Some(&zero))
        .await;
    assert!(matches!(result, Err(GraphError::DivisionByZero { .. })));
}

#[tokio::test]
async fn test_weighted_non_finite_transform_fails() {
    let mut graph = build(animals()).await;

    let nan = |_: f64| f64::NAN;
    let result = graph
        .neighborhood("animal", NeighborhoodMethod::Weighted, Some(&nan))
        .await;
    assert!(matches!(result, Err(GraphError::NonFiniteIndegree { .. })));

    let infinite = |count: f64| count / 0.0;
    let result = graph
        .neighborhood("animal", NeighborhoodMethod::Weighted, Some(&infinite))
        .await;
    assert!(matches!(
        result,
        Err(GraphError::NonFiniteIndegree { value, .. }) if value == f64::INFINITY
    ));
}

#[tokio::test]
async fn test_transform_ignored_for_unweighted_methods() {
    let mut graph = build(animals()).await;

    let zero = |_: f64| 0.0;
    let neighborhood = graph
        .neighborhood("animal", NeighborhoodMethod::Full, Some(&zero))
        .await
        .unwrap();
    assert_eq!(neighborhood.matrix.nnz(), 3);
}
