//! The literal scenarios of spec.md §8 (S1-S6), driven against the
//! in-memory reference [`opencypher_engine::memory::InMemoryGraph`] model.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use opencypher_engine::graph::{
    CreatedElements, Direction, GraphModel, GraphResult, IndexDescriptor, NewEndpoint, NewNode,
    NewRelationship, Node, NodeFilter, PathTriple, RelationshipFilter,
};
use opencypher_engine::memory::InMemoryGraph;
use opencypher_engine::plan::PhysicalPlan;
use opencypher_engine::value::Value;
use opencypher_engine::Runner;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Nodes {A(id=1), B(id=2)}, rel {R(id=10, type=KNOWS, 1→2)} — the graph
/// shared by S1 and S2.
fn round_trip_graph() -> InMemoryGraph {
    let mut g = InMemoryGraph::new();
    let a = g.add_node(vec!["Person".to_string()], BTreeMap::new());
    let b = g.add_node(vec!["Person".to_string()], BTreeMap::new());
    g.add_relationship(Some("KNOWS".to_string()), a, b, BTreeMap::new());
    g
}

#[test]
fn s1_round_trip() {
    init_logging();
    let runner = Runner::new(round_trip_graph());
    let result = runner
        .run("MATCH (a)-[r]->(b) RETURN a, r, b", HashMap::new())
        .unwrap();
    let rows: Vec<_> = result.records().collect();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert!(matches!(row.get("a"), Some(Value::Node(n)) if n.id.0 == 0));
    assert!(matches!(row.get("b"), Some(Value::Node(n)) if n.id.0 == 1));
    assert!(matches!(row.get("r"), Some(Value::Relationship(r)) if r.rel_type.as_deref() == Some("KNOWS")));
}

#[test]
fn s2_direction_reverses_endpoints() {
    init_logging();
    let graph = round_trip_graph();

    // The row-level contract: a=B, b=A when the pattern is walked backwards.
    let runner = Runner::new(round_trip_graph());
    let result = runner
        .run("MATCH (a)<-[r]-(b) RETURN a, r, b", HashMap::new())
        .unwrap();
    let rows: Vec<_> = result.records().collect();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert!(matches!(row.get("a"), Some(Value::Node(n)) if n.id.0 == 1));
    assert!(matches!(row.get("b"), Some(Value::Node(n)) if n.id.0 == 0));

    // The `reversed` flag itself is a property of the graph-model contract's
    // `PathTriple` (spec.md §3), not of the row values `Expand` projects —
    // observe it directly through `expand` (spec.md §4.4, "introspection").
    let a_id = graph.nodes().next().unwrap().id;
    let triples: Vec<PathTriple> = graph
        .expand_filtered(a_id, Direction::Incoming, &RelationshipFilter::new(), &NodeFilter::new())
        .unwrap()
        .collect();
    assert_eq!(triples.len(), 1);
    assert!(triples[0].reversed);
    assert_eq!(triples[0].start.id, a_id);
}

/// Nodes A(label=Person,name="x"), B(label=Person,name="y").
fn filter_pushdown_graph() -> InMemoryGraph {
    let mut g = InMemoryGraph::new();
    let mut a_props = BTreeMap::new();
    a_props.insert("name".to_string(), Value::String("x".to_string()));
    g.add_node(vec!["Person".to_string()], a_props);
    let mut b_props = BTreeMap::new();
    b_props.insert("name".to_string(), Value::String("y".to_string()));
    g.add_node(vec!["Person".to_string()], b_props);
    g
}

#[test]
fn s3_filter_pushdown_folds_into_scan() {
    init_logging();
    let runner = Runner::new(filter_pushdown_graph());
    let compiled = runner
        .compile("MATCH (n:Person) WHERE n.name = 'x' RETURN n")
        .unwrap();

    let scan = match compiled.physical_plan() {
        PhysicalPlan::Project { input, .. } => input.as_ref(),
        other => other,
    };
    match scan {
        PhysicalPlan::Scan { filter, .. } => {
            assert_eq!(filter.properties.get("name"), Some(&Value::String("x".to_string())));
        }
        other => panic!("expected the predicate folded into the Scan, got {other:?}"),
    }

    let result = compiled.execute().unwrap();
    let rows: Vec<_> = result.records().collect();
    assert_eq!(rows.len(), 1);
    assert!(matches!(
        rows[0].get("n"),
        Some(Value::Node(n)) if n.property("name") == Value::String("x".to_string())
    ));
}

/// Nodes A,B,C; rels R1(A→B), R2(B→C) — S4's chained-pattern graph.
fn chain_graph() -> InMemoryGraph {
    let mut g = InMemoryGraph::new();
    let a = g.add_node(vec![], BTreeMap::new());
    let b = g.add_node(vec![], BTreeMap::new());
    let c = g.add_node(vec![], BTreeMap::new());
    g.add_relationship(Some("KNOWS".to_string()), a, b, BTreeMap::new());
    g.add_relationship(Some("KNOWS".to_string()), b, c, BTreeMap::new());
    g
}

#[test]
fn s4_chained_pattern_never_repeats_a_relationship_identity() {
    init_logging();
    let runner = Runner::new(chain_graph());
    let result = runner
        .run("MATCH (a)-[r]-(b)-[p]-(c) RETURN a, r, b, p, c", HashMap::new())
        .unwrap();
    let rows: Vec<_> = result.records().collect();
    assert!(!rows.is_empty(), "the three-node chain has matching two-hop patterns");
    for row in &rows {
        let r_id = row["r"].relationship_id().unwrap();
        let p_id = row["p"].relationship_id().unwrap();
        assert_ne!(r_id, p_id, "a single pattern must not bind r and p to the same edge");
    }
}

#[test]
fn s5_order_by_is_stable_for_tied_keys() {
    init_logging();
    let mut g = InMemoryGraph::new();
    for (label, rank) in [("a", 1i64), ("b", 1), ("c", 1)] {
        let mut props = BTreeMap::new();
        props.insert("label".to_string(), Value::String(label.to_string()));
        props.insert("rank".to_string(), Value::Integer(rank));
        g.add_node(vec!["Row".to_string()], props);
    }
    let runner = Runner::new(g);
    let result = runner
        .run(
            "MATCH (n:Row) RETURN n.label AS label, n.rank AS rank ORDER BY rank",
            HashMap::new(),
        )
        .unwrap();
    let labels: Vec<String> = result
        .records()
        .map(|row| match &row["label"] {
            Value::String(s) => s.clone(),
            other => panic!("expected string label, got {other:?}"),
        })
        .collect();
    assert_eq!(labels, vec!["a", "b", "c"]);
}

#[test]
fn s6_cache_does_not_revisit_the_graph_model() {
    init_logging();

    struct CountingGraph {
        inner: InMemoryGraph,
        node_scans: AtomicUsize,
    }

    impl GraphModel for CountingGraph {
        fn nodes(&self) -> Box<dyn Iterator<Item = Node> + '_> {
            self.node_scans.fetch_add(1, Ordering::SeqCst);
            self.inner.nodes()
        }

        fn relationships(&self) -> Box<dyn Iterator<Item = PathTriple> + '_> {
            self.inner.relationships()
        }

        fn create_elements(
            &mut self,
            nodes: Vec<NewNode>,
            rels: Vec<NewRelationship>,
            on_created: &mut dyn FnMut(CreatedElements),
        ) -> GraphResult<()> {
            self.inner.create_elements(nodes, rels, on_created)
        }

        fn create_index(&mut self, descriptor: IndexDescriptor) -> GraphResult<()> {
            self.inner.create_index(descriptor)
        }

        fn get_indexes(&self) -> Vec<IndexDescriptor> {
            self.inner.get_indexes()
        }

        fn get_procedure(
            &self,
            namespace: &str,
            name: &str,
        ) -> Option<&dyn opencypher_engine::graph::CallableProcedure> {
            self.inner.get_procedure(namespace, name)
        }
    }

    let mut inner = InMemoryGraph::new();
    inner.add_node(vec!["Person".to_string()], BTreeMap::new());
    let graph = CountingGraph {
        inner,
        node_scans: AtomicUsize::new(0),
    };

    let runner = Runner::new(graph);
    let result = runner.run("MATCH (n) RETURN n", HashMap::new()).unwrap();
    let cached = result.cache();

    let first: Vec<_> = cached.records().collect();
    let second: Vec<_> = cached.records().collect();
    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}

#[test]
fn parser_cache_bound_is_configurable_and_respected() {
    use opencypher_engine::EngineConfig;

    let config = EngineConfig {
        parser_cache_capacity: 1,
        ..EngineConfig::default()
    };
    let runner = Runner::with_config(InMemoryGraph::new(), config);
    runner.compile("MATCH (n) RETURN n").unwrap();
    runner.compile("MATCH (m) RETURN m").unwrap();
    assert_eq!(runner.cache_len(), 1);
}
