//! Structural validation of authored graphs.
//!
//! Runs once per graph as a synchronous barrier ahead of every student
//! evaluation. All defects are collected before failing so the editor can
//! present the complete repair list. Success produces the `CompiledModel`
//! snapshot, including the cached topological order that every student
//! walk in the batch replays.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use super::error::{GraphDefect, MalformedGraph};
use super::program::{assemble, CompiledModel, ParentRef};
use crate::model::{GraphStructure, NodeIx, NodeKind, TaskCatalog, TaskId};

pub fn compile(
    graph: &GraphStructure,
    catalog: &TaskCatalog,
) -> Result<CompiledModel, MalformedGraph> {
    let mut defects = Vec::new();
    let node_count = graph.nodes.len();

    // Node id table. A later duplicate shadows the earlier entry, which is
    // harmless: the duplicate defect alone already rejects the graph.
    let mut index_of: HashMap<&str, NodeIx> = HashMap::with_capacity(node_count);
    for (i, node) in graph.nodes.iter().enumerate() {
        if index_of.insert(node.id.as_str(), NodeIx::new(i)).is_some() {
            defects.push(GraphDefect::DuplicateNodeId {
                id: node.id.clone(),
            });
        }
    }

    // Resolve edges into per-node parent lists (input order is the edge
    // list's declared order) and mirror the topology into petgraph for the
    // cycle and reachability algorithms.
    let mut parent_lists: Vec<Vec<ParentRef>> = vec![Vec::new(); node_count];
    let mut out_degree = vec![0usize; node_count];
    let mut pg: DiGraph<u32, ()> = DiGraph::with_capacity(node_count, graph.edges.len());
    let pg_nodes: Vec<NodeIndex> = (0..node_count).map(|i| pg.add_node(i as u32)).collect();

    for edge in &graph.edges {
        let from = index_of.get(edge.from.as_str()).copied();
        let to = index_of.get(edge.to.as_str()).copied();
        if from.is_none() {
            defects.push(GraphDefect::UnknownEdgeEndpoint {
                id: edge.from.clone(),
            });
        }
        if to.is_none() {
            defects.push(GraphDefect::UnknownEdgeEndpoint {
                id: edge.to.clone(),
            });
        }
        let (Some(from), Some(to)) = (from, to) else {
            continue;
        };
        parent_lists[to.index()].push(ParentRef {
            ix: from,
            weight: edge.weight,
        });
        out_degree[from.index()] += 1;
        pg.add_edge(pg_nodes[from.index()], pg_nodes[to.index()], ());
    }

    // Per-node kind checks: input arity, task bindings, node parameters.
    let mut sink: Option<NodeIx> = None;
    let mut sink_count = 0usize;
    let mut task_bindings: HashMap<TaskId, &str> = HashMap::new();

    for (i, node) in graph.nodes.iter().enumerate() {
        let inputs = parent_lists[i].len();
        match &node.kind {
            NodeKind::Source { task } => {
                expect_arity(&mut defects, node, inputs, Arity::Exactly(0));
                if !catalog.contains(*task) {
                    defects.push(GraphDefect::UnknownTask {
                        id: node.id.clone(),
                        task: *task,
                    });
                }
                if let Some(first) = task_bindings.insert(*task, node.id.as_str()) {
                    defects.push(GraphDefect::DuplicateSourceTask {
                        task: *task,
                        first: first.to_string(),
                        second: node.id.clone(),
                    });
                }
            }
            NodeKind::Sink => {
                sink_count += 1;
                sink.get_or_insert(NodeIx::new(i));
                expect_arity(&mut defects, node, inputs, Arity::Exactly(1));
                if out_degree[i] > 0 {
                    defects.push(GraphDefect::SinkWithOutputs {
                        id: node.id.clone(),
                    });
                }
            }
            NodeKind::Require { threshold, .. } => {
                expect_arity(&mut defects, node, inputs, Arity::Exactly(1));
                if !threshold.is_finite() {
                    defects.push(GraphDefect::InvalidThreshold {
                        id: node.id.clone(),
                    });
                }
            }
            NodeKind::Stepper {
                breakpoints,
                outputs,
            } => {
                expect_arity(&mut defects, node, inputs, Arity::Exactly(1));
                if let Some(reason) = stepper_defect(breakpoints, outputs) {
                    defects.push(GraphDefect::InvalidStepper {
                        id: node.id.clone(),
                        reason,
                    });
                }
            }
            NodeKind::Round { .. } => {
                expect_arity(&mut defects, node, inputs, Arity::Exactly(1));
            }
            NodeKind::Addition | NodeKind::Min | NodeKind::Max => {
                expect_arity(&mut defects, node, inputs, Arity::AtLeast(1));
            }
            NodeKind::Average => {
                expect_arity(&mut defects, node, inputs, Arity::AtLeast(1));
                for parent in &parent_lists[i] {
                    let usable = matches!(parent.weight, Some(w) if w.is_finite() && w > 0.0);
                    if !usable {
                        defects.push(GraphDefect::InvalidAverageWeight {
                            id: node.id.clone(),
                            from: graph.nodes[parent.ix.index()].id.clone(),
                        });
                    }
                }
            }
        }

        // Editors can leave weights behind when a node's kind changes.
        if !matches!(node.kind, NodeKind::Average)
            && parent_lists[i].iter().any(|p| p.weight.is_some())
        {
            tracing::debug!(node = %node.id, "ignoring edge weights into a non-average node");
        }
    }

    match sink_count {
        1 => {}
        0 => defects.push(GraphDefect::NoSink),
        count => defects.push(GraphDefect::MultipleSinks { count }),
    }

    // Cycle check doubling as the one-time topological sort.
    let order: Vec<NodeIx> = match toposort(&pg, None) {
        Ok(order) => order
            .into_iter()
            .map(|nx| NodeIx::new(pg[nx] as usize))
            .collect(),
        Err(cycle) => {
            let ix = pg[cycle.node_id()] as usize;
            defects.push(GraphDefect::Cycle {
                id: graph.nodes[ix].id.clone(),
            });
            Vec::new()
        }
    };

    // Every node must reach the sink; walk the reversed graph from it.
    if sink_count == 1 {
        if let Some(sink_ix) = sink {
            let reversed = Reversed(&pg);
            let mut reaches = vec![false; node_count];
            let mut dfs = Dfs::new(reversed, pg_nodes[sink_ix.index()]);
            while let Some(nx) = dfs.next(reversed) {
                reaches[pg[nx] as usize] = true;
            }
            for (i, node) in graph.nodes.iter().enumerate() {
                if !reaches[i] {
                    defects.push(GraphDefect::Orphan {
                        id: node.id.clone(),
                    });
                }
            }
        }
    }

    if !defects.is_empty() {
        return Err(MalformedGraph::new(defects));
    }

    let kinds = graph.nodes.iter().map(|n| n.kind.clone()).collect();
    let ids = graph.nodes.iter().map(|n| n.id.clone()).collect();
    let sink = sink.expect("BUG: empty defect list implies exactly one sink");
    let model = assemble(kinds, ids, &parent_lists, order, sink);

    tracing::debug!(
        nodes = node_count,
        edges = model.parents_flat.len(),
        sources = model.sources().len(),
        "grading model compiled"
    );
    Ok(model)
}

enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

fn expect_arity(
    defects: &mut Vec<GraphDefect>,
    node: &crate::model::Node,
    actual: usize,
    arity: Arity,
) {
    let (ok, expected) = match arity {
        Arity::Exactly(n) => (actual == n, format!("exactly {n}")),
        Arity::AtLeast(n) => (actual >= n, format!("at least {n}")),
    };
    if !ok {
        defects.push(GraphDefect::InputArity {
            id: node.id.clone(),
            kind: node.kind.label(),
            expected,
            actual,
        });
    }
}

fn stepper_defect(breakpoints: &[f64], outputs: &[f64]) -> Option<String> {
    if outputs.len() != breakpoints.len() + 1 {
        return Some(format!(
            "{} breakpoints need {} outputs, found {}",
            breakpoints.len(),
            breakpoints.len() + 1,
            outputs.len()
        ));
    }
    if breakpoints.iter().chain(outputs).any(|v| !v.is_finite()) {
        return Some("breakpoints and outputs must be finite".to_string());
    }
    if breakpoints.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Some("breakpoints must be strictly increasing".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseTask, Edge, FailAction, Node, TaskStatus};

    fn task(id: u32, max_grade: f64) -> CourseTask {
        CourseTask {
            id: TaskId(id),
            name: format!("task-{id}"),
            max_grade,
            expiry_date: None,
            status: TaskStatus::Active,
        }
    }

    fn catalog() -> TaskCatalog {
        TaskCatalog::new(vec![task(1, 10.0), task(2, 10.0), task(3, 10.0)])
    }

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.into(),
            kind,
        }
    }

    fn source(id: &str, task: u32) -> Node {
        node(id, NodeKind::Source { task: TaskId(task) })
    }

    fn edge(from: &str, to: &str) -> Edge {
        Edge {
            from: from.into(),
            to: to.into(),
            weight: None,
        }
    }

    fn weighted(from: &str, to: &str, weight: f64) -> Edge {
        Edge {
            from: from.into(),
            to: to.into(),
            weight: Some(weight),
        }
    }

    fn diamond() -> GraphStructure {
        // a and b feed both min and addition, which meet at the average.
        GraphStructure {
            nodes: vec![
                source("a", 1),
                source("b", 2),
                node("low", NodeKind::Min),
                node("sum", NodeKind::Addition),
                node("avg", NodeKind::Average),
                node("final", NodeKind::Sink),
            ],
            edges: vec![
                edge("a", "low"),
                edge("b", "low"),
                edge("a", "sum"),
                edge("b", "sum"),
                weighted("low", "avg", 1.0),
                weighted("sum", "avg", 3.0),
                edge("avg", "final"),
            ],
        }
    }

    #[test]
    fn diamond_compiles_with_parents_before_children() {
        let model = compile(&diamond(), &catalog()).expect("diamond should be well-formed");

        let position = |id: &str| {
            let ix = (0..model.node_count())
                .map(NodeIx::new)
                .find(|&ix| model.id(ix) == id)
                .unwrap();
            model.order().iter().position(|&o| o == ix).unwrap()
        };

        assert!(position("a") < position("low"));
        assert!(position("b") < position("low"));
        assert!(position("a") < position("sum"));
        assert!(position("low") < position("avg"));
        assert!(position("sum") < position("avg"));
        assert!(position("avg") < position("final"));

        assert_eq!(model.sources().len(), 2);
        assert_eq!(model.id(model.sink()), "final");
        assert_eq!(model.order().len(), model.node_count());
    }

    #[test]
    fn average_weights_follow_edge_order() {
        let model = compile(&diamond(), &catalog()).unwrap();
        let avg = (0..model.node_count())
            .map(NodeIx::new)
            .find(|&ix| model.id(ix) == "avg")
            .unwrap();

        let parents: Vec<&str> = model.parents(avg).iter().map(|&p| model.id(p)).collect();
        assert_eq!(parents, vec!["low", "sum"]);
        assert_eq!(model.parent_weights(avg), &[Some(1.0), Some(3.0)]);
    }

    #[test]
    fn cycle_is_rejected_before_any_student_runs() {
        let graph = GraphStructure {
            nodes: vec![
                source("a", 1),
                node("x", NodeKind::Addition),
                node("y", NodeKind::Addition),
                node("final", NodeKind::Sink),
            ],
            edges: vec![
                edge("a", "x"),
                edge("x", "y"),
                edge("y", "x"),
                edge("y", "final"),
            ],
        };
        let err = compile(&graph, &catalog()).unwrap_err();
        assert!(err
            .defects
            .iter()
            .any(|d| matches!(d, GraphDefect::Cycle { .. })));
    }

    #[test]
    fn sink_count_must_be_exactly_one() {
        let none = GraphStructure {
            nodes: vec![source("a", 1)],
            edges: vec![],
        };
        let err = compile(&none, &catalog()).unwrap_err();
        assert!(err.defects.contains(&GraphDefect::NoSink));

        let two = GraphStructure {
            nodes: vec![
                source("a", 1),
                source("b", 2),
                node("s1", NodeKind::Sink),
                node("s2", NodeKind::Sink),
            ],
            edges: vec![edge("a", "s1"), edge("b", "s2")],
        };
        let err = compile(&two, &catalog()).unwrap_err();
        assert!(err
            .defects
            .contains(&GraphDefect::MultipleSinks { count: 2 }));
    }

    #[test]
    fn unknown_and_duplicate_task_bindings_are_defects() {
        let graph = GraphStructure {
            nodes: vec![
                source("a", 1),
                source("b", 1),
                source("c", 99),
                node("sum", NodeKind::Addition),
                node("final", NodeKind::Sink),
            ],
            edges: vec![
                edge("a", "sum"),
                edge("b", "sum"),
                edge("c", "sum"),
                edge("sum", "final"),
            ],
        };
        let err = compile(&graph, &catalog()).unwrap_err();
        assert!(err.defects.iter().any(|d| matches!(
            d,
            GraphDefect::DuplicateSourceTask { task: TaskId(1), .. }
        )));
        assert!(err.defects.iter().any(|d| matches!(
            d,
            GraphDefect::UnknownTask { task: TaskId(99), .. }
        )));
    }

    #[test]
    fn arity_violations_are_reported_per_node() {
        let graph = GraphStructure {
            nodes: vec![
                source("a", 1),
                source("b", 2),
                // Require accepts exactly one input but gets two.
                node(
                    "gate",
                    NodeKind::Require {
                        threshold: 1.0,
                        on_fail: FailAction::Zero,
                    },
                ),
                node("final", NodeKind::Sink),
            ],
            edges: vec![edge("a", "gate"), edge("b", "gate"), edge("gate", "final")],
        };
        let err = compile(&graph, &catalog()).unwrap_err();
        let arity = err
            .defects
            .iter()
            .find(|d| matches!(d, GraphDefect::InputArity { id, actual: 2, .. } if id == "gate"))
            .expect("missing arity defect for gate");
        // The message names the concrete expectation, not a vague bound.
        assert!(arity.to_string().contains("expected exactly 1"));
    }

    #[test]
    fn average_requires_positive_weights_on_every_edge() {
        let graph = GraphStructure {
            nodes: vec![
                source("a", 1),
                source("b", 2),
                node("avg", NodeKind::Average),
                node("final", NodeKind::Sink),
            ],
            edges: vec![
                weighted("a", "avg", 0.5),
                edge("b", "avg"), // missing weight
                edge("avg", "final"),
            ],
        };
        let err = compile(&graph, &catalog()).unwrap_err();
        assert!(err.defects.iter().any(|d| matches!(
            d,
            GraphDefect::InvalidAverageWeight { from, .. } if from == "b"
        )));
    }

    #[test]
    fn stepper_parameters_are_validated() {
        let graph = GraphStructure {
            nodes: vec![
                source("a", 1),
                node(
                    "steps",
                    NodeKind::Stepper {
                        breakpoints: vec![10.0, 5.0],
                        outputs: vec![0.0, 1.0, 2.0],
                    },
                ),
                node("final", NodeKind::Sink),
            ],
            edges: vec![edge("a", "steps"), edge("steps", "final")],
        };
        let err = compile(&graph, &catalog()).unwrap_err();
        assert!(err.defects.iter().any(|d| matches!(
            d,
            GraphDefect::InvalidStepper { reason, .. } if reason.contains("strictly increasing")
        )));
    }

    #[test]
    fn orphans_and_bad_edges_are_defects() {
        let graph = GraphStructure {
            nodes: vec![
                source("a", 1),
                source("lost", 2),
                node("final", NodeKind::Sink),
            ],
            edges: vec![edge("a", "final"), edge("ghost", "final")],
        };
        let err = compile(&graph, &catalog()).unwrap_err();
        assert!(err.defects.iter().any(
            |d| matches!(d, GraphDefect::UnknownEdgeEndpoint { id } if id == "ghost")
        ));
        assert!(err
            .defects
            .iter()
            .any(|d| matches!(d, GraphDefect::Orphan { id } if id == "lost")));
    }

    #[test]
    fn duplicate_node_ids_are_defects() {
        let graph = GraphStructure {
            nodes: vec![source("a", 1), source("a", 2), node("final", NodeKind::Sink)],
            edges: vec![edge("a", "final")],
        };
        let err = compile(&graph, &catalog()).unwrap_err();
        assert!(err
            .defects
            .iter()
            .any(|d| matches!(d, GraphDefect::DuplicateNodeId { id } if id == "a")));
    }
}
