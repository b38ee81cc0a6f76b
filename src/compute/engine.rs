//! The per-student graph walk.
//!
//! Replays the compiled model's cached topological order against one
//! student's seeded source values. A node leaves `Pending` only after all
//! of its parents have; the sink's slot is the student's final-grade
//! candidate. Faults degrade the one student and go no further.

use smallvec::SmallVec;

use crate::compile::CompiledModel;
use crate::compute::kernel;
use crate::compute::ledger::{EvalFault, Ledger, Value};
use crate::model::NodeKind;

/// The terminal state of one student's walk.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkOutcome {
    /// The sink node's value: the final-grade candidate or `Unresolved`.
    pub final_grade: Value,
    /// Set when an internal inconsistency cut the walk short. The outcome
    /// is then `Unresolved` regardless of what was computed so far.
    pub fault: Option<EvalFault>,
}

/// Walks the model for one student.
///
/// `source_values` is parallel to `model.sources()`: the effective grade
/// for each source node, `None` where selection found no usable record.
/// The ledger is filled as a side effect so a caller can render an audit
/// trace from it; on a fault it holds the slots resolved up to that point.
pub fn walk(model: &CompiledModel, source_values: &[Option<f64>], ledger: &mut Ledger) -> WalkOutcome {
    for (binding, value) in model.sources().iter().zip(source_values) {
        let seeded = match value {
            Some(v) => Value::Resolved(*v),
            None => Value::Unresolved,
        };
        ledger.insert(binding.node.index(), seeded);
    }

    for &ix in model.order() {
        if matches!(model.kind(ix), NodeKind::Source { .. }) {
            continue; // seeded above
        }
        match evaluate_node(model, ix, ledger) {
            Ok(value) => ledger.insert(ix.index(), value),
            Err(fault) => {
                tracing::warn!(node = model.id(ix), %fault, "student walk degraded");
                return WalkOutcome {
                    final_grade: Value::Unresolved,
                    fault: Some(fault),
                };
            }
        }
    }

    let final_grade = match ledger.get(model.sink().index()) {
        Some(value) => value,
        // Unreachable after a defect-free compile; degrade, don't panic.
        None => {
            let fault = EvalFault::PendingParent {
                node: model.id(model.sink()).to_string(),
                parent: model.id(model.sink()).to_string(),
            };
            tracing::warn!(%fault, "sink left pending after full walk");
            return WalkOutcome {
                final_grade: Value::Unresolved,
                fault: Some(fault),
            };
        }
    };

    WalkOutcome {
        final_grade,
        fault: None,
    }
}

fn evaluate_node(
    model: &CompiledModel,
    ix: crate::model::NodeIx,
    ledger: &Ledger,
) -> Result<Value, EvalFault> {
    let parents = model.parents(ix);
    let mut inputs: SmallVec<[Value; 8]> = SmallVec::with_capacity(parents.len());
    for &parent in parents {
        match ledger.get(parent.index()) {
            Some(value) => inputs.push(value),
            None => {
                return Err(EvalFault::PendingParent {
                    node: model.id(ix).to_string(),
                    parent: model.id(parent).to_string(),
                });
            }
        }
    }
    kernel::evaluate(model.id(ix), model.kind(ix), &inputs, model.parent_weights(ix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::model::{
        CourseTask, Edge, GraphStructure, Node, NodeKind, TaskCatalog, TaskId, TaskStatus,
    };

    fn catalog() -> TaskCatalog {
        TaskCatalog::new(
            (1..=3)
                .map(|id| CourseTask {
                    id: TaskId(id),
                    name: format!("task-{id}"),
                    max_grade: 10.0,
                    expiry_date: None,
                    status: TaskStatus::Active,
                })
                .collect(),
        )
    }

    fn weighted_pair() -> GraphStructure {
        GraphStructure {
            nodes: vec![
                Node {
                    id: "a".into(),
                    kind: NodeKind::Source { task: TaskId(1) },
                },
                Node {
                    id: "b".into(),
                    kind: NodeKind::Source { task: TaskId(2) },
                },
                Node {
                    id: "avg".into(),
                    kind: NodeKind::Average,
                },
                Node {
                    id: "final".into(),
                    kind: NodeKind::Sink,
                },
            ],
            edges: vec![
                Edge {
                    from: "a".into(),
                    to: "avg".into(),
                    weight: Some(0.5),
                },
                Edge {
                    from: "b".into(),
                    to: "avg".into(),
                    weight: Some(0.5),
                },
                Edge {
                    from: "avg".into(),
                    to: "final".into(),
                    weight: None,
                },
            ],
        }
    }

    #[test]
    fn walk_resolves_the_worked_example() {
        // taskA=8 and taskB=6 at equal weights average to 7.
        let model = compile(&weighted_pair(), &catalog()).unwrap();
        let mut ledger = Ledger::with_capacity(model.node_count());

        let outcome = walk(&model, &[Some(8.0), Some(6.0)], &mut ledger);
        assert_eq!(outcome.final_grade, Value::Resolved(7.0));
        assert_eq!(outcome.fault, None);
    }

    #[test]
    fn missing_source_propagates_to_the_sink() {
        let model = compile(&weighted_pair(), &catalog()).unwrap();
        let mut ledger = Ledger::with_capacity(model.node_count());

        let outcome = walk(&model, &[Some(8.0), None], &mut ledger);
        assert_eq!(outcome.final_grade, Value::Unresolved);
        assert_eq!(outcome.fault, None, "missing data is not a fault");
    }

    #[test]
    fn ledger_keeps_intermediate_values_for_auditing() {
        let model = compile(&weighted_pair(), &catalog()).unwrap();
        let mut ledger = Ledger::with_capacity(model.node_count());
        walk(&model, &[Some(8.0), Some(6.0)], &mut ledger);

        let avg = model
            .order()
            .iter()
            .copied()
            .find(|&ix| model.id(ix) == "avg")
            .unwrap();
        assert_eq!(ledger.get(avg.index()), Some(Value::Resolved(7.0)));
    }

    #[test]
    fn rerunning_the_walk_is_deterministic() {
        let model = compile(&weighted_pair(), &catalog()).unwrap();
        let run = || {
            let mut ledger = Ledger::with_capacity(model.node_count());
            walk(&model, &[Some(7.5), Some(3.25)], &mut ledger)
        };
        assert_eq!(run(), run());
    }
}
