//! The persisted shape of a grading model: a graph of typed nodes the
//! teacher wires together in the editor, plus the course-task catalog the
//! graph's leaves are bound to.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a course task (the atomic gradable unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TaskId(pub u32);

/// Identifier of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct UserId(pub u32);

/// Dense index of a node inside a compiled model.
///
/// External node ids are strings owned by the editor; compilation assigns
/// every node a position in the columnar arrays and this index abstracts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeIx(pub u32);

impl NodeIx {
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn new(idx: usize) -> Self {
        Self(idx as u32)
    }
}

/// Rounding applied by a `round` node. `Nearest` rounds halves away from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundMode {
    Down,
    Nearest,
    Up,
}

/// What a `require` node emits when its input is below the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailAction {
    /// The gate failed but the course continues: the node outputs `0.0`.
    Zero,
    /// The gate failure poisons the result: the node outputs `Unresolved`.
    Fail,
}

/// The closed set of node kinds a grading model may contain.
///
/// The discriminator is carried in the serialized form as `"type"`, so the
/// editor's JSON deserializes straight into this union and adding a kind is
/// a compile-time-checked change (every `match` below must be extended).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Leaf bound to exactly one course task. Its output is the student's
    /// effective grade for that task, or `Unresolved` when no usable record
    /// exists.
    Source { task: TaskId },
    /// Sum of all inputs.
    Addition,
    /// Weighted mean of all inputs. Weights live on the incoming edges,
    /// must be positive and need not sum to one.
    Average,
    /// Minimum of all inputs.
    Min,
    /// Maximum of all inputs.
    Max,
    /// Threshold gate on a single input.
    Require { threshold: f64, on_fail: FailAction },
    /// Bucket mapping on a single input: `outputs[i]` for an input with
    /// exactly `i` breakpoints at or below it. Breakpoints must be strictly
    /// increasing and `outputs` one entry longer.
    Stepper {
        breakpoints: Vec<f64>,
        outputs: Vec<f64>,
    },
    /// Explicit rounding of a single input.
    Round { mode: RoundMode },
    /// The unique terminal node; passes its single input through as the
    /// final-grade candidate.
    Sink,
}

impl NodeKind {
    /// Stable lowercase label, matching the serialized discriminator.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Source { .. } => "source",
            NodeKind::Addition => "addition",
            NodeKind::Average => "average",
            NodeKind::Min => "min",
            NodeKind::Max => "max",
            NodeKind::Require { .. } => "require",
            NodeKind::Stepper { .. } => "stepper",
            NodeKind::Round { .. } => "round",
            NodeKind::Sink => "sink",
        }
    }
}

/// One node of the authored graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable editor-assigned id, unique within the graph.
    pub id: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// A directed dependency between two nodes. The declared order of the edge
/// list defines the input order seen by the target node's evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// Consumed by `average` targets; ignored elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// The persisted grading model graph, immutable during evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStructure {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphStructure {
    /// Parses the editor's JSON encoding of a model graph.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Lifecycle state of a course task in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Archived,
    Deleted,
}

/// Course-part metadata for one gradable task, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseTask {
    pub id: TaskId,
    pub name: String,
    /// Declared upper bound for raw grades on this task.
    pub max_grade: f64,
    /// Course-part validity deadline. A task past it still evaluates, but
    /// the model is flagged as drawing on an expired input.
    pub expiry_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
}

/// Id-indexed collection of the course's tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    tasks: Vec<CourseTask>,
    by_id: HashMap<TaskId, usize>,
}

impl TaskCatalog {
    pub fn new(tasks: Vec<CourseTask>) -> Self {
        let by_id = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, i))
            .collect();
        Self { tasks, by_id }
    }

    pub fn get(&self, id: TaskId) -> Option<&CourseTask> {
        self.by_id.get(&id).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CourseTask> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// The course's grading scale, used only for result classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradingScale {
    pub max_final_grade: f64,
    /// When true, a non-integral final-grade candidate is classified as
    /// invalid rather than rounded; rounding is always an explicit node.
    pub integer_grades: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_union_parses_editor_json() {
        let json = r#"{
            "nodes": [
                {"id": "source-7", "type": "source", "task": 7},
                {"id": "avg", "type": "average"},
                {"id": "gate", "type": "require", "threshold": 5.0, "on_fail": "zero"},
                {"id": "steps", "type": "stepper", "breakpoints": [50.0, 70.0], "outputs": [0.0, 1.0, 2.0]},
                {"id": "final", "type": "sink"}
            ],
            "edges": [
                {"from": "source-7", "to": "avg", "weight": 0.5},
                {"from": "avg", "to": "gate"},
                {"from": "gate", "to": "steps"},
                {"from": "steps", "to": "final"}
            ]
        }"#;

        let graph = GraphStructure::from_json(json).expect("parse failed");
        assert_eq!(graph.nodes.len(), 5);
        assert_eq!(graph.nodes[0].kind, NodeKind::Source { task: TaskId(7) });
        assert_eq!(
            graph.nodes[2].kind,
            NodeKind::Require {
                threshold: 5.0,
                on_fail: FailAction::Zero
            }
        );
        assert_eq!(graph.edges[0].weight, Some(0.5));
        assert_eq!(graph.edges[1].weight, None);
    }

    #[test]
    fn node_union_round_trips() {
        let node = Node {
            id: "round-1".into(),
            kind: NodeKind::Round {
                mode: RoundMode::Nearest,
            },
        };
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains(r#""type":"round""#), "json: {json}");
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn catalog_lookup_by_id() {
        let catalog = TaskCatalog::new(vec![
            CourseTask {
                id: TaskId(1),
                name: "Exercises".into(),
                max_grade: 30.0,
                expiry_date: None,
                status: TaskStatus::Active,
            },
            CourseTask {
                id: TaskId(2),
                name: "Exam".into(),
                max_grade: 60.0,
                expiry_date: None,
                status: TaskStatus::Archived,
            },
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(TaskId(2)).unwrap().name, "Exam");
        assert!(!catalog.contains(TaskId(9)));
    }
}
