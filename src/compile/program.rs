//! The validated, immutable snapshot of a grading model.
//!
//! Compilation flattens the editor's node/edge lists into dense columnar
//! arrays: one kind and one external id per node position, parent lists in
//! CSR form with the edge weights alongside, and the topological order the
//! per-student walk replays. The snapshot is computed once per graph
//! version and shared read-only across the whole batch.

use crate::model::{NodeIx, NodeKind, TaskId};

/// A `source` node together with the course task it draws grades from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceBinding {
    pub node: NodeIx,
    pub task: TaskId,
}

#[derive(Debug, Clone)]
pub struct CompiledModel {
    // Columnar node data, index = NodeIx
    pub(crate) kinds: Vec<NodeKind>,
    pub(crate) ids: Vec<String>,

    // Topology (CSR): parents of node i live at parents_flat[start..start+count],
    // in the edge list's declared order; parent_weights is parallel to it.
    pub(crate) parents_flat: Vec<NodeIx>,
    pub(crate) parent_weights: Vec<Option<f64>>,
    pub(crate) parents_ranges: Vec<(u32, u32)>,

    /// Cached topological order, parents before children. Computed once per
    /// graph; every student's walk replays it unchanged.
    pub(crate) order: Vec<NodeIx>,

    pub(crate) sink: NodeIx,
    pub(crate) sources: Vec<SourceBinding>,
}

impl CompiledModel {
    pub fn node_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn kind(&self, ix: NodeIx) -> &NodeKind {
        &self.kinds[ix.index()]
    }

    /// External editor-assigned id, used for logs and traces.
    pub fn id(&self, ix: NodeIx) -> &str {
        &self.ids[ix.index()]
    }

    pub fn order(&self) -> &[NodeIx] {
        &self.order
    }

    pub fn sink(&self) -> NodeIx {
        self.sink
    }

    pub fn sources(&self) -> &[SourceBinding] {
        &self.sources
    }

    #[inline(always)]
    pub fn parents(&self, ix: NodeIx) -> &[NodeIx] {
        let (start, count) = self.parents_ranges[ix.index()];
        &self.parents_flat[start as usize..(start + count) as usize]
    }

    #[inline(always)]
    pub fn parent_weights(&self, ix: NodeIx) -> &[Option<f64>] {
        let (start, count) = self.parents_ranges[ix.index()];
        &self.parent_weights[start as usize..(start + count) as usize]
    }

    /// Whether any source node draws from the given task.
    pub fn binds_task(&self, task: TaskId) -> bool {
        self.sources.iter().any(|binding| binding.task == task)
    }
}

/// A parent reference collected while resolving edges, before flattening.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParentRef {
    pub ix: NodeIx,
    pub weight: Option<f64>,
}

/// Flattens per-node parent lists into the CSR columns of a `CompiledModel`.
///
/// The caller (the validator) has already established that the inputs are
/// defect-free; this step is pure layout.
pub(crate) fn assemble(
    kinds: Vec<NodeKind>,
    ids: Vec<String>,
    parent_lists: &[Vec<ParentRef>],
    order: Vec<NodeIx>,
    sink: NodeIx,
) -> CompiledModel {
    let total_edges: usize = parent_lists.iter().map(Vec::len).sum();
    let mut parents_flat = Vec::with_capacity(total_edges);
    let mut parent_weights = Vec::with_capacity(total_edges);
    let mut parents_ranges = Vec::with_capacity(parent_lists.len());

    for parents in parent_lists {
        let start = parents_flat.len() as u32;
        for parent in parents {
            parents_flat.push(parent.ix);
            parent_weights.push(parent.weight);
        }
        parents_ranges.push((start, parents.len() as u32));
    }

    let sources = kinds
        .iter()
        .enumerate()
        .filter_map(|(i, kind)| match kind {
            NodeKind::Source { task } => Some(SourceBinding {
                node: NodeIx::new(i),
                task: *task,
            }),
            _ => None,
        })
        .collect();

    CompiledModel {
        kinds,
        ids,
        parents_flat,
        parent_weights,
        parents_ranges,
        order,
        sink,
        sources,
    }
}
