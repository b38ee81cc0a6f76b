//! Shape statistics over a compiled model, for the compile debug log and
//! for editor UIs that want to summarize a model without walking it.

use std::collections::HashMap;

use crate::compile::CompiledModel;
use crate::model::NodeIx;

#[derive(Debug, Clone)]
pub struct ModelStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub source_count: usize,
    /// Count per node-kind label, e.g. `"average" -> 2`.
    pub kind_counts: HashMap<&'static str, usize>,
    /// Longest source-to-sink path, counted in nodes.
    pub depth: usize,
    pub max_fan_in: usize,
}

impl ModelStats {
    pub fn analyze(model: &CompiledModel) -> Self {
        let mut kind_counts: HashMap<&'static str, usize> = HashMap::new();
        let mut edge_count = 0;
        let mut max_fan_in = 0;

        // Node depth = 1 + deepest parent; the topological order guarantees
        // parents are finished before their children are looked at.
        let mut depths = vec![0usize; model.node_count()];
        let mut depth = 0;

        for &ix in model.order() {
            *kind_counts.entry(model.kind(ix).label()).or_insert(0) += 1;

            let parents = model.parents(ix);
            edge_count += parents.len();
            max_fan_in = max_fan_in.max(parents.len());

            let parent_depth = parents
                .iter()
                .map(|p: &NodeIx| depths[p.index()])
                .max()
                .unwrap_or(0);
            depths[ix.index()] = parent_depth + 1;
            depth = depth.max(depths[ix.index()]);
        }

        Self {
            node_count: model.node_count(),
            edge_count,
            source_count: model.sources().len(),
            kind_counts,
            depth,
            max_fan_in,
        }
    }
}
