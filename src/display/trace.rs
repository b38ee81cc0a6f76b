//! Renders one student's evaluation as an audit tree.
//!
//! The tree hangs from the sink and recurses upstream through each node's
//! parents, annotating every line with the value the walk left in the
//! ledger. A node feeding several consumers is printed in full once and
//! elided as a back-reference afterwards.

use std::collections::HashMap;
use std::fmt::Write;

use crate::compile::CompiledModel;
use crate::compute::{Ledger, Value};
use crate::model::{NodeIx, NodeKind, RoundMode, UserId};

pub fn format_trace(model: &CompiledModel, ledger: &Ledger, user: UserId) -> String {
    let mut tracer = Tracer {
        model,
        ledger,
        visited_at_level: HashMap::new(),
        output: String::new(),
    };

    let _ = writeln!(tracer.output, "AUDIT TRACE for student {}:", user.0);
    let _ = writeln!(
        tracer.output,
        "--------------------------------------------------"
    );
    tracer.trace_node(model.sink(), 1, "");
    tracer.output
}

struct Tracer<'a> {
    model: &'a CompiledModel,
    ledger: &'a Ledger,
    visited_at_level: HashMap<NodeIx, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, ix: NodeIx, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&ix) {
            let _ = writeln!(
                self.output,
                "{}-> {} (Ref to L{})",
                prefix,
                self.model.id(ix),
                first_seen
            );
            return;
        }
        self.visited_at_level.insert(ix, level);

        let header = format!("[L{}] {}{}", level, self.model.id(ix), self.value_of(ix));
        match self.model.kind(ix) {
            NodeKind::Source { task } => {
                let _ = writeln!(self.output, "{}{} -> Var(task {})", prefix, header, task.0);
            }
            kind => {
                let formula = self.format_formula(ix, kind);
                let _ = writeln!(self.output, "{}{} = {}", prefix, header, formula);
                self.recurse_parents(prefix, ix, level);
            }
        }
    }

    fn recurse_parents(&mut self, prefix: &str, ix: NodeIx, level: usize) {
        let stem = build_child_stem(prefix);
        let parents: Vec<NodeIx> = self.model.parents(ix).to_vec();
        for (i, parent) in parents.iter().enumerate() {
            let connector = if i == parents.len() - 1 { "`--" } else { "|--" };
            let full_prefix = format!("{}{}", stem, connector);
            self.trace_node(*parent, level + 1, &full_prefix);
        }
    }

    fn format_formula(&self, ix: NodeIx, kind: &NodeKind) -> String {
        let parents = self.model.parents(ix);
        let first = || {
            parents
                .first()
                .map(|&p| self.model.id(p).to_string())
                .unwrap_or_else(|| "?".into())
        };
        match kind {
            NodeKind::Source { .. } => unreachable!("sources print as Var lines"),
            NodeKind::Addition => self.join_parents(ix, " + "),
            NodeKind::Average => {
                let terms: Vec<String> = parents
                    .iter()
                    .zip(self.model.parent_weights(ix))
                    .map(|(&p, w)| match w {
                        Some(w) => format!("{}*{}", self.model.id(p), w),
                        None => self.model.id(p).to_string(),
                    })
                    .collect();
                format!("average({})", terms.join(", "))
            }
            NodeKind::Min => format!("min({})", self.join_parents(ix, ", ")),
            NodeKind::Max => format!("max({})", self.join_parents(ix, ", ")),
            NodeKind::Require { threshold, .. } => {
                format!("require({} >= {})", first(), threshold)
            }
            NodeKind::Stepper { breakpoints, .. } => {
                format!("stepper({}, breakpoints={:?})", first(), breakpoints)
            }
            NodeKind::Round { mode } => {
                let mode = match mode {
                    RoundMode::Down => "down",
                    RoundMode::Nearest => "nearest",
                    RoundMode::Up => "up",
                };
                format!("round_{}({})", mode, first())
            }
            NodeKind::Sink => first(),
        }
    }

    fn join_parents(&self, ix: NodeIx, separator: &str) -> String {
        self.model
            .parents(ix)
            .iter()
            .map(|&p| self.model.id(p))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn value_of(&self, ix: NodeIx) -> String {
        match self.ledger.get(ix.index()) {
            Some(Value::Resolved(v)) => format!("[{:.3}]", v),
            Some(Value::Unresolved) => "[unresolved]".to_string(),
            None => "[?]".to_string(),
        }
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}
