//! Pure per-kind node evaluation.
//!
//! Each kind maps already-resolved input values to one output; the kernel
//! never re-enters the graph and never reads a clock. Inputs arrive in the
//! edge list's declared order, so identical inputs always give the
//! identical output.
//!
//! Unresolved-input policy, fixed per kind:
//! - every kind propagates `Unresolved` strictly, except
//! - `Max` skips unresolved inputs and is `Unresolved` only when all of
//!   them are. Max models "best attempt among alternatives"; min models
//!   "all requirements must hold", so a missing requirement is not waived.
//!
//! No kind clamps and no kind rounds; rounding happens only at an explicit
//! `Round` node and range enforcement is the classifier's job.

use crate::compute::ledger::{EvalFault, Value};
use crate::model::{FailAction, NodeKind, RoundMode};

/// Evaluates one non-source node from its gathered input values.
///
/// `weights` is parallel to `inputs` (the parent edges in declared order);
/// only `Average` reads it. Arity was validated at compile time, but a
/// mismatch here is still reported as a fault rather than trusted.
pub fn evaluate(
    id: &str,
    kind: &NodeKind,
    inputs: &[Value],
    weights: &[Option<f64>],
) -> Result<Value, EvalFault> {
    let output = match kind {
        // Sources are seeded by the walk before the kernel runs.
        NodeKind::Source { .. } => {
            return Err(EvalFault::InputCount {
                node: id.to_string(),
                kind: kind.label(),
                actual: inputs.len(),
            });
        }

        NodeKind::Addition => match require_all(inputs) {
            Some(values) => Value::Resolved(values.sum()),
            None => Value::Unresolved,
        },

        NodeKind::Average => {
            let mut weighted_sum = 0.0;
            let mut weight_sum = 0.0;
            let mut unresolved = false;
            for (value, weight) in inputs.iter().zip(weights) {
                // Validation guarantees a positive finite weight per edge.
                let weight = weight.unwrap_or(1.0);
                match value {
                    Value::Resolved(v) => {
                        weighted_sum += weight * v;
                        weight_sum += weight;
                    }
                    Value::Unresolved => unresolved = true,
                }
            }
            if unresolved || inputs.is_empty() {
                Value::Unresolved
            } else {
                Value::Resolved(weighted_sum / weight_sum)
            }
        }

        NodeKind::Min => match require_all(inputs) {
            Some(values) => Value::Resolved(values.fold(f64::INFINITY, f64::min)),
            None => Value::Unresolved,
        },

        // Tolerant kind: unresolved attempts are skipped, not poisoning.
        NodeKind::Max => {
            let best = inputs
                .iter()
                .filter_map(|v| v.resolved())
                .fold(f64::NEG_INFINITY, f64::max);
            if best == f64::NEG_INFINITY {
                Value::Unresolved
            } else {
                Value::Resolved(best)
            }
        }

        NodeKind::Require { threshold, on_fail } => match single(id, kind, inputs)? {
            Value::Unresolved => Value::Unresolved,
            Value::Resolved(v) if v >= *threshold => Value::Resolved(v),
            Value::Resolved(_) => match on_fail {
                FailAction::Zero => Value::Resolved(0.0),
                FailAction::Fail => Value::Unresolved,
            },
        },

        NodeKind::Stepper {
            breakpoints,
            outputs,
        } => match single(id, kind, inputs)? {
            Value::Unresolved => Value::Unresolved,
            Value::Resolved(v) => {
                let step = breakpoints.iter().take_while(|&&b| b <= v).count();
                Value::Resolved(outputs[step])
            }
        },

        NodeKind::Round { mode } => match single(id, kind, inputs)? {
            Value::Unresolved => Value::Unresolved,
            Value::Resolved(v) => Value::Resolved(match mode {
                RoundMode::Down => v.floor(),
                // f64::round is half away from zero, the documented policy.
                RoundMode::Nearest => v.round(),
                RoundMode::Up => v.ceil(),
            }),
        },

        NodeKind::Sink => single(id, kind, inputs)?,
    };

    match output {
        Value::Resolved(v) if !v.is_finite() => Err(EvalFault::NonFinite {
            node: id.to_string(),
        }),
        other => Ok(other),
    }
}

/// All inputs resolved, or `None` when any is unresolved (strict policy).
fn require_all(inputs: &[Value]) -> Option<impl Iterator<Item = f64> + '_> {
    if inputs.is_empty() || inputs.iter().any(|v| v.is_unresolved()) {
        return None;
    }
    Some(inputs.iter().filter_map(|v| v.resolved()))
}

fn single(id: &str, kind: &NodeKind, inputs: &[Value]) -> Result<Value, EvalFault> {
    match inputs {
        [only] => Ok(*only),
        _ => Err(EvalFault::InputCount {
            node: id.to_string(),
            kind: kind.label(),
            actual: inputs.len(),
        }),
    }
}
