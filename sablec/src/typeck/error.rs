//! Solver failure taxonomy.
//!
//! The solver never recovers from an error: the comparer surfaces the first
//! failed obligation and callers discard the attempt, typically via
//! [`UnificationScope::restore`](super::UnificationScope::restore) during
//! speculative overload resolution. Violations of internal graph
//! preconditions are programmer errors and panic instead.

use thiserror::Error;

use crate::captures::CaptureSet;
use crate::effects::{Effect, EffectSet};
use crate::types::{BlockType, CaptureUnificationVar, ValueType};

use super::compare::Polarity;

/// Which parameter list of a function type failed to line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Type,
    Capture,
    Value,
    Block,
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ParamKind::Type => "type",
            ParamKind::Capture => "capture",
            ParamKind::Value => "value",
            ParamKind::Block => "block",
        };
        write!(f, "{kind}")
    }
}

/// Errors surfaced by the inference engine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// Two value types disagree structurally.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    Mismatch { expected: ValueType, found: ValueType },

    /// Two block types disagree in kind or interface head.
    #[error("block type mismatch: expected `{expected}`, found `{found}`")]
    BlockMismatch { expected: BlockType, found: BlockType },

    /// Parameter counts differ during function or interface comparison.
    #[error("arity mismatch: expected {expected} {kind} parameter(s), found {found}")]
    Arity { kind: ParamKind, expected: usize, found: usize },

    /// Two bounds cannot be merged at the required polarity.
    #[error("cannot merge `{left}` and `{right}` at {polarity} polarity")]
    MergeImpossible { left: ValueType, right: ValueType, polarity: Polarity },

    /// An effect of the left set has no counterpart in the right set.
    #[error("unhandled effect `{effect}`: not contained in `{expected}`")]
    EffectMismatch { effect: Effect, expected: EffectSet },

    /// A concrete capture set is not included in its required bound.
    #[error("capture mismatch: `{found}` is not contained in `{expected}`")]
    CaptureMismatch { expected: CaptureSet, found: CaptureSet },

    /// A capture unification variable was hit while the substitution binds
    /// concrete captures; the caller mixed instantiation and inference state.
    #[error("cannot substitute through capture variable `{var}`: substitution binds {domain}")]
    SubstitutionConflict { var: CaptureUnificationVar, domain: CaptureSet },

    /// Block types cannot yet be related through the public interface.
    #[error("subtyping between block types is not implemented")]
    UnsupportedBlockSubtyping,

    /// Capture sets cannot yet be related through the public interface.
    #[error("subtyping between capture sets is not implemented")]
    UnsupportedCaptureSubtyping,
}
