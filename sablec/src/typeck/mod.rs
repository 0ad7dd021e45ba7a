//! Type and capture inference.
//!
//! This module is the solver of the Sable front-end: bidirectional subtype
//! inference over value types, block types, and capture sets. The design
//! follows the capability-passing account of effects and captures
//! (Brachthäuser et al., *Effects as Capabilities*, OOPSLA 2020, and
//! *Effects, Capabilities, and Boxes*, OOPSLA 2022).
//!
//! # Components
//!
//! - [`graph`] - equivalence classes of unification variables with
//!   lower/upper bound payloads and a transitively closed subtype relation
//! - [`compare`] - the structural walk, parameterized over what a
//!   variable-involving obligation does
//! - [`scope`] - the owning context: fresh variables, scheme
//!   instantiation, constraint solving, snapshot/restore
//! - [`error`] - the failure taxonomy
//!
//! # Flow
//!
//! The bidirectional checker calls [`UnificationScope::require_subtype`]
//! with types produced by resolution and lowering. The scope walks the two
//! types structurally; at variable leaves it merges bounds under the
//! position's polarity and propagates them across the graph. A failed
//! obligation surfaces as a [`TypeError`]; speculative attempts are
//! bracketed with [`UnificationScope::snapshot`] /
//! [`UnificationScope::restore`].

pub mod compare;
pub mod error;
pub mod graph;
pub mod scope;

#[cfg(test)]
mod prop_tests;

pub use compare::{Polarity, TypeComparer};
pub use error::{ParamKind, TypeError};
pub use graph::ConstraintGraph;
pub use scope::{Snapshot, UnificationScope};
