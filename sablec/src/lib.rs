//! Front-end inference engine for the Sable language.
//!
//! Sable is an effect-polymorphic functional language with second-class
//! block parameters, algebraic effect handlers, and capture tracking. This
//! crate implements the part of the front-end every other pass leans on:
//! the type and capture unification engine.
//!
//! The surface consumed by the bidirectional checker is small:
//!
//! ```
//! use sablec::types::{Names, ValueType, VarRole};
//! use sablec::typeck::UnificationScope;
//!
//! let mut names = Names::new();
//! let int = ValueType::nullary(names.type_ctor("Int"));
//!
//! let mut scope = UnificationScope::new();
//! let x = scope.fresh(VarRole::InferredReturn);
//! scope.require_subtype(&int, &ValueType::Var(x)).unwrap();
//! assert!(scope.is_subtype(&int, &ValueType::Var(x)));
//! ```
//!
//! Parsing, name resolution, lowering, and code generation live in sibling
//! crates; they hand fully resolved [`types::ValueType`] values to a
//! [`typeck::UnificationScope`] and react to the [`typeck::TypeError`]s it
//! reports.

pub mod captures;
pub mod effects;
pub mod subst;
pub mod typeck;
pub mod types;

pub use captures::{Capture, CaptureSet};
pub use effects::{Effect, EffectSet};
pub use subst::Substitution;
pub use typeck::{ConstraintGraph, TypeError, UnificationScope};
pub use types::{BlockType, FunctionType, InterfaceType, Names, UnificationVar, ValueType};
