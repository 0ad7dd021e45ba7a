//! Structural subtype comparison.
//!
//! [`TypeComparer`] walks two types in lockstep and reduces every
//! variable-involving obligation to one of three hooks. The hooks decide
//! what a comparison *means*: the solver's implementation (on
//! [`UnificationScope`](super::UnificationScope)) mutates the constraint
//! graph, while [`SubtypeQuery`] answers from recorded bounds without
//! touching anything. Failure is an `Err`; the walk never recovers.

use crate::captures::CaptureSet;
use crate::effects::EffectSet;
use crate::subst::Substitution;
use crate::types::{BlockType, FunctionType, InterfaceType, UnificationVar, ValueType};

use super::error::{ParamKind, TypeError};
use super::graph::ConstraintGraph;

/// Variance of the position currently being merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Join: the result must be above both inputs.
    Covariant,
    /// Meet: the result must be below both inputs.
    Contravariant,
    /// Equality: the inputs must coincide.
    Invariant,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let polarity = match self {
            Polarity::Covariant => "covariant",
            Polarity::Contravariant => "contravariant",
            Polarity::Invariant => "invariant",
        };
        write!(f, "{polarity}")
    }
}

/// Structural subtype checker, parameterized over how variable-involving
/// and capture obligations are discharged.
pub trait TypeComparer {
    /// Record `t <: x`.
    fn require_lower_bound(&mut self, x: UnificationVar, t: &ValueType) -> Result<(), TypeError>;

    /// Record `x <: t`.
    fn require_upper_bound(&mut self, x: UnificationVar, t: &ValueType) -> Result<(), TypeError>;

    /// Discharge `c1 <: c2`.
    fn unify_captures(&mut self, c1: &CaptureSet, c2: &CaptureSet) -> Result<(), TypeError>;

    /// Assert `t1 <: t2`.
    ///
    /// Constructor arguments are compared covariantly.
    fn unify_value_types(&mut self, t1: &ValueType, t2: &ValueType) -> Result<(), TypeError> {
        if t1 == t2 {
            return Ok(());
        }
        match (t1, t2) {
            (_, ValueType::Top) | (ValueType::Bottom, _) => Ok(()),
            (ValueType::Var(x), _) => self.require_upper_bound(*x, t2),
            (_, ValueType::Var(x)) => self.require_lower_bound(*x, t1),
            (ValueType::App(c1, args1), ValueType::App(c2, args2))
                if c1 == c2 && args1.len() == args2.len() =>
            {
                for (a1, a2) in args1.iter().zip(args2) {
                    self.unify_value_types(a1, a2)?;
                }
                Ok(())
            }
            (ValueType::Boxed(b1, c1), ValueType::Boxed(b2, c2)) => {
                self.unify_block_types(b1, b2)?;
                self.unify_captures(c1, c2)
            }
            _ => Err(TypeError::Mismatch { expected: t2.clone(), found: t1.clone() }),
        }
    }

    /// Assert `b1 <: b2`.
    fn unify_block_types(&mut self, b1: &BlockType, b2: &BlockType) -> Result<(), TypeError> {
        match (b1, b2) {
            (BlockType::Function(f1), BlockType::Function(f2)) => self.unify_function_types(f1, f2),
            (BlockType::Interface(i1), BlockType::Interface(i2)) => {
                self.unify_interface_types(i1, i2)
            }
            _ => Err(TypeError::BlockMismatch { expected: b2.clone(), found: b1.clone() }),
        }
    }

    /// Assert `i1 <: i2`. Heads must coincide; arguments are covariant.
    fn unify_interface_types(
        &mut self,
        i1: &InterfaceType,
        i2: &InterfaceType,
    ) -> Result<(), TypeError> {
        if i1.interface != i2.interface {
            return Err(TypeError::BlockMismatch {
                expected: BlockType::Interface(i2.clone()),
                found: BlockType::Interface(i1.clone()),
            });
        }
        if i1.args.len() != i2.args.len() {
            return Err(TypeError::Arity {
                kind: ParamKind::Type,
                expected: i2.args.len(),
                found: i1.args.len(),
            });
        }
        for (a1, a2) in i1.args.iter().zip(&i2.args) {
            self.unify_value_types(a1, a2)?;
        }
        Ok(())
    }

    /// Assert `f1 <: f2`.
    ///
    /// `f2`'s binders are alpha-renamed onto `f1`'s, then value and block
    /// parameters are compared contravariantly, the result covariantly, and
    /// the effects as a set inclusion.
    fn unify_function_types(&mut self, f1: &FunctionType, f2: &FunctionType) -> Result<(), TypeError> {
        arity_check(ParamKind::Type, f1.tparams.len(), f2.tparams.len())?;
        arity_check(ParamKind::Capture, f1.cparams.len(), f2.cparams.len())?;
        arity_check(ParamKind::Value, f1.vparams.len(), f2.vparams.len())?;
        arity_check(ParamKind::Block, f1.bparams.len(), f2.bparams.len())?;

        let mut renaming = Substitution::new();
        for (p2, p1) in f2.tparams.iter().zip(&f1.tparams) {
            renaming.insert_type(*p2, ValueType::Param(*p1));
        }
        for (c2, c1) in f2.cparams.iter().zip(&f1.cparams) {
            renaming.insert_captures(*c2, CaptureSet::param(*c1));
        }

        for (p1, p2) in f1.vparams.iter().zip(&f2.vparams) {
            let p2 = renaming.apply_value(p2)?;
            self.unify_value_types(&p2, p1)?;
        }
        for (b1, b2) in f1.bparams.iter().zip(&f2.bparams) {
            let b2 = renaming.apply_block(b2)?;
            self.unify_block_types(&b2, b1)?;
        }
        let result2 = renaming.apply_value(&f2.result)?;
        self.unify_value_types(&f1.result, &result2)?;
        let effects2 = renaming.apply_effects(&f2.effects)?;
        self.unify_effects(&f1.effects, &effects2)
    }

    /// Assert every effect of `e1` occurs in `e2`.
    fn unify_effects(&mut self, e1: &EffectSet, e2: &EffectSet) -> Result<(), TypeError> {
        for effect in e1.iter() {
            if !e2.contains(effect) {
                return Err(TypeError::EffectMismatch {
                    effect: effect.clone(),
                    expected: e2.clone(),
                });
            }
        }
        Ok(())
    }
}

fn arity_check(kind: ParamKind, left: usize, right: usize) -> Result<(), TypeError> {
    if left == right {
        Ok(())
    } else {
        Err(TypeError::Arity { kind, expected: right, found: left })
    }
}

/// Non-mutating subtype query over the current constraints.
///
/// Variable-vs-type obligations are entailment checks against the recorded
/// bounds; variable-vs-variable obligations read the graph's edges. Capture
/// obligations are ignored. Running the walk answers "is this relation
/// already forced", never "could it be made to hold".
pub(crate) struct SubtypeQuery<'g> {
    pub graph: &'g ConstraintGraph,
}

impl TypeComparer for SubtypeQuery<'_> {
    fn require_lower_bound(&mut self, x: UnificationVar, t: &ValueType) -> Result<(), TypeError> {
        if let ValueType::Var(y) = t {
            return if self.graph.is_subtype(*y, x) {
                Ok(())
            } else {
                Err(TypeError::Mismatch {
                    expected: ValueType::Var(x),
                    found: t.clone(),
                })
            };
        }
        // `t <: x` is entailed when `t` is below everything `x` can be:
        // its recorded lower bound.
        let lower = self.graph.lower_bound(x);
        self.unify_value_types(t, &lower)
    }

    fn require_upper_bound(&mut self, x: UnificationVar, t: &ValueType) -> Result<(), TypeError> {
        if let ValueType::Var(y) = t {
            return if self.graph.is_subtype(x, *y) {
                Ok(())
            } else {
                Err(TypeError::Mismatch {
                    expected: t.clone(),
                    found: ValueType::Var(x),
                })
            };
        }
        let upper = self.graph.upper_bound(x);
        self.unify_value_types(&upper, t)
    }

    fn unify_captures(&mut self, _c1: &CaptureSet, _c2: &CaptureSet) -> Result<(), TypeError> {
        Ok(())
    }
}
