//! Effect sets.
//!
//! An effect is an interface applied to value-type arguments, e.g.
//! `State[Int]` or `Exc`. Effect sets are unordered; the only non-trivial
//! operation on them is subtract-by-subtyping, which lives on
//! [`UnificationScope`](crate::typeck::UnificationScope) because it needs
//! the constraint graph to answer subtype queries.

use std::collections::BTreeSet;
use std::fmt;

use crate::types::{InterfaceId, ValueType};

/// A single effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Effect {
    /// The effect interface.
    pub interface: InterfaceId,
    /// Type arguments for parameterized effects, e.g. `State[Int]`.
    pub args: Vec<ValueType>,
}

impl Effect {
    pub fn new(interface: InterfaceId) -> Self {
        Self { interface, args: Vec::new() }
    }

    pub fn with_args(interface: InterfaceId, args: Vec<ValueType>) -> Self {
        Self { interface, args }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.interface)?;
        if !self.args.is_empty() {
            write!(f, "[")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// An unordered set of effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectSet {
    effects: BTreeSet<Effect>,
}

impl EffectSet {
    /// The empty effect set (pure).
    pub fn pure() -> Self {
        Self::default()
    }

    /// An effect set with a single effect.
    pub fn single(effect: Effect) -> Self {
        let mut effects = BTreeSet::new();
        effects.insert(effect);
        Self { effects }
    }

    pub fn insert(&mut self, effect: Effect) {
        self.effects.insert(effect);
    }

    /// Add every effect of `other` to this set.
    pub fn extend(&mut self, other: &EffectSet) {
        self.effects.extend(other.effects.iter().cloned());
    }

    pub fn contains(&self, effect: &Effect) -> bool {
        self.effects.contains(effect)
    }

    pub fn is_pure(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    /// The union of this set and `other`.
    pub fn union(&self, other: &EffectSet) -> EffectSet {
        let mut out = self.clone();
        out.extend(other);
        out
    }
}

impl FromIterator<Effect> for EffectSet {
    fn from_iter<I: IntoIterator<Item = Effect>>(iter: I) -> Self {
        Self { effects: iter.into_iter().collect() }
    }
}

impl fmt::Display for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, e) in self.effects.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Names;

    #[test]
    fn test_pure_set() {
        let set = EffectSet::pure();
        assert!(set.is_pure());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_single_effect() {
        let mut names = Names::new();
        let exc = Effect::new(names.interface("Exc"));
        let set = EffectSet::single(exc.clone());
        assert!(!set.is_pure());
        assert!(set.contains(&exc));
    }

    #[test]
    fn test_union_deduplicates() {
        let mut names = Names::new();
        let exc = Effect::new(names.interface("Exc"));
        let console = Effect::new(names.interface("Console"));
        let a = EffectSet::single(exc.clone());
        let b = EffectSet::single(exc).union(&EffectSet::single(console));
        let ab = a.union(&b);
        assert_eq!(ab.len(), 2);
    }

    #[test]
    fn test_parameterized_effects_distinct() {
        let mut names = Names::new();
        let state = names.interface("State");
        let int = ValueType::nullary(names.type_ctor("Int"));
        let bool_ = ValueType::nullary(names.type_ctor("Bool"));
        let s_int = Effect::with_args(state, vec![int]);
        let s_bool = Effect::with_args(state, vec![bool_]);
        let set = EffectSet::single(s_int.clone());
        assert!(set.contains(&s_int));
        assert!(!set.contains(&s_bool));
    }
}
