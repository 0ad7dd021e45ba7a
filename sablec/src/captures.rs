//! Capture sets.
//!
//! A capture set tracks the second-class resources a block closes over.
//! Atoms are concrete capabilities, bound capture parameters of an
//! enclosing function type, or capture unification variables standing for
//! captures still being inferred.

use std::collections::BTreeSet;
use std::fmt;

use crate::types::{CapabilityId, CaptureParamId, CaptureUnificationVar};

/// A single capture atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capture {
    /// A concrete capability.
    Capability(CapabilityId),
    /// A bound capture parameter of an enclosing function type.
    Param(CaptureParamId),
    /// A capture unification variable.
    Var(CaptureUnificationVar),
}

impl Capture {
    /// Everything except unification variables counts as concrete.
    pub fn is_concrete(&self) -> bool {
        !matches!(self, Capture::Var(_))
    }
}

impl fmt::Display for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capture::Capability(c) => write!(f, "{c}"),
            Capture::Param(p) => write!(f, "{p}"),
            Capture::Var(v) => write!(f, "{v}"),
        }
    }
}

/// A set of capture atoms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureSet {
    captures: BTreeSet<Capture>,
}

impl CaptureSet {
    /// The empty capture set (a pure block).
    pub fn empty() -> Self {
        Self::default()
    }

    /// A capture set with a single atom.
    pub fn single(capture: Capture) -> Self {
        let mut captures = BTreeSet::new();
        captures.insert(capture);
        Self { captures }
    }

    /// A capture set referencing one bound capture parameter.
    pub fn param(param: CaptureParamId) -> Self {
        Self::single(Capture::Param(param))
    }

    /// A capture set holding one capture unification variable.
    pub fn var(var: CaptureUnificationVar) -> Self {
        Self::single(Capture::Var(var))
    }

    pub fn insert(&mut self, capture: Capture) {
        self.captures.insert(capture);
    }

    /// Add every atom of `other` to this set.
    pub fn extend(&mut self, other: &CaptureSet) {
        self.captures.extend(other.captures.iter().copied());
    }

    pub fn contains(&self, capture: &Capture) -> bool {
        self.captures.contains(capture)
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capture> {
        self.captures.iter()
    }

    /// The union of this set and `other`.
    pub fn union(&self, other: &CaptureSet) -> CaptureSet {
        let mut out = self.clone();
        out.extend(other);
        out
    }

    pub fn is_subset(&self, other: &CaptureSet) -> bool {
        self.captures.is_subset(&other.captures)
    }

    /// Apply `f` to every atom.
    pub fn map(&self, mut f: impl FnMut(&Capture) -> Capture) -> CaptureSet {
        self.captures.iter().map(|c| f(c)).collect()
    }

    /// Whether any atom is a capture unification variable.
    pub fn has_variables(&self) -> bool {
        self.captures.iter().any(|c| !c.is_concrete())
    }
}

impl FromIterator<Capture> for CaptureSet {
    fn from_iter<I: IntoIterator<Item = Capture>>(iter: I) -> Self {
        Self { captures: iter.into_iter().collect() }
    }
}

impl fmt::Display for CaptureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, c) in self.captures.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "}}")
    }
}
