//! Unification scopes.
//!
//! A [`UnificationScope`] owns the mutable state of one inference session:
//! the skolems it has allocated and the constraint graph relating them.
//! External passes feed it subtype obligations; it discharges them through
//! the graph-mutating [`TypeComparer`] implementation below. Speculative
//! work (overload resolution) brackets itself with [`snapshot`] and
//! [`restore`], which is the only undo mechanism.
//!
//! [`snapshot`]: UnificationScope::snapshot
//! [`restore`]: UnificationScope::restore

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, trace};

use crate::captures::CaptureSet;
use crate::effects::{Effect, EffectSet};
use crate::subst::Substitution;
use crate::types::{
    BlockType, CaptureRole, CaptureUnificationVar, FunctionType, ScopeId, UnificationVar,
    ValueType, VarRole,
};

use super::compare::{Polarity, SubtypeQuery, TypeComparer};
use super::error::TypeError;
use super::graph::ConstraintGraph;

/// Process-wide scope id counter. Observable only in diagnostics.
static NEXT_SCOPE_ID: AtomicU32 = AtomicU32::new(0);

/// The mutable context of one inference session.
pub struct UnificationScope {
    id: ScopeId,
    skolems: Vec<UnificationVar>,
    capture_skolems: Vec<CaptureUnificationVar>,
    graph: ConstraintGraph,
    next_var: u32,
    next_capture_var: u32,
}

/// Saved scope state for speculative checking.
#[derive(Debug, Clone)]
pub struct Snapshot {
    skolems: Vec<UnificationVar>,
    capture_skolems: Vec<CaptureUnificationVar>,
    graph: ConstraintGraph,
    next_var: u32,
    next_capture_var: u32,
}

impl UnificationScope {
    pub fn new() -> Self {
        let id = ScopeId(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed));
        debug!(scope = id.0, "new unification scope");
        Self {
            id,
            skolems: Vec::new(),
            capture_skolems: Vec::new(),
            graph: ConstraintGraph::new(),
            next_var: 0,
            next_capture_var: 0,
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// The constraint graph. Read access for diagnostics and tests.
    pub fn graph(&self) -> &ConstraintGraph {
        &self.graph
    }

    /// Skolems allocated so far, in allocation order.
    pub fn skolems(&self) -> &[UnificationVar] {
        &self.skolems
    }

    /// Capture skolems allocated so far, in allocation order.
    pub fn capture_skolems(&self) -> &[CaptureUnificationVar] {
        &self.capture_skolems
    }

    /// Allocate a fresh unification variable.
    pub fn fresh(&mut self, role: VarRole) -> UnificationVar {
        let var = UnificationVar { id: self.next_var, scope: self.id, role };
        self.next_var += 1;
        self.skolems.push(var);
        trace!(var = %var, ?role, "fresh unification variable");
        var
    }

    /// Allocate a fresh capture unification variable.
    pub fn fresh_capture(&mut self, role: CaptureRole) -> CaptureUnificationVar {
        let var = CaptureUnificationVar { id: self.next_capture_var, scope: self.id, role };
        self.next_capture_var += 1;
        self.capture_skolems.push(var);
        trace!(var = %var, ?role, "fresh capture variable");
        var
    }

    /// Instantiate a function scheme: every bound type and capture
    /// parameter is replaced by a fresh variable.
    ///
    /// Returns the rigids in binder order together with the monomorphic
    /// instance.
    pub fn instantiate(
        &mut self,
        func: &FunctionType,
    ) -> Result<(Vec<UnificationVar>, Vec<CaptureUnificationVar>, FunctionType), TypeError> {
        let rigids: Vec<UnificationVar> = func
            .tparams
            .iter()
            .map(|p| self.fresh(VarRole::Instantiation(*p)))
            .collect();
        let capture_rigids: Vec<CaptureUnificationVar> = func
            .cparams
            .iter()
            .map(|c| self.fresh_capture(CaptureRole::Instantiation(*c)))
            .collect();

        let mut subst = Substitution::new();
        for (param, rigid) in func.tparams.iter().zip(&rigids) {
            subst.insert_type(*param, ValueType::Var(*rigid));
        }
        for (param, rigid) in func.cparams.iter().zip(&capture_rigids) {
            subst.insert_captures(*param, CaptureSet::var(*rigid));
        }

        let instance = FunctionType {
            tparams: Vec::new(),
            cparams: Vec::new(),
            vparams: func
                .vparams
                .iter()
                .map(|p| subst.apply_value(p))
                .collect::<Result<Vec<_>, _>>()?,
            bparams: func
                .bparams
                .iter()
                .map(|b| subst.apply_block(b))
                .collect::<Result<Vec<_>, _>>()?,
            result: subst.apply_value(&func.result)?,
            effects: subst.apply_effects(&func.effects)?,
        };
        debug!(
            scope = self.id.0,
            rigids = rigids.len(),
            capture_rigids = capture_rigids.len(),
            "instantiated function scheme"
        );
        Ok((rigids, capture_rigids, instance))
    }

    /// Assert `t1 <: t2`, recording constraints on any variables involved.
    pub fn require_subtype(&mut self, t1: &ValueType, t2: &ValueType) -> Result<(), TypeError> {
        trace!(%t1, %t2, "require subtype");
        self.unify_value_types(t1, t2)
    }

    /// Block types cannot yet be related through the public interface.
    pub fn require_subtype_blocks(
        &mut self,
        _b1: &BlockType,
        _b2: &BlockType,
    ) -> Result<(), TypeError> {
        Err(TypeError::UnsupportedBlockSubtyping)
    }

    /// Capture sets cannot yet be related through the public interface.
    pub fn require_subtype_captures(
        &mut self,
        _c1: &CaptureSet,
        _c2: &CaptureSet,
    ) -> Result<(), TypeError> {
        Err(TypeError::UnsupportedCaptureSubtyping)
    }

    /// Is `t1 <: t2` entailed by the constraints recorded so far?
    ///
    /// Read-only: the graph is never touched.
    pub fn is_subtype(&self, t1: &ValueType, t2: &ValueType) -> bool {
        SubtypeQuery { graph: &self.graph }.unify_value_types(t1, t2).is_ok()
    }

    /// Remove from `from` every effect that some member of `handled`
    /// already covers.
    pub fn subtract(&self, from: &EffectSet, handled: &EffectSet) -> EffectSet {
        from.iter()
            .filter(|e| !handled.iter().any(|h| self.effect_subsumes(h, e)))
            .cloned()
            .collect()
    }

    fn effect_subsumes(&self, sub: &Effect, sup: &Effect) -> bool {
        sub.interface == sup.interface
            && sub.args.len() == sup.args.len()
            && sub.args.iter().zip(&sup.args).all(|(a, b)| self.is_subtype(a, b))
    }

    /// Capture the full scope state.
    pub fn snapshot(&self) -> Snapshot {
        debug!(scope = self.id.0, vars = self.next_var, "snapshot");
        Snapshot {
            skolems: self.skolems.clone(),
            capture_skolems: self.capture_skolems.clone(),
            graph: self.graph.clone(),
            next_var: self.next_var,
            next_capture_var: self.next_capture_var,
        }
    }

    /// Rewind to a snapshot, discarding all constraints and variables
    /// allocated since it was taken.
    pub fn restore(&mut self, snapshot: Snapshot) {
        debug!(scope = self.id.0, vars = snapshot.next_var, "restore");
        self.skolems = snapshot.skolems;
        self.capture_skolems = snapshot.capture_skolems;
        self.graph = snapshot.graph;
        self.next_var = snapshot.next_var;
        self.next_capture_var = snapshot.next_capture_var;
    }

    /// Solve the residual constraints into a substitution.
    ///
    /// Bisubstitution solving is not implemented; callers currently read
    /// bounds off the graph directly.
    pub fn solve(&self) -> Substitution {
        Substitution::new()
    }

    // ------------------------------------------------------------
    // Graph-mutating comparison internals
    // ------------------------------------------------------------

    /// Merge `t` into the lower bound of `x`'s class and re-check the
    /// class's internal consistency.
    fn merge_lower_into(&mut self, x: UnificationVar, t: &ValueType) -> Result<(), TypeError> {
        let (lower, upper) = self.graph.bounds_for(x);
        let merged = self.merge(&lower, t, Polarity::Covariant)?;
        if merged != lower {
            trace!(var = %x, bound = %merged, "tighten lower bound");
            self.graph.update_lower_bound(x, merged.clone());
            self.unify_value_types(&merged, &upper)?;
        }
        Ok(())
    }

    /// Merge `t` into the upper bound of `x`'s class and re-check the
    /// class's internal consistency.
    fn merge_upper_into(&mut self, x: UnificationVar, t: &ValueType) -> Result<(), TypeError> {
        let (lower, upper) = self.graph.bounds_for(x);
        let merged = self.merge(&upper, t, Polarity::Contravariant)?;
        if merged != upper {
            trace!(var = %x, bound = %merged, "tighten upper bound");
            self.graph.update_upper_bound(x, merged.clone());
            self.unify_value_types(&lower, &merged)?;
        }
        Ok(())
    }

    /// Assert `x <: y` between two variables: exchange the classes' bounds,
    /// then add the edge.
    fn connect_nodes(&mut self, x: UnificationVar, y: UnificationVar) -> Result<(), TypeError> {
        if self.graph.is_subtype(x, y) {
            return Ok(());
        }
        let lower = self.graph.lower_bound(x);
        self.require_lower_bound(y, &lower)?;
        let upper = self.graph.upper_bound(y);
        self.require_upper_bound(x, &upper)?;
        self.graph.connect(x, y);
        Ok(())
    }

    /// Compute the join (covariant), meet (contravariant) or unification
    /// (invariant) of two types.
    ///
    /// Payload bounds are never variables, so variables only show up here
    /// through the invariant recursion into constructor arguments; those
    /// cases connect the variables instead of building structure.
    fn merge(
        &mut self,
        old: &ValueType,
        new: &ValueType,
        polarity: Polarity,
    ) -> Result<ValueType, TypeError> {
        if old == new {
            return Ok(old.clone());
        }
        match polarity {
            Polarity::Covariant => {
                if *old == ValueType::Bottom {
                    return Ok(new.clone());
                }
                if *new == ValueType::Bottom {
                    return Ok(old.clone());
                }
            }
            Polarity::Contravariant => {
                if *old == ValueType::Top {
                    return Ok(new.clone());
                }
                if *new == ValueType::Top {
                    return Ok(old.clone());
                }
            }
            Polarity::Invariant => {}
        }
        match polarity {
            Polarity::Covariant => {
                if self.is_subtype(old, new) {
                    return Ok(new.clone());
                }
                if self.is_subtype(new, old) {
                    return Ok(old.clone());
                }
            }
            Polarity::Contravariant => {
                if self.is_subtype(old, new) {
                    return Ok(old.clone());
                }
                if self.is_subtype(new, old) {
                    return Ok(new.clone());
                }
            }
            Polarity::Invariant => {
                if self.is_subtype(old, new) && self.is_subtype(new, old) {
                    return Ok(old.clone());
                }
            }
        }
        match (old, new) {
            (ValueType::Var(x), ValueType::Var(y)) => {
                let (x, y) = (*x, *y);
                match polarity {
                    Polarity::Covariant => {
                        let m = self.fresh(VarRole::Merge);
                        self.connect_nodes(x, m)?;
                        self.connect_nodes(y, m)?;
                        Ok(ValueType::Var(m))
                    }
                    Polarity::Contravariant => {
                        let m = self.fresh(VarRole::Merge);
                        self.connect_nodes(m, x)?;
                        self.connect_nodes(m, y)?;
                        Ok(ValueType::Var(m))
                    }
                    Polarity::Invariant => {
                        self.connect_nodes(x, y)?;
                        self.connect_nodes(y, x)?;
                        Ok(ValueType::Var(x))
                    }
                }
            }
            (ValueType::Var(x), other) | (other, ValueType::Var(x)) => {
                let x = *x;
                match polarity {
                    Polarity::Covariant => {
                        let m = self.fresh(VarRole::Merge);
                        self.connect_nodes(x, m)?;
                        self.require_lower_bound(m, other)?;
                        Ok(ValueType::Var(m))
                    }
                    Polarity::Contravariant => {
                        let m = self.fresh(VarRole::Merge);
                        self.connect_nodes(m, x)?;
                        self.require_upper_bound(m, other)?;
                        Ok(ValueType::Var(m))
                    }
                    Polarity::Invariant => {
                        self.require_lower_bound(x, other)?;
                        self.require_upper_bound(x, other)?;
                        Ok(other.clone())
                    }
                }
            }
            (ValueType::App(c1, args1), ValueType::App(c2, args2))
                if c1 == c2 && args1.len() == args2.len() =>
            {
                let args = args1
                    .iter()
                    .zip(args2)
                    .map(|(a1, a2)| self.merge(a1, a2, Polarity::Invariant))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ValueType::App(*c1, args))
            }
            _ => Err(TypeError::MergeImpossible {
                left: old.clone(),
                right: new.clone(),
                polarity,
            }),
        }
    }
}

impl Default for UnificationScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeComparer for UnificationScope {
    fn require_lower_bound(&mut self, x: UnificationVar, t: &ValueType) -> Result<(), TypeError> {
        if let ValueType::Var(y) = t {
            return self.connect_nodes(*y, x);
        }
        self.merge_lower_into(x, t)?;
        // The closure is materialized, so one hop reaches every class that
        // must learn the new bound.
        for rep in self.graph.upper_class_reps(x) {
            self.merge_lower_into(rep, t)?;
        }
        Ok(())
    }

    fn require_upper_bound(&mut self, x: UnificationVar, t: &ValueType) -> Result<(), TypeError> {
        if let ValueType::Var(y) = t {
            return self.connect_nodes(x, *y);
        }
        self.merge_upper_into(x, t)?;
        for rep in self.graph.lower_class_reps(x) {
            self.merge_upper_into(rep, t)?;
        }
        Ok(())
    }

    fn unify_captures(&mut self, c1: &CaptureSet, c2: &CaptureSet) -> Result<(), TypeError> {
        if c1 == c2 {
            return Ok(());
        }
        // Obligations involving capture variables are deferred to the
        // substitution pass; concrete sets must be included outright.
        if c1.has_variables() || c2.has_variables() {
            return Ok(());
        }
        if c1.is_subset(c2) {
            Ok(())
        } else {
            Err(TypeError::CaptureMismatch { expected: c2.clone(), found: c1.clone() })
        }
    }
}
