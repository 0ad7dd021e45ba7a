//! Substitutions over types and capture sets.
//!
//! A substitution is an immutable pair of maps from bound type parameters
//! to value types and from bound capture parameters to capture sets. It is
//! built during scheme instantiation and alpha-renaming and applied
//! structurally; function types shadow their own binders before their
//! components are rewritten.

use std::collections::HashMap;

use crate::captures::{Capture, CaptureSet};
use crate::effects::{Effect, EffectSet};
use crate::typeck::TypeError;
use crate::types::{BlockType, CaptureParamId, FunctionType, InterfaceType, TypeParamId, ValueType};

/// A mapping from bound type/capture parameters to types/capture sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    types: HashMap<TypeParamId, ValueType>,
    captures: HashMap<CaptureParamId, CaptureSet>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_type(&mut self, param: TypeParamId, ty: ValueType) {
        self.types.insert(param, ty);
    }

    pub fn insert_captures(&mut self, param: CaptureParamId, captures: CaptureSet) {
        self.captures.insert(param, captures);
    }

    pub fn get_type(&self, param: TypeParamId) -> Option<&ValueType> {
        self.types.get(&param)
    }

    pub fn get_captures(&self, param: CaptureParamId) -> Option<&CaptureSet> {
        self.captures.get(&param)
    }

    pub fn is_defined_at_type(&self, param: TypeParamId) -> bool {
        self.types.contains_key(&param)
    }

    pub fn is_defined_at_capture(&self, param: CaptureParamId) -> bool {
        self.captures.contains_key(&param)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.captures.is_empty()
    }

    /// Substitute in a value type.
    pub fn apply_value(&self, ty: &ValueType) -> Result<ValueType, TypeError> {
        match ty {
            ValueType::App(ctor, args) => {
                let args = args
                    .iter()
                    .map(|a| self.apply_value(a))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ValueType::App(*ctor, args))
            }
            ValueType::Boxed(block, captures) => Ok(ValueType::Boxed(
                Box::new(self.apply_block(block)?),
                self.apply_captures(captures)?,
            )),
            ValueType::Param(p) => Ok(self.types.get(p).cloned().unwrap_or_else(|| ty.clone())),
            ValueType::Var(_) | ValueType::Top | ValueType::Bottom => Ok(ty.clone()),
        }
    }

    /// Substitute in a block type.
    pub fn apply_block(&self, block: &BlockType) -> Result<BlockType, TypeError> {
        match block {
            BlockType::Interface(i) => Ok(BlockType::Interface(self.apply_interface(i)?)),
            BlockType::Function(f) => Ok(BlockType::Function(self.apply_function(f)?)),
        }
    }

    /// Substitute in an interface type.
    pub fn apply_interface(&self, iface: &InterfaceType) -> Result<InterfaceType, TypeError> {
        let args = iface
            .args
            .iter()
            .map(|a| self.apply_value(a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(InterfaceType { interface: iface.interface, args })
    }

    /// Substitute in a function type, shadowing its own binders.
    pub fn apply_function(&self, func: &FunctionType) -> Result<FunctionType, TypeError> {
        let shadowed = self.without_binders(&func.tparams, &func.cparams);
        Ok(FunctionType {
            tparams: func.tparams.clone(),
            cparams: func.cparams.clone(),
            vparams: func
                .vparams
                .iter()
                .map(|p| shadowed.apply_value(p))
                .collect::<Result<Vec<_>, _>>()?,
            bparams: func
                .bparams
                .iter()
                .map(|b| shadowed.apply_block(b))
                .collect::<Result<Vec<_>, _>>()?,
            result: shadowed.apply_value(&func.result)?,
            effects: shadowed.apply_effects(&func.effects)?,
        })
    }

    /// Substitute in a single effect.
    pub fn apply_effect(&self, effect: &Effect) -> Result<Effect, TypeError> {
        let args = effect
            .args
            .iter()
            .map(|a| self.apply_value(a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Effect { interface: effect.interface, args })
    }

    /// Substitute in an effect set.
    pub fn apply_effects(&self, effects: &EffectSet) -> Result<EffectSet, TypeError> {
        effects.iter().map(|e| self.apply_effect(e)).collect()
    }

    /// Substitute in a capture set.
    ///
    /// Capture unification variables are opaque to substitution: hitting one
    /// while this substitution binds concrete captures means instantiation
    /// state and inference state got mixed up in the caller.
    pub fn apply_captures(&self, captures: &CaptureSet) -> Result<CaptureSet, TypeError> {
        let mut out = CaptureSet::empty();
        for capture in captures.iter() {
            match capture {
                Capture::Param(p) => match self.captures.get(p) {
                    Some(set) => out.extend(set),
                    None => out.insert(*capture),
                },
                Capture::Var(v) => {
                    if !self.captures.is_empty() {
                        return Err(TypeError::SubstitutionConflict {
                            var: *v,
                            domain: self.capture_domain(),
                        });
                    }
                    out.insert(*capture);
                }
                Capture::Capability(_) => out.insert(*capture),
            }
        }
        Ok(out)
    }

    /// Sequential composition: first `self`, then `other`.
    ///
    /// `other` is applied to every value of `self`, then entries of `other`
    /// override on key collisions.
    pub fn compose_seq(&self, other: &Substitution) -> Result<Substitution, TypeError> {
        let mut types = HashMap::with_capacity(self.types.len() + other.types.len());
        for (param, ty) in &self.types {
            types.insert(*param, other.apply_value(ty)?);
        }
        for (param, ty) in &other.types {
            types.insert(*param, ty.clone());
        }
        let mut captures = HashMap::with_capacity(self.captures.len() + other.captures.len());
        for (param, set) in &self.captures {
            captures.insert(*param, other.apply_captures(set)?);
        }
        for (param, set) in &other.captures {
            captures.insert(*param, set.clone());
        }
        Ok(Substitution { types, captures })
    }

    /// Parallel composition: map union, `other` overriding on collisions.
    pub fn compose_parallel(&self, other: &Substitution) -> Substitution {
        let mut types = self.types.clone();
        types.extend(other.types.iter().map(|(k, v)| (*k, v.clone())));
        let mut captures = self.captures.clone();
        captures.extend(other.captures.iter().map(|(k, v)| (*k, v.clone())));
        Substitution { types, captures }
    }

    fn without_binders(&self, tparams: &[TypeParamId], cparams: &[CaptureParamId]) -> Substitution {
        Substitution {
            types: self
                .types
                .iter()
                .filter(|(k, _)| !tparams.contains(k))
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
            captures: self
                .captures
                .iter()
                .filter(|(k, _)| !cparams.contains(k))
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
        }
    }

    fn capture_domain(&self) -> CaptureSet {
        self.captures.keys().map(|p| Capture::Param(*p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaptureRole, CaptureUnificationVar, Names, ScopeId};

    fn int(names: &mut Names) -> ValueType {
        ValueType::nullary(names.type_ctor("Int"))
    }

    // ============================================================
    // Application
    // ============================================================

    #[test]
    fn test_apply_substitutes_param() {
        let mut names = Names::new();
        let int = int(&mut names);
        let mut subst = Substitution::new();
        subst.insert_type(TypeParamId(0), int.clone());

        let applied = subst.apply_value(&ValueType::Param(TypeParamId(0))).unwrap();
        assert_eq!(applied, int);

        // Unmapped parameters stay put.
        let other = subst.apply_value(&ValueType::Param(TypeParamId(1))).unwrap();
        assert_eq!(other, ValueType::Param(TypeParamId(1)));
    }

    #[test]
    fn test_apply_recurses_into_applications() {
        let mut names = Names::new();
        let list = names.type_ctor("List");
        let int = ValueType::nullary(names.type_ctor("Int"));
        let mut subst = Substitution::new();
        subst.insert_type(TypeParamId(0), int.clone());

        let nested = ValueType::App(list, vec![ValueType::Param(TypeParamId(0))]);
        let applied = subst.apply_value(&nested).unwrap();
        assert_eq!(applied, ValueType::App(list, vec![int]));
    }

    #[test]
    fn test_function_type_shadows_own_binders() {
        let mut names = Names::new();
        let int = int(&mut names);
        let mut subst = Substitution::new();
        subst.insert_type(TypeParamId(0), int.clone());

        // forall T0. (T0) -> T0 : the binder shadows the substitution.
        let ft = FunctionType {
            tparams: vec![TypeParamId(0)],
            cparams: Vec::new(),
            vparams: vec![ValueType::Param(TypeParamId(0))],
            bparams: Vec::new(),
            result: ValueType::Param(TypeParamId(0)),
            effects: EffectSet::pure(),
        };
        let applied = subst.apply_function(&ft).unwrap();
        assert_eq!(applied, ft);
    }

    #[test]
    fn test_capture_substitution() {
        let mut subst = Substitution::new();
        let replacement = CaptureSet::param(CaptureParamId(5));
        subst.insert_captures(CaptureParamId(0), replacement.clone());

        let applied = subst.apply_captures(&CaptureSet::param(CaptureParamId(0))).unwrap();
        assert_eq!(applied, replacement);
    }

    #[test]
    fn test_capture_var_conflict() {
        let var = CaptureUnificationVar {
            id: 0,
            scope: ScopeId(0),
            role: CaptureRole::InferredRegion,
        };
        let mut subst = Substitution::new();
        subst.insert_captures(CaptureParamId(0), CaptureSet::empty());

        let err = subst.apply_captures(&CaptureSet::var(var)).unwrap_err();
        assert!(matches!(err, TypeError::SubstitutionConflict { .. }));

        // With an empty capture domain the variable passes through.
        let empty = Substitution::new();
        let passed = empty.apply_captures(&CaptureSet::var(var)).unwrap();
        assert_eq!(passed, CaptureSet::var(var));
    }

    // ============================================================
    // Composition
    // ============================================================

    #[test]
    fn test_compose_seq_applies_then_overrides() {
        let mut names = Names::new();
        let int = int(&mut names);

        // a: T0 -> T1, b: T1 -> Int.  a . b maps T0 to Int.
        let mut a = Substitution::new();
        a.insert_type(TypeParamId(0), ValueType::Param(TypeParamId(1)));
        let mut b = Substitution::new();
        b.insert_type(TypeParamId(1), int.clone());

        let ab = a.compose_seq(&b).unwrap();
        assert_eq!(ab.get_type(TypeParamId(0)), Some(&int));
        assert_eq!(ab.get_type(TypeParamId(1)), Some(&int));
    }

    #[test]
    fn test_compose_parallel_overrides() {
        let mut names = Names::new();
        let int = int(&mut names);
        let string = ValueType::nullary(names.type_ctor("String"));

        let mut a = Substitution::new();
        a.insert_type(TypeParamId(0), int);
        let mut b = Substitution::new();
        b.insert_type(TypeParamId(0), string.clone());

        let ab = a.compose_parallel(&b);
        assert_eq!(ab.get_type(TypeParamId(0)), Some(&string));
    }

    #[test]
    fn test_compose_seq_associative() {
        let mut names = Names::new();
        let int = int(&mut names);

        let mut a = Substitution::new();
        a.insert_type(TypeParamId(0), ValueType::Param(TypeParamId(1)));
        let mut b = Substitution::new();
        b.insert_type(TypeParamId(1), ValueType::Param(TypeParamId(2)));
        let mut c = Substitution::new();
        c.insert_type(TypeParamId(2), int);

        let left = a.compose_seq(&b).unwrap().compose_seq(&c).unwrap();
        let right = a.compose_seq(&b.compose_seq(&c).unwrap()).unwrap();
        let probe = ValueType::Param(TypeParamId(0));
        assert_eq!(left.apply_value(&probe).unwrap(), right.apply_value(&probe).unwrap());
    }
}
