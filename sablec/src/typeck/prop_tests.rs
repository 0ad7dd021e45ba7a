//! Property tests for the solver using proptest.
//!
//! These stress invariants that must hold for ANY input, not just
//! hand-picked examples:
//!
//! 1. Reflexivity: `require_subtype(t, t)` succeeds and never mutates
//! 2. Top/Bottom absorption: obligations against the extremes are no-ops
//! 3. Graph invariants survive arbitrary constraint sequences
//! 4. Snapshot/restore rewinds any sequence of operations exactly
//! 5. Substitution sequential composition is associative on closed types
//! 6. Lower bounds only ever grow upward

use proptest::prelude::*;

use crate::subst::Substitution;
use crate::types::{Names, TypeCtor, TypeParamId, ValueType, VarRole};

use super::scope::UnificationScope;

/// Deterministic constructor pool: interning order fixes the symbols, so
/// every call yields the same identifiers.
fn ctors() -> [TypeCtor; 3] {
    let mut names = Names::new();
    [names.type_ctor("Int"), names.type_ctor("String"), names.type_ctor("List")]
}

fn arb_ground_type(depth: u32) -> BoxedStrategy<ValueType> {
    let [int, string, list] = ctors();
    let leaf = prop_oneof![
        Just(ValueType::nullary(int)),
        Just(ValueType::nullary(string)),
        Just(ValueType::Top),
        Just(ValueType::Bottom),
    ];
    if depth == 0 {
        leaf.boxed()
    } else {
        let inner = arb_ground_type(depth - 1);
        prop_oneof![
            3 => leaf,
            2 => inner.prop_map(move |t| ValueType::App(list, vec![t])),
        ]
        .boxed()
    }
}

/// A constraint between two of a small pool of variables, or a ground
/// bound on one of them.
#[derive(Debug, Clone)]
enum Op {
    Connect(usize, usize),
    Lower(usize, ValueType),
    Upper(usize, ValueType),
}

fn arb_op(vars: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..vars, 0..vars).prop_map(|(a, b)| Op::Connect(a, b)),
        1 => (0..vars, arb_ground_type(1)).prop_map(|(a, t)| Op::Lower(a, t)),
        1 => (0..vars, arb_ground_type(1)).prop_map(|(a, t)| Op::Upper(a, t)),
    ]
}

fn apply_op(scope: &mut UnificationScope, vars: &[crate::types::UnificationVar], op: &Op) {
    // Individual obligations may fail (e.g. Int against String); state up
    // to the failure still has to satisfy every invariant.
    let _ = match op {
        Op::Connect(a, b) => {
            scope.require_subtype(&ValueType::Var(vars[*a]), &ValueType::Var(vars[*b]))
        }
        Op::Lower(a, t) => scope.require_subtype(t, &ValueType::Var(vars[*a])),
        Op::Upper(a, t) => scope.require_subtype(&ValueType::Var(vars[*a]), t),
    };
}

proptest! {
    #[test]
    fn prop_reflexivity(t in arb_ground_type(2)) {
        let mut scope = UnificationScope::new();
        let before = scope.graph().clone();
        prop_assert!(scope.require_subtype(&t, &t).is_ok());
        prop_assert_eq!(scope.graph(), &before);
    }

    #[test]
    fn prop_extremes_absorb(t in arb_ground_type(2)) {
        let mut scope = UnificationScope::new();
        let before = scope.graph().clone();
        prop_assert!(scope.require_subtype(&t, &ValueType::Top).is_ok());
        prop_assert!(scope.require_subtype(&ValueType::Bottom, &t).is_ok());
        prop_assert_eq!(scope.graph(), &before);
    }

    #[test]
    fn prop_invariants_survive_constraints(ops in prop::collection::vec(arb_op(6), 0..24)) {
        let mut scope = UnificationScope::new();
        let vars: Vec<_> = (0..6).map(|_| scope.fresh(VarRole::InferredArgument)).collect();
        for op in &ops {
            apply_op(&mut scope, &vars, op);
        }
        scope.graph().assert_invariants();
    }

    #[test]
    fn prop_snapshot_rewinds_exactly(
        prefix in prop::collection::vec(arb_op(4), 0..8),
        suffix in prop::collection::vec(arb_op(4), 0..12),
    ) {
        let mut scope = UnificationScope::new();
        let vars: Vec<_> = (0..4).map(|_| scope.fresh(VarRole::InferredArgument)).collect();
        for op in &prefix {
            apply_op(&mut scope, &vars, op);
        }

        let saved = scope.snapshot();
        let graph_before = scope.graph().clone();
        let skolems_before = scope.skolems().to_vec();

        for op in &suffix {
            apply_op(&mut scope, &vars, op);
        }
        let _ = scope.fresh(VarRole::InferredReturn);

        scope.restore(saved);
        prop_assert_eq!(scope.graph(), &graph_before);
        prop_assert_eq!(scope.skolems(), skolems_before.as_slice());
    }

    #[test]
    fn prop_compose_seq_associative(
        a in prop::collection::vec((0u32..4, arb_ground_type(1)), 0..4),
        b in prop::collection::vec((4u32..8, arb_ground_type(1)), 0..4),
        c in prop::collection::vec((8u32..12, arb_ground_type(1)), 0..4),
        probe in arb_ground_type(2),
    ) {
        let build = |pairs: &[(u32, ValueType)]| {
            let mut subst = Substitution::new();
            for (param, ty) in pairs {
                subst.insert_type(TypeParamId(*param), ty.clone());
            }
            subst
        };
        let (a, b, c) = (build(&a), build(&b), build(&c));

        let left = a.compose_seq(&b).unwrap().compose_seq(&c).unwrap();
        let right = a.compose_seq(&b.compose_seq(&c).unwrap()).unwrap();
        prop_assert_eq!(
            left.apply_value(&probe).unwrap(),
            right.apply_value(&probe).unwrap()
        );
        for param in 0..12 {
            let probe = ValueType::Param(TypeParamId(param));
            prop_assert_eq!(
                left.apply_value(&probe).unwrap(),
                right.apply_value(&probe).unwrap()
            );
        }
    }

    #[test]
    fn prop_lower_bounds_grow_upward(bounds in prop::collection::vec(arb_ground_type(1), 1..5)) {
        let mut scope = UnificationScope::new();
        let x = scope.fresh(VarRole::InferredArgument);

        let mut accepted = Vec::new();
        for t in &bounds {
            if scope.require_subtype(t, &ValueType::Var(x)).is_ok() {
                accepted.push(t.clone());
            } else {
                break;
            }
        }

        // Every accepted bound is entailed below the final lower bound.
        for t in &accepted {
            prop_assert!(scope.is_subtype(t, &ValueType::Var(x)));
        }
        scope.graph().assert_invariants();
    }
}
