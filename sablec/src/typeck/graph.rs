//! Bounded-type constraint graph.
//!
//! Each node of the graph is an *equivalence class* of unification
//! variables assumed equal, carrying the best-known lower and upper value
//! type for that class. Variable-to-variable subtype assumptions are edges
//! between nodes; variable-to-type assumptions live in the payloads.
//!
//! Two structural rules govern every mutation:
//!
//! - **Directness.** The transitive closure of the `upper`/`lower`
//!   relations is materialized: if any path runs from `A` up to `B`, then
//!   `B` sits in `A`'s immediate upper set. A subtype query is therefore a
//!   single set lookup. Edge insertion pays for this with proportional
//!   work, which matches the access pattern (few edges, many queries).
//! - **Acyclicity mod collapse.** The relations never contain a cycle; the
//!   moment a mutation would close one, every class on the cycle is merged
//!   into a single node.
//!
//! Nodes live in an arena keyed by opaque [`NodeId`] handles; classes never
//! own each other.

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use crate::types::{UnificationVar, ValueType};

/// Opaque handle of an equivalence-class node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Payload and neighbourhood of one equivalence class.
#[derive(Debug, Clone, PartialEq)]
struct Node {
    /// The variables assumed equal to each other.
    members: BTreeSet<UnificationVar>,
    /// Best known lower bound. Never a unification variable.
    lower: ValueType,
    /// Best known upper bound. Never a unification variable.
    upper: ValueType,
    /// Lower neighbours, transitively closed.
    lower_nodes: BTreeSet<NodeId>,
    /// Upper neighbours, transitively closed.
    upper_nodes: BTreeSet<NodeId>,
}

impl Node {
    fn fresh(var: UnificationVar) -> Self {
        Self {
            members: BTreeSet::from([var]),
            lower: ValueType::Bottom,
            upper: ValueType::Top,
            lower_nodes: BTreeSet::new(),
            upper_nodes: BTreeSet::new(),
        }
    }
}

/// A mutable directed graph of unification-variable equivalence classes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintGraph {
    /// Representative node of every variable seen so far.
    reps: HashMap<UnificationVar, NodeId>,
    /// Node arena. Entries are removed when classes merge.
    nodes: HashMap<NodeId, Node>,
    next_node: u32,
}

impl ConstraintGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(&id).expect("constraint graph node handle is stale")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes.get_mut(&id).expect("constraint graph node handle is stale")
    }

    fn node_id(&mut self, var: UnificationVar) -> NodeId {
        if let Some(id) = self.reps.get(&var) {
            return *id;
        }
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, Node::fresh(var));
        self.reps.insert(var, id);
        id
    }

    /// Bounds of `x`, materializing its node on first access.
    pub fn bounds_for(&mut self, x: UnificationVar) -> (ValueType, ValueType) {
        let id = self.node_id(x);
        let node = self.node(id);
        (node.lower.clone(), node.upper.clone())
    }

    /// Current lower bound; `Bottom` if `x` was never constrained.
    pub fn lower_bound(&self, x: UnificationVar) -> ValueType {
        match self.reps.get(&x) {
            Some(id) => self.node(*id).lower.clone(),
            None => ValueType::Bottom,
        }
    }

    /// Current upper bound; `Top` if `x` was never constrained.
    pub fn upper_bound(&self, x: UnificationVar) -> ValueType {
        match self.reps.get(&x) {
            Some(id) => self.node(*id).upper.clone(),
            None => ValueType::Top,
        }
    }

    /// Every variable of every lower neighbour class, excluding `x`'s own
    /// class.
    pub fn lower_variables(&self, x: UnificationVar) -> BTreeSet<UnificationVar> {
        self.neighbour_variables(x, |node| &node.lower_nodes)
    }

    /// Every variable of every upper neighbour class, excluding `x`'s own
    /// class.
    pub fn upper_variables(&self, x: UnificationVar) -> BTreeSet<UnificationVar> {
        self.neighbour_variables(x, |node| &node.upper_nodes)
    }

    fn neighbour_variables(
        &self,
        x: UnificationVar,
        side: impl Fn(&Node) -> &BTreeSet<NodeId>,
    ) -> BTreeSet<UnificationVar> {
        let Some(id) = self.reps.get(&x) else {
            return BTreeSet::new();
        };
        side(self.node(*id))
            .iter()
            .flat_map(|n| self.node(*n).members.iter().copied())
            .collect()
    }

    /// One representative variable per upper neighbour class.
    pub(crate) fn upper_class_reps(&self, x: UnificationVar) -> Vec<UnificationVar> {
        self.class_reps(x, |node| &node.upper_nodes)
    }

    /// One representative variable per lower neighbour class.
    pub(crate) fn lower_class_reps(&self, x: UnificationVar) -> Vec<UnificationVar> {
        self.class_reps(x, |node| &node.lower_nodes)
    }

    fn class_reps(
        &self,
        x: UnificationVar,
        side: impl Fn(&Node) -> &BTreeSet<NodeId>,
    ) -> Vec<UnificationVar> {
        let Some(id) = self.reps.get(&x) else {
            return Vec::new();
        };
        side(self.node(*id))
            .iter()
            .filter_map(|n| self.node(*n).members.iter().next().copied())
            .collect()
    }

    /// Replace the lower-bound payload of `x`'s class.
    ///
    /// `t` must not be a unification variable; variable relations are edges.
    pub fn update_lower_bound(&mut self, x: UnificationVar, t: ValueType) {
        assert!(!t.is_var(), "constraint graph payloads must not be unification variables");
        let id = self.node_id(x);
        self.node_mut(id).lower = t;
    }

    /// Replace the upper-bound payload of `x`'s class.
    ///
    /// `t` must not be a unification variable; variable relations are edges.
    pub fn update_upper_bound(&mut self, x: UnificationVar, t: ValueType) {
        assert!(!t.is_var(), "constraint graph payloads must not be unification variables");
        let id = self.node_id(x);
        self.node_mut(id).upper = t;
    }

    /// Is `x <: y` recorded? Sharing a class counts as yes.
    pub fn is_subtype(&self, x: UnificationVar, y: UnificationVar) -> bool {
        match (self.reps.get(&x), self.reps.get(&y)) {
            (Some(rx), Some(ry)) => rx == ry || self.node(*rx).upper_nodes.contains(ry),
            _ => x == y,
        }
    }

    /// Is `x :> y` recorded? Sharing a class counts as yes.
    pub fn is_supertype(&self, x: UnificationVar, y: UnificationVar) -> bool {
        self.is_subtype(y, x)
    }

    /// Do `x` and `y` share an equivalence class?
    pub fn is_equal(&self, x: UnificationVar, y: UnificationVar) -> bool {
        match (self.reps.get(&x), self.reps.get(&y)) {
            (Some(rx), Some(ry)) => rx == ry,
            _ => x == y,
        }
    }

    /// Assert `x <: y` at the graph level.
    ///
    /// Already-known relations are no-ops. Closing a cycle collapses every
    /// class on it into `y`'s node. Otherwise the edge is inserted and the
    /// transitive closure re-materialized on both sides.
    ///
    /// Callers are expected to have exchanged the two classes' bounds
    /// beforehand (the solver's `connect_nodes` does); the graph itself only
    /// moves payloads during a collapse, keeping the informative bound of
    /// each pair.
    pub fn connect(&mut self, x: UnificationVar, y: UnificationVar) {
        let rx = self.node_id(x);
        let ry = self.node_id(y);
        if rx == ry || self.node(rx).upper_nodes.contains(&ry) {
            return;
        }
        if self.node(ry).upper_nodes.contains(&rx) {
            // `y <: x` is already known: the new edge closes a cycle. All
            // classes between the two endpoints participate.
            let mut doomed: BTreeSet<NodeId> = self
                .node(ry)
                .upper_nodes
                .intersection(&self.node(rx).lower_nodes)
                .copied()
                .collect();
            doomed.insert(rx);
            trace!(%x, %y, classes = doomed.len() + 1, "collapsing constraint cycle");
            self.collapse_into(ry, doomed);
            return;
        }

        // New edge. Every class at or below `x` learns every class at or
        // above `y`, which keeps Directness a local property.
        let mut lowers: BTreeSet<NodeId> = self.node(rx).lower_nodes.clone();
        lowers.insert(rx);
        let mut uppers: BTreeSet<NodeId> = self.node(ry).upper_nodes.clone();
        uppers.insert(ry);
        for &a in &lowers {
            let node = self.node_mut(a);
            node.upper_nodes.extend(uppers.iter().copied());
            node.upper_nodes.remove(&a);
        }
        for &b in &uppers {
            let node = self.node_mut(b);
            node.lower_nodes.extend(lowers.iter().copied());
            node.lower_nodes.remove(&b);
        }
        trace!(%x, %y, "connect");
    }

    /// Merge every class in `doomed` into `target`, rewriting all
    /// references so `doomed` handles disappear from the graph.
    fn collapse_into(&mut self, target: NodeId, doomed: BTreeSet<NodeId>) {
        let mut merged = self.nodes.remove(&target).expect("collapse target is stale");
        for id in &doomed {
            let node = self.nodes.remove(id).expect("collapse participant is stale");
            merged.members.extend(node.members);
            // Participants have exchanged bounds through propagation, so
            // any disagreement left is one side still sitting at a default.
            merged.lower = keep_informative(merged.lower, node.lower, &ValueType::Bottom);
            merged.upper = keep_informative(merged.upper, node.upper, &ValueType::Top);
            merged.lower_nodes.extend(node.lower_nodes);
            merged.upper_nodes.extend(node.upper_nodes);
        }
        merged.lower_nodes.remove(&target);
        merged.upper_nodes.remove(&target);
        for id in &doomed {
            merged.lower_nodes.remove(id);
            merged.upper_nodes.remove(id);
        }
        for var in &merged.members {
            self.reps.insert(*var, target);
        }
        for node in self.nodes.values_mut() {
            rewrite_refs(&mut node.lower_nodes, &doomed, target);
            rewrite_refs(&mut node.upper_nodes, &doomed, target);
        }
        self.nodes.insert(target, merged);
    }

    /// Panic unless every structural invariant holds. Test support.
    pub fn assert_invariants(&self) {
        for (var, id) in &self.reps {
            let node = self.node(*id);
            assert!(node.members.contains(var), "representative map points outside the class");
        }
        for (id, node) in &self.nodes {
            assert!(!node.members.is_empty(), "empty equivalence class");
            assert!(!node.lower.is_var(), "lower payload is a unification variable");
            assert!(!node.upper.is_var(), "upper payload is a unification variable");
            assert!(!node.lower_nodes.contains(id), "node is its own lower neighbour");
            assert!(!node.upper_nodes.contains(id), "node is its own upper neighbour");
            for up in &node.upper_nodes {
                let upper = self.node(*up);
                assert!(upper.lower_nodes.contains(id), "edge is not recorded on both sides");
                for transitive in &upper.upper_nodes {
                    assert!(
                        node.upper_nodes.contains(transitive),
                        "transitive upper edge is not materialized"
                    );
                }
            }
            for down in &node.lower_nodes {
                assert!(
                    self.node(*down).upper_nodes.contains(id),
                    "edge is not recorded on both sides"
                );
            }
        }
    }
}

fn keep_informative(current: ValueType, incoming: ValueType, default: &ValueType) -> ValueType {
    if incoming == *default {
        current
    } else {
        incoming
    }
}

fn rewrite_refs(set: &mut BTreeSet<NodeId>, doomed: &BTreeSet<NodeId>, target: NodeId) {
    if doomed.iter().any(|d| set.contains(d)) {
        for d in doomed {
            set.remove(d);
        }
        set.insert(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Names, ScopeId, VarRole};

    fn var(id: u32) -> UnificationVar {
        UnificationVar { id, scope: ScopeId(900), role: VarRole::InferredArgument }
    }

    fn int() -> ValueType {
        let mut names = Names::new();
        ValueType::nullary(names.type_ctor("Int"))
    }

    // ============================================================
    // Bounds
    // ============================================================

    #[test]
    fn test_unconstrained_bounds() {
        let mut graph = ConstraintGraph::new();
        assert_eq!(graph.bounds_for(var(0)), (ValueType::Bottom, ValueType::Top));
        assert_eq!(graph.lower_bound(var(1)), ValueType::Bottom);
        assert_eq!(graph.upper_bound(var(1)), ValueType::Top);
    }

    #[test]
    fn test_update_bounds() {
        let mut graph = ConstraintGraph::new();
        graph.update_lower_bound(var(0), int());
        assert_eq!(graph.lower_bound(var(0)), int());
        assert_eq!(graph.upper_bound(var(0)), ValueType::Top);
        graph.assert_invariants();
    }

    #[test]
    #[should_panic(expected = "must not be unification variables")]
    fn test_variable_payload_rejected() {
        let mut graph = ConstraintGraph::new();
        graph.update_lower_bound(var(0), ValueType::Var(var(1)));
    }

    // ============================================================
    // Edges and closure
    // ============================================================

    #[test]
    fn test_connect_records_subtype() {
        let mut graph = ConstraintGraph::new();
        graph.connect(var(0), var(1));
        assert!(graph.is_subtype(var(0), var(1)));
        assert!(graph.is_supertype(var(1), var(0)));
        assert!(!graph.is_subtype(var(1), var(0)));
        graph.assert_invariants();
    }

    #[test]
    fn test_transitive_closure_is_materialized() {
        let mut graph = ConstraintGraph::new();
        graph.connect(var(0), var(1));
        graph.connect(var(1), var(2));
        assert!(graph.is_subtype(var(0), var(2)));
        assert!(graph.upper_variables(var(0)).contains(&var(2)));
        assert!(graph.lower_variables(var(2)).contains(&var(0)));
        graph.assert_invariants();
    }

    #[test]
    fn test_closure_updates_existing_lowers() {
        let mut graph = ConstraintGraph::new();
        // a <: x first, then x <: y: a must learn about y.
        graph.connect(var(10), var(0));
        graph.connect(var(0), var(1));
        assert!(graph.is_subtype(var(10), var(1)));
        graph.assert_invariants();
    }

    #[test]
    fn test_neighbour_sets_are_strict() {
        let mut graph = ConstraintGraph::new();
        graph.connect(var(0), var(1));
        assert!(!graph.upper_variables(var(0)).contains(&var(0)));
        assert!(!graph.lower_variables(var(1)).contains(&var(1)));
    }

    // ============================================================
    // Cycle collapse
    // ============================================================

    #[test]
    fn test_two_cycle_collapses() {
        let mut graph = ConstraintGraph::new();
        graph.connect(var(0), var(1));
        graph.connect(var(1), var(0));
        assert!(graph.is_equal(var(0), var(1)));
        assert!(graph.is_subtype(var(0), var(1)));
        assert!(graph.upper_variables(var(0)).is_empty());
        graph.assert_invariants();
    }

    #[test]
    fn test_chain_cycle_collapses_intermediates() {
        let mut graph = ConstraintGraph::new();
        graph.connect(var(0), var(1));
        graph.connect(var(1), var(2));
        graph.connect(var(2), var(0));
        assert!(graph.is_equal(var(0), var(1)));
        assert!(graph.is_equal(var(1), var(2)));
        graph.assert_invariants();
    }

    #[test]
    fn test_collapse_keeps_outside_edges() {
        let mut graph = ConstraintGraph::new();
        graph.connect(var(9), var(0));
        graph.connect(var(0), var(1));
        graph.connect(var(1), var(0));
        assert!(graph.is_subtype(var(9), var(0)));
        assert!(graph.is_subtype(var(9), var(1)));
        graph.assert_invariants();
    }

    #[test]
    fn test_collapse_keeps_informative_bounds() {
        let mut graph = ConstraintGraph::new();
        graph.update_lower_bound(var(0), int());
        graph.connect(var(0), var(1));
        graph.connect(var(1), var(0));
        assert_eq!(graph.lower_bound(var(1)), int());
        graph.assert_invariants();
    }

    #[test]
    fn test_connect_is_idempotent() {
        let mut graph = ConstraintGraph::new();
        graph.connect(var(0), var(1));
        let before = graph.clone();
        graph.connect(var(0), var(1));
        assert_eq!(graph, before);
    }

    // ============================================================
    // Snapshot
    // ============================================================

    #[test]
    fn test_clone_round_trip() {
        let mut graph = ConstraintGraph::new();
        graph.connect(var(0), var(1));
        graph.update_lower_bound(var(0), int());
        let saved = graph.clone();

        graph.connect(var(1), var(2));
        graph.update_upper_bound(var(2), int());
        assert_ne!(graph, saved);

        graph = saved.clone();
        assert_eq!(graph, saved);
        graph.assert_invariants();
    }
}
