//! Core type representations for Sable.
//!
//! These are the semantic types consumed by the inference engine. They are
//! produced by name resolution and lowering and treated as immutable values
//! here; the only mutable state of inference lives in the constraint graph.
//!
//! Nominal identifiers (type constructors, interfaces, capabilities) are
//! interned symbols and compare by identity. Unification variables compare
//! by identity as well: the allocating scope plus an index within it. The
//! role carried by a variable is diagnostic payload only and never takes
//! part in equality.
//!
//! `Display` renderings here are solver-internal (`?3`, `#7`, `T0`); the
//! diagnostics layer resolves interned ids back to source names via
//! [`Names`].

use std::fmt;
use std::hash::{Hash, Hasher};

use string_interner::{DefaultStringInterner, DefaultSymbol, Symbol as _};

use crate::captures::CaptureSet;
use crate::effects::EffectSet;

// ============================================================
// Identifiers
// ============================================================

/// A nominal type constructor, e.g. `Int` or `List`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeCtor(DefaultSymbol);

/// A nominal interface, e.g. `Exc` or `Generator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(DefaultSymbol);

/// A concrete capability, e.g. a tracked `io` or `exc` resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityId(DefaultSymbol);

/// A bound type parameter. Minted by the name resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeParamId(pub u32);

/// A bound capture parameter. Minted by the name resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureParamId(pub u32);

/// Identity of a [`UnificationScope`](crate::typeck::UnificationScope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl TypeCtor {
    pub fn symbol(self) -> DefaultSymbol {
        self.0
    }
}

impl InterfaceId {
    pub fn symbol(self) -> DefaultSymbol {
        self.0
    }
}

impl CapabilityId {
    pub fn symbol(self) -> DefaultSymbol {
        self.0
    }
}

impl fmt::Display for TypeCtor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0.to_usize())
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0.to_usize())
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0.to_usize())
    }
}

impl fmt::Display for TypeParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl fmt::Display for CaptureParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Interned names for nominal identifiers.
///
/// Two identifiers are equal exactly when they intern to the same symbol,
/// so identity comparison on the wrapped symbol is name equality.
#[derive(Debug, Default)]
pub struct Names {
    interner: DefaultStringInterner,
}

impl Names {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_ctor(&mut self, name: &str) -> TypeCtor {
        TypeCtor(self.interner.get_or_intern(name))
    }

    pub fn interface(&mut self, name: &str) -> InterfaceId {
        InterfaceId(self.interner.get_or_intern(name))
    }

    pub fn capability(&mut self, name: &str) -> CapabilityId {
        CapabilityId(self.interner.get_or_intern(name))
    }

    /// Resolve an interned symbol back to its source name.
    pub fn resolve(&self, sym: DefaultSymbol) -> Option<&str> {
        self.interner.resolve(sym)
    }
}

// ============================================================
// Unification variables
// ============================================================

/// Why a unification variable was introduced. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VarRole {
    /// Instantiation of a bound type parameter of a function scheme.
    Instantiation(TypeParamId),
    /// Intermediate variable introduced while merging two bounds.
    Merge,
    /// Result type of a call being inferred.
    InferredReturn,
    /// Argument type of a call being inferred.
    InferredArgument,
}

/// Why a capture unification variable was introduced. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CaptureRole {
    /// Instantiation of a bound capture parameter of a function scheme.
    Instantiation(CaptureParamId),
    /// Intermediate variable introduced while merging capture sets.
    Merge,
    /// Capture of a region being inferred.
    InferredRegion,
}

/// A type unification variable.
///
/// Identity is the allocating scope plus an index within it; the role never
/// takes part in equality, hashing, or ordering.
#[derive(Debug, Clone, Copy)]
pub struct UnificationVar {
    pub id: u32,
    pub scope: ScopeId,
    pub role: VarRole,
}

impl PartialEq for UnificationVar {
    fn eq(&self, other: &Self) -> bool {
        self.scope == other.scope && self.id == other.id
    }
}

impl Eq for UnificationVar {}

impl Hash for UnificationVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scope.hash(state);
        self.id.hash(state);
    }
}

impl PartialOrd for UnificationVar {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UnificationVar {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.scope, self.id).cmp(&(other.scope, other.id))
    }
}

impl fmt::Display for UnificationVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.id)
    }
}

/// A capture unification variable. Same identity discipline as
/// [`UnificationVar`].
#[derive(Debug, Clone, Copy)]
pub struct CaptureUnificationVar {
    pub id: u32,
    pub scope: ScopeId,
    pub role: CaptureRole,
}

impl PartialEq for CaptureUnificationVar {
    fn eq(&self, other: &Self) -> bool {
        self.scope == other.scope && self.id == other.id
    }
}

impl Eq for CaptureUnificationVar {}

impl Hash for CaptureUnificationVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scope.hash(state);
        self.id.hash(state);
    }
}

impl PartialOrd for CaptureUnificationVar {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CaptureUnificationVar {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.scope, self.id).cmp(&(other.scope, other.id))
    }
}

impl fmt::Display for CaptureUnificationVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?c{}", self.id)
    }
}

// ============================================================
// Value types
// ============================================================

/// A value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    /// Nominal constructor application, e.g. `List[Int]`.
    App(TypeCtor, Vec<ValueType>),
    /// A block type boxed up as a first-class value, together with the
    /// captures it closes over.
    Boxed(Box<BlockType>, CaptureSet),
    /// Reference to a bound type parameter.
    Param(TypeParamId),
    /// A unification variable.
    Var(UnificationVar),
    /// Universal top.
    Top,
    /// Universal bottom.
    Bottom,
}

impl ValueType {
    /// A nullary constructor application.
    pub fn nullary(ctor: TypeCtor) -> Self {
        ValueType::App(ctor, Vec::new())
    }

    pub fn boxed(block: BlockType, captures: CaptureSet) -> Self {
        ValueType::Boxed(Box::new(block), captures)
    }

    pub fn is_var(&self) -> bool {
        matches!(self, ValueType::Var(_))
    }

    pub fn as_var(&self) -> Option<UnificationVar> {
        match self {
            ValueType::Var(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::App(ctor, args) if args.is_empty() => write!(f, "{ctor}"),
            ValueType::App(ctor, args) => {
                write!(f, "{ctor}[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, "]")
            }
            ValueType::Boxed(block, captures) => write!(f, "box {block} at {captures}"),
            ValueType::Param(p) => write!(f, "{p}"),
            ValueType::Var(v) => write!(f, "{v}"),
            ValueType::Top => write!(f, "Top"),
            ValueType::Bottom => write!(f, "Bottom"),
        }
    }
}

// ============================================================
// Block types
// ============================================================

/// A block type: a second-class computation value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockType {
    Interface(InterfaceType),
    Function(FunctionType),
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Interface(i) => write!(f, "{i}"),
            BlockType::Function(func) => write!(f, "{func}"),
        }
    }
}

/// An interface type, optionally applied to value-type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceType {
    pub interface: InterfaceId,
    pub args: Vec<ValueType>,
}

impl InterfaceType {
    pub fn new(interface: InterfaceId) -> Self {
        Self { interface, args: Vec::new() }
    }

    pub fn with_args(interface: InterfaceId, args: Vec<ValueType>) -> Self {
        Self { interface, args }
    }
}

impl fmt::Display for InterfaceType {
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

/// A function type, possibly polymorphic in type and capture parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionType {
    /// Bound type parameters.
    pub tparams: Vec<TypeParamId>,
    /// Bound capture parameters.
    pub cparams: Vec<CaptureParamId>,
    /// Value parameters.
    pub vparams: Vec<ValueType>,
    /// Block parameters.
    pub bparams: Vec<BlockType>,
    /// Result type.
    pub result: ValueType,
    /// Effects the function may perform.
    pub effects: EffectSet,
}

impl FunctionType {
    /// A monomorphic function type over value parameters only.
    pub fn simple(vparams: Vec<ValueType>, result: ValueType) -> Self {
        Self {
            tparams: Vec::new(),
            cparams: Vec::new(),
            vparams,
            bparams: Vec::new(),
            result,
            effects: EffectSet::pure(),
        }
    }

    /// Whether the type binds no type or capture parameters.
    pub fn is_monomorphic(&self) -> bool {
        self.tparams.is_empty() && self.cparams.is_empty()
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tparams.is_empty() || !self.cparams.is_empty() {
            write!(f, "[")?;
            let mut first = true;
            for p in &self.tparams {
                if !first {
                    write!(f, ", ")?;
                }
                first = false;
                write!(f, "{p}")?;
            }
            for c in &self.cparams {
                if !first {
                    write!(f, ", ")?;
                }
                first = false;
                write!(f, "{c}")?;
            }
            write!(f, "]")?;
        }
        write!(f, "(")?;
        let mut first = true;
        for p in &self.vparams {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{p}")?;
        }
        for b in &self.bparams {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{{{b}}}")?;
        }
        write!(f, ") -> {}", self.result)?;
        if !self.effects.is_pure() {
            write!(f, " / {}", self.effects)?;
        }
        Ok(())
    }
}
