//! Slot manifest
//!
//! The ordered, statically-extracted description of every hook primitive a
//! deferred unit registers. The analyzer produces one manifest per unit; the
//! injector serializes it into the consumer call; the runtime shim replays it
//! on every render pass until the unit is loaded.
//!
//! Primitive classification is a closed enumeration, matched exhaustively,
//! rather than a runtime string-membership check.

use crate::ir::Span;
use crate::static_value::StaticValue;

/// Primitives that own persistent per-instance state.
///
/// Their registration must happen on every pass, so the shim replays them
/// itself with a statically reconstructed initial value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatefulPrimitive {
    UseState,
    UseRef,
}

impl StatefulPrimitive {
    /// JavaScript identifier of the primitive
    pub fn name(&self) -> &'static str {
        match self {
            StatefulPrimitive::UseState => "useState",
            StatefulPrimitive::UseRef => "useRef",
        }
    }
}

/// Primitives that take a dependency-list argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepPrimitive {
    UseEffect,
    UseLayoutEffect,
    UseMemo,
    UseCallback,
}

impl DepPrimitive {
    /// JavaScript identifier of the primitive
    pub fn name(&self) -> &'static str {
        match self {
            DepPrimitive::UseEffect => "useEffect",
            DepPrimitive::UseLayoutEffect => "useLayoutEffect",
            DepPrimitive::UseMemo => "useMemo",
            DepPrimitive::UseCallback => "useCallback",
        }
    }
}

/// Classification of an identifier at a call site inside the deferred unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveClass {
    Stateful(StatefulPrimitive),
    WithDeps(DepPrimitive),
    /// `useImperativeHandle`: no dependency concept here, but it needs an
    /// opaque-handle compatibility call on every pass
    ImperativeHandle,
    /// `useDebugValue`: neither dependencies nor state
    DebugOnly,
    /// Primitives whose semantics cannot be statically replayed
    /// (ambient context reads, reducer dispatch)
    Forbidden,
}

/// Map a callee identifier to its primitive class, if it is one
pub fn classify(name: &str) -> Option<PrimitiveClass> {
    match name {
        "useState" => Some(PrimitiveClass::Stateful(StatefulPrimitive::UseState)),
        "useRef" => Some(PrimitiveClass::Stateful(StatefulPrimitive::UseRef)),
        "useEffect" => Some(PrimitiveClass::WithDeps(DepPrimitive::UseEffect)),
        "useLayoutEffect" => Some(PrimitiveClass::WithDeps(DepPrimitive::UseLayoutEffect)),
        "useMemo" => Some(PrimitiveClass::WithDeps(DepPrimitive::UseMemo)),
        "useCallback" => Some(PrimitiveClass::WithDeps(DepPrimitive::UseCallback)),
        "useImperativeHandle" => Some(PrimitiveClass::ImperativeHandle),
        "useDebugValue" => Some(PrimitiveClass::DebugOnly),
        "useContext" | "useReducer" => Some(PrimitiveClass::Forbidden),
        _ => None,
    }
}

/// Number of entries in a dependency list, excluding the synthetic
/// load-state token the transform injects later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyArity {
    /// Dependency array literal with this many own entries
    Count(usize),
    /// No dependency argument at all: the primitive re-runs every pass.
    /// Distinct from `Count(0)`.
    EveryPass,
}

/// What one slot registers
#[derive(Debug, Clone, PartialEq)]
pub enum SlotKind {
    Stateful {
        primitive: StatefulPrimitive,
        initial: StaticValue,
    },
    WithDeps {
        primitive: DepPrimitive,
        arity: DependencyArity,
    },
    ImperativeHandle,
    DebugOnly,
}

/// One primitive call found in the deferred unit, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDescriptor {
    pub kind: SlotKind,
    pub span: Span,
}

impl SlotDescriptor {
    /// JavaScript identifier of the primitive this slot registers
    pub fn primitive_name(&self) -> &'static str {
        match &self.kind {
            SlotKind::Stateful { primitive, .. } => primitive.name(),
            SlotKind::WithDeps { primitive, .. } => primitive.name(),
            SlotKind::ImperativeHandle => "useImperativeHandle",
            SlotKind::DebugOnly => "useDebugValue",
        }
    }
}

/// A stateful slot as consumed by the runtime shim
#[derive(Debug, Clone, PartialEq)]
pub struct StatefulSlot {
    pub primitive: StatefulPrimitive,
    pub initial: StaticValue,
}

/// A stateless slot as consumed by the runtime shim
#[derive(Debug, Clone, PartialEq)]
pub enum StatelessSlot {
    WithDeps {
        primitive: DepPrimitive,
        arity: DependencyArity,
    },
    ImperativeHandle,
    DebugOnly,
}

/// Ordered sequence of slot descriptors for one deferred unit.
///
/// Order is exactly the source order of primitive calls inside the tagged
/// declaration and must be reproduced byte-for-byte at every replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    slots: Vec<SlotDescriptor>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, slot: SlotDescriptor) {
        self.slots.push(slot);
    }

    pub fn slots(&self) -> &[SlotDescriptor] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Split into stateful and stateless slots, preserving the relative
    /// order of each partition as encountered in the source.
    pub fn partition(&self) -> (Vec<StatefulSlot>, Vec<StatelessSlot>) {
        let mut stateful = Vec::new();
        let mut stateless = Vec::new();
        for slot in &self.slots {
            match &slot.kind {
                SlotKind::Stateful { primitive, initial } => stateful.push(StatefulSlot {
                    primitive: *primitive,
                    initial: initial.clone(),
                }),
                SlotKind::WithDeps { primitive, arity } => stateless.push(StatelessSlot::WithDeps {
                    primitive: *primitive,
                    arity: *arity,
                }),
                SlotKind::ImperativeHandle => stateless.push(StatelessSlot::ImperativeHandle),
                SlotKind::DebugOnly => stateless.push(StatelessSlot::DebugOnly),
            }
        }
        (stateful, stateless)
    }

    /// Primitive identifiers referenced by the manifest, deduplicated,
    /// in first-appearance order.
    pub fn referenced_primitives(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for slot in &self.slots {
            let name = slot.primitive_name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}
