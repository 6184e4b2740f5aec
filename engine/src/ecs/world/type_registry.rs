//! Unified type registry for all typed store data.
//!
//! This module provides [`TypeRegistry`], a thread-safe registry that assigns a numeric
//! [`TypeId`] to every component, tag, relation and script type. The id is used for archetype
//! signatures, bitset matching and array indexing.
//!
//! # Design
//!
//! The registry enforces **mutual exclusion**: a type is registered as exactly one
//! [`TypeKind`]. Registering a component type as a tag (or any other mix) panics.
//!
//! Alongside the id, each registration stores the factories needed to build type-erased
//! storage for the type: a heap (column) factory for components, an optional index factory for
//! indexed components and a relation table factory for relations. The factories are resolved
//! once at registration and looked up by id afterwards.
//!
//! # Thread Safety
//!
//! The registry uses lock-free reads via `DashMap` and minimal locking for writes.
//! Multiple stores may share one registry through an `Arc` to agree on type ids.
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = TypeRegistry::new();
//!
//! let pos_id = registry.register_component::<Position>();
//! let tag_id = registry.register_tag::<Selected>();
//!
//! // Position is a component, registering it as a tag panics.
//! registry.register_tag::<Position>();
//! ```

use std::{
    any::TypeId as StdTypeId,
    fmt,
    sync::{
        RwLock,
        atomic::{AtomicU32, Ordering},
    },
};

use dashmap::DashMap;

use crate::ecs::{
    component::{Component, Spec, Tag},
    index::IndexFactory,
    relation::{self, Relation, RelationsFactory},
    script::Script,
    storage::heap::{self, HeapFactory},
};

/// Width in bytes of the vector registers parallel sections are aligned for.
const VECTOR_WIDTH: usize = 32;

/// The kind of type registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A struct component stored in archetype columns.
    Component,
    /// A zero-sized marker that is part of an archetype key but has no column.
    Tag,
    /// A one-to-many component stored in a relation table.
    Relation,
    /// A boxed per-entity script.
    Script,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Component => write!(f, "component"),
            TypeKind::Tag => write!(f, "tag"),
            TypeKind::Relation => write!(f, "relation"),
            TypeKind::Script => write!(f, "script"),
        }
    }
}

/// A unique identifier for a registered type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// Construct a new Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this ID for use in indexable storage (e.g., Vec, bitset).
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for TypeId {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<usize> for TypeId {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

/// Metadata about a registered type.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    /// The unique type ID.
    id: TypeId,

    /// What kind of type this is.
    kind: TypeKind,

    /// The Rust TypeId for runtime type checking.
    type_id: StdTypeId,

    /// The Rust type name, used in diagnostics.
    name: &'static str,

    /// Size of one value in bytes.
    size: usize,

    /// How many values fit one vector register. 1 if the size does not divide the width.
    lanes: usize,

    /// Column constructor for component types.
    heap_factory: Option<HeapFactory>,

    /// Index constructor for indexed component types.
    index_factory: Option<IndexFactory>,

    /// Relation table constructor for relation types.
    relations_factory: Option<RelationsFactory>,
}

impl TypeInfo {
    /// Construct TypeInfo for type `T` without any storage factories.
    fn new<T: 'static>(id: TypeId, kind: TypeKind) -> Self {
        let size = std::mem::size_of::<T>();
        let lanes = if size == 0 || VECTOR_WIDTH % size != 0 {
            1
        } else {
            VECTOR_WIDTH / size
        };
        Self {
            id,
            kind,
            type_id: StdTypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            size,
            lanes,
            heap_factory: None,
            index_factory: None,
            relations_factory: None,
        }
    }

    /// Get the type ID.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Get the kind of type.
    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Get the Rust TypeId.
    #[inline]
    pub fn type_id(&self) -> StdTypeId {
        self.type_id
    }

    /// Get the Rust type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the size of one value in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of values per vector register, used to align parallel sections.
    #[inline]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Whether this component type maintains a secondary index.
    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.index_factory.is_some()
    }

    #[inline]
    pub(crate) fn heap_factory(&self) -> Option<HeapFactory> {
        self.heap_factory
    }

    #[inline]
    pub(crate) fn index_factory(&self) -> Option<IndexFactory> {
        self.index_factory
    }

    #[inline]
    pub(crate) fn relations_factory(&self) -> Option<RelationsFactory> {
        self.relations_factory
    }
}

/// A thread-safe registry for all typed store data.
pub struct TypeRegistry {
    /// Map from Rust TypeId to our Id. Lock-free reads via sharded concurrent hashmap.
    type_map: DashMap<StdTypeId, TypeId>,

    /// List of registered type entries. Protected by RwLock for rare writes.
    types: RwLock<Vec<Option<TypeInfo>>>,

    /// Next available type identifier.
    next_id: AtomicU32,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a new, empty type registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            type_map: DashMap::new(),
            types: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(0),
        }
    }

    /// Register a type as a component. Returns the existing ID if already registered.
    ///
    /// Panics if the type is already registered as a different kind.
    pub fn register_component<C: Component>(&self) -> TypeId {
        self.register::<C>(TypeKind::Component, |mut info| {
            info.heap_factory = Some(heap::new_heap::<C> as HeapFactory);
            info.index_factory = C::index_factory();
            info
        })
    }

    /// Register a type as a tag.
    ///
    /// Panics if the type is already registered as a different kind.
    pub fn register_tag<T: Tag>(&self) -> TypeId {
        self.register::<T>(TypeKind::Tag, |info| info)
    }

    /// Register a type as a relation component.
    ///
    /// Panics if the type is already registered as a different kind.
    pub fn register_relation<R: Relation>(&self) -> TypeId {
        self.register::<R>(TypeKind::Relation, |mut info| {
            info.relations_factory = Some(relation::new_relations::<R> as RelationsFactory);
            info
        })
    }

    /// Register a type as a script.
    ///
    /// Panics if the type is already registered as a different kind.
    pub fn register_script<S: Script>(&self) -> TypeId {
        self.register::<S>(TypeKind::Script, |info| info)
    }

    /// Internal registration logic.
    ///
    /// Panics if the type is already registered as a different kind.
    fn register<T: 'static>(&self, kind: TypeKind, build: impl FnOnce(TypeInfo) -> TypeInfo) -> TypeId {
        let std_type_id = StdTypeId::of::<T>();

        // Fast path: check if already registered (lock-free read)
        if let Some(existing_id) = self.type_map.get(&std_type_id) {
            let id = *existing_id;
            self.verify_kind::<T>(id, kind);
            return id;
        }

        // Slow path: use the entry API to handle races between registering threads.
        match self.type_map.entry(std_type_id) {
            dashmap::Entry::Occupied(occupied) => {
                let id = *occupied.get();
                self.verify_kind::<T>(id, kind);
                id
            }
            dashmap::Entry::Vacant(vacant) => {
                let id_value = self.next_id.fetch_add(1, Ordering::Relaxed);
                let id = TypeId(id_value);

                let mut types = self.types.write().unwrap_or_else(|e| e.into_inner());
                let index = id_value as usize;
                if index >= types.len() {
                    types.resize(index + 1, None);
                }
                types[index] = Some(build(TypeInfo::new::<T>(id, kind)));
                vacant.insert(id);

                id
            }
        }
    }

    /// Panic if `id` is registered under a different kind than requested.
    fn verify_kind<T: 'static>(&self, id: TypeId, kind: TypeKind) {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        if let Some(Some(info)) = types.get(id.index())
            && info.kind() != kind
        {
            panic!(
                "type '{}' is already registered as a {}, cannot register as {}",
                std::any::type_name::<T>(),
                info.kind(),
                kind
            )
        }
    }

    /// Get the ID for a type, if registered.
    #[inline]
    pub fn get<T: 'static>(&self) -> Option<TypeId> {
        self.type_map
            .get(&StdTypeId::of::<T>())
            .map(|entry| *entry.value())
    }

    /// Get the info for a type ID, if registered.
    #[inline]
    pub fn get_info(&self, id: TypeId) -> Option<TypeInfo> {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        types.get(id.index()).and_then(|i| *i)
    }

    /// Get the info for type `T`, if registered.
    #[inline]
    pub fn get_info_of<T: 'static>(&self) -> Option<TypeInfo> {
        self.get::<T>().and_then(|id| self.get_info(id))
    }

    /// Get the info of every type in a spec, in spec order.
    ///
    /// Panics if a spec entry is not registered; specs are only built from registered ids.
    pub fn info_for_spec(&self, spec: &Spec) -> Vec<TypeInfo> {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        spec.ids()
            .iter()
            .map(|id| {
                types
                    .get(id.index())
                    .and_then(|i| *i)
                    .unwrap_or_else(|| panic!("type id {id:?} is not registered"))
            })
            .collect()
    }

    /// Number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.next_id.load(Ordering::Relaxed) as usize
    }

    /// Whether no type has been registered yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
