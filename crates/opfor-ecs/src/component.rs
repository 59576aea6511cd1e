//! Component type registration and component-set tags.
//!
//! Every Rust type that satisfies [`Component`] can be attached to an entity.
//! The [`ComponentRegistry`] maps each such type to a dense
//! [`ComponentTypeId`] the first time it is seen, either through an explicit
//! [`register`](ComponentRegistry::register) call or lazily through
//! [`get_or_register`](ComponentRegistry::get_or_register). The ids index the
//! per-type storages and the bits of a [`ComponentSet`].

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use crate::storage::{AnyStorage, ComponentStorage};
use crate::EcsError;

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A plain value that can be attached to an entity.
///
/// `Default` backs `add_components`, which attaches default-constructed
/// values. The serde bounds let editor tooling read and write components it
/// knows only by name.
pub trait Component:
    Default + Clone + fmt::Debug + serde::Serialize + serde::de::DeserializeOwned + 'static
{
}

impl<T> Component for T where
    T: Default + Clone + fmt::Debug + serde::Serialize + serde::de::DeserializeOwned + 'static
{
}

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Opaque, lightweight tag for a registered component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    /// Position of this type in the registry (and in a [`ComponentSet`]).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentInfo
// ---------------------------------------------------------------------------

/// Metadata about a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// Tag assigned at registration time.
    pub id: ComponentTypeId,
    /// Human-readable name, unique within the registry.
    pub name: String,
    /// Rust `TypeId` for runtime type checking.
    pub type_id: TypeId,
    /// Full Rust type path, for diagnostics.
    pub type_name: &'static str,
    /// Builds an empty storage for this type.
    pub(crate) new_storage: fn() -> Box<dyn AnyStorage>,
}

fn new_storage<T: Component>() -> Box<dyn AnyStorage> {
    Box::new(ComponentStorage::<T>::new())
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Registry mapping Rust types to [`ComponentTypeId`]s and their metadata.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    /// TypeId -> ComponentTypeId for dedup.
    by_type: HashMap<TypeId, ComponentTypeId>,
    /// Name -> ComponentTypeId for name-based lookup (editor tooling).
    by_name: HashMap<String, ComponentTypeId>,
    /// Indexed by `ComponentTypeId.0`.
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicitly register `T` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateRegistration`] if `T` is already
    /// registered (explicitly or lazily) or if `name` is taken.
    pub fn register<T: Component>(&mut self, name: &str) -> Result<ComponentTypeId, EcsError> {
        if self.by_type.contains_key(&TypeId::of::<T>()) || self.by_name.contains_key(name) {
            return Err(EcsError::DuplicateRegistration {
                name: name.to_owned(),
            });
        }
        Ok(self.push::<T>(name.to_owned()))
    }

    /// Return the tag for `T`, registering it on first use.
    ///
    /// Lazily registered types are named after the last path segment of
    /// their Rust type name, falling back to the full path if that short
    /// name is already taken.
    pub fn get_or_register<T: Component>(&mut self) -> ComponentTypeId {
        if let Some(id) = self.lookup::<T>() {
            return id;
        }
        let full = std::any::type_name::<T>();
        let short = short_type_name(full);
        let name = if self.by_name.contains_key(short) {
            full
        } else {
            short
        };
        self.push::<T>(name.to_owned())
    }

    fn push<T: Component>(&mut self, name: String) -> ComponentTypeId {
        let id = ComponentTypeId(self.infos.len() as u32);
        tracing::debug!(?id, %name, "registered component type");
        self.infos.push(ComponentInfo {
            id,
            name: name.clone(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            new_storage: new_storage::<T>,
        });
        self.by_type.insert(TypeId::of::<T>(), id);
        self.by_name.insert(name, id);
        id
    }

    /// Look up the tag of a Rust type without registering it.
    pub fn lookup<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Look up a component type by its registered name.
    pub fn lookup_by_name(&self, name: &str) -> Option<ComponentTypeId> {
        self.by_name.get(name).copied()
    }

    /// Metadata for a registered tag.
    pub fn info(&self, id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.infos.get(id.index())
    }

    /// Registered name of a tag.
    pub fn name_of(&self, id: ComponentTypeId) -> Option<&str> {
        self.info(id).map(|info| info.name.as_str())
    }

    /// Total number of registered component types.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Whether any component types have been registered.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Names of all registered component types, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Comma-separated sorted names, used in error messages.
    pub(crate) fn names_joined(&self) -> String {
        self.names().join(", ")
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

/// Growable bitset of [`ComponentTypeId`]s: the component-set tag of an
/// entity, or the requirement set of a query.
///
/// Trailing zero words are trimmed so that equal sets compare equal.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ComponentSet {
    words: Vec<u64>,
}

impl ComponentSet {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from tags.
    pub fn from_ids(ids: impl IntoIterator<Item = ComponentTypeId>) -> Self {
        let mut set = Self::new();
        for id in ids {
            set.insert(id);
        }
        set
    }

    /// Add a tag. Returns `true` if it was not already present.
    pub fn insert(&mut self, id: ComponentTypeId) -> bool {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_set = self.words[word] & (1 << bit) != 0;
        self.words[word] |= 1 << bit;
        !was_set
    }

    /// Remove a tag. Returns `true` if it was present.
    pub fn remove(&mut self, id: ComponentTypeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let (word, bit) = (id.index() / 64, id.index() % 64);
        self.words[word] &= !(1 << bit);
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
        true
    }

    /// Whether `id` is in the set.
    pub fn contains(&self, id: ComponentTypeId) -> bool {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        self.words.get(word).is_some_and(|w| w & (1 << bit) != 0)
    }

    /// Whether every tag of `required` is also in `self`.
    pub fn is_superset_of(&self, required: &ComponentSet) -> bool {
        required.words.iter().enumerate().all(|(i, &req)| {
            let have = self.words.get(i).copied().unwrap_or(0);
            have & req == req
        })
    }

    /// Number of tags in the set.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Tags in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..64)
                .filter(move |bit| word & (1 << bit) != 0)
                .map(move |bit| ComponentTypeId((i * 64 + bit) as u32))
        })
    }
}

impl fmt::Debug for ComponentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|id| id.0)).finish()
    }
}

// ---------------------------------------------------------------------------
// ComponentTuple
// ---------------------------------------------------------------------------

/// A compile-time list of component types, written as a tuple:
/// `(Transform,)`, `(Transform, PointLight)`, ...
///
/// Used by every entity-manager operation that takes a set of types.
pub trait ComponentTuple: 'static {
    /// Tags of every listed type, or `None` if any of them was never
    /// registered (such a type cannot be attached to anything yet).
    fn lookup(registry: &ComponentRegistry) -> Option<Vec<ComponentTypeId>>;

    /// Tags of every listed type, registering unseen ones.
    fn register(registry: &mut ComponentRegistry) -> Vec<ComponentTypeId>;
}

impl ComponentTuple for () {
    fn lookup(_registry: &ComponentRegistry) -> Option<Vec<ComponentTypeId>> {
        Some(Vec::new())
    }

    fn register(_registry: &mut ComponentRegistry) -> Vec<ComponentTypeId> {
        Vec::new()
    }
}

macro_rules! impl_component_tuple {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentTuple for ($($name,)+) {
            fn lookup(registry: &ComponentRegistry) -> Option<Vec<ComponentTypeId>> {
                Some(vec![$(registry.lookup::<$name>()?),+])
            }

            fn register(registry: &mut ComponentRegistry) -> Vec<ComponentTypeId> {
                vec![$(registry.get_or_register::<$name>()),+]
            }
        }
    };
}

impl_component_tuple!(A);
impl_component_tuple!(A, B);
impl_component_tuple!(A, B, C);
impl_component_tuple!(A, B, C, D);
impl_component_tuple!(A, B, C, D, E);
impl_component_tuple!(A, B, C, D, E, F);
impl_component_tuple!(A, B, C, D, E, F, G);
impl_component_tuple!(A, B, C, D, E, F, G, H);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
