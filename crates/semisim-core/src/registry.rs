//! Entity registry: the arena every entity of a run lives in.
//!
//! Entities are stored once, in a flat arena, and addressed by copyable
//! [`EntityHandle`]s. Categories (`regions`, `companies`, ...) are ordered
//! lists of handles plus an id index, so lookups by id and iteration in
//! configuration order are both cheap.
//!
//! Modules never hold references into the arena. At initialization they
//! capture a [`RegistryView`] of the categories they work on; during a year
//! step the view is the capability that authorizes writes (see
//! [`crate::module::YearContext::entity_mut`]).

use std::collections::{BTreeMap, BTreeSet};

use semisim_types::{EntityId, EntityKindTag};

use crate::entity::Entity;

/// Category holding regions.
pub const REGIONS: &str = "regions";
/// Category holding companies.
pub const COMPANIES: &str = "companies";
/// Category holding technology nodes.
pub const TECHNOLOGY_NODES: &str = "technology_nodes";
/// Category holding end markets.
pub const END_MARKETS: &str = "end_markets";
/// Category holding policies.
pub const POLICIES: &str = "policies";

/// Errors raised while populating the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Another entity in the category already uses this id.
    #[error("duplicate id {id} in category {category}")]
    DuplicateId {
        /// The category being populated.
        category: String,
        /// The repeated id.
        id: EntityId,
    },

    /// The entity's kind differs from the kind the category holds.
    #[error("category {category} holds {expected} entities, got {found}")]
    KindMismatch {
        /// The category being populated.
        category: String,
        /// Kind the category was created with.
        expected: EntityKindTag,
        /// Kind of the rejected entity.
        found: EntityKindTag,
    },
}

/// Stable index of an entity in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityHandle(usize);

impl EntityHandle {
    /// Position of the entity in the arena.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct CategorySlot {
    kind: EntityKindTag,
    handles: Vec<EntityHandle>,
    by_id: BTreeMap<EntityId, EntityHandle>,
}

impl CategorySlot {
    const fn new(kind: EntityKindTag) -> Self {
        Self {
            kind,
            handles: Vec::new(),
            by_id: BTreeMap::new(),
        }
    }
}

/// Every entity of a run, grouped into named categories.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
    categories: BTreeMap<String, CategorySlot>,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a category holding entities of `kind`.
    ///
    /// Declared categories appear in snapshots even when no entity was
    /// loaded into them. Declaring an existing category is a no-op.
    pub fn add_category(&mut self, category: &str, kind: EntityKindTag) {
        self.categories
            .entry(category.to_owned())
            .or_insert_with(|| CategorySlot::new(kind));
    }

    /// Add an entity to `category`, declaring the category if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if the id is taken within the
    /// category, or [`RegistryError::KindMismatch`] if the category holds a
    /// different kind. The registry is unchanged on error.
    pub fn insert(
        &mut self,
        category: &str,
        entity: Entity,
    ) -> Result<EntityHandle, RegistryError> {
        let handle = EntityHandle(self.entities.len());
        let slot = self
            .categories
            .entry(category.to_owned())
            .or_insert_with(|| CategorySlot::new(entity.tag()));
        if slot.kind != entity.tag() {
            return Err(RegistryError::KindMismatch {
                category: category.to_owned(),
                expected: slot.kind,
                found: entity.tag(),
            });
        }
        if slot.by_id.contains_key(entity.id()) {
            return Err(RegistryError::DuplicateId {
                category: category.to_owned(),
                id: entity.id().clone(),
            });
        }
        slot.by_id.insert(entity.id().clone(), handle);
        slot.handles.push(handle);
        self.entities.push(entity);
        Ok(handle)
    }

    /// The entity behind `handle`.
    pub fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        self.entities.get(handle.0)
    }

    pub(crate) fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.entities.get_mut(handle.0)
    }

    /// Look up an entity by category and id.
    pub fn find(&self, category: &str, id: &str) -> Option<EntityHandle> {
        self.categories
            .get(category)
            .and_then(|slot| slot.by_id.get(id).copied())
    }

    /// Handles in `category`, in configuration order; empty when unknown.
    pub fn handles(&self, category: &str) -> &[EntityHandle] {
        self.categories
            .get(category)
            .map_or(&[], |slot| slot.handles.as_slice())
    }

    /// Entities in `category`, in configuration order.
    pub fn entities<'a>(
        &'a self,
        category: &str,
    ) -> impl Iterator<Item = (EntityHandle, &'a Entity)> + 'a {
        self.handles(category)
            .iter()
            .filter_map(move |&h| self.get(h).map(|e| (h, e)))
    }

    /// Declared category names, in name order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Number of entities in `category`.
    pub fn count(&self, category: &str) -> usize {
        self.handles(category).len()
    }

    /// Total number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entity has been loaded.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Capture the handles of `categories` as a module's write scope.
    ///
    /// Unknown categories contribute nothing.
    pub fn view<'c>(&self, categories: impl IntoIterator<Item = &'c str>) -> RegistryView {
        let mut view = RegistryView::default();
        for category in categories {
            let handles = self.handles(category).to_vec();
            view.members.extend(handles.iter().copied());
            view.categories.insert(category.to_owned(), handles);
        }
        view
    }
}

/// The set of entities a module may write to.
///
/// A view is a plain list of handles, taken at initialization. It holds no
/// borrow of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryView {
    categories: BTreeMap<String, Vec<EntityHandle>>,
    members: BTreeSet<EntityHandle>,
}

impl RegistryView {
    /// Whether `handle` is inside the view.
    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.members.contains(&handle)
    }

    /// Handles of `category` in configuration order; empty when the
    /// category is not part of the view.
    pub fn handles(&self, category: &str) -> &[EntityHandle] {
        self.categories.get(category).map_or(&[], Vec::as_slice)
    }

    /// Every handle in the view, in arena order.
    pub fn all(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.members.iter().copied()
    }

    /// Number of entities in the view.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the view grants access to nothing.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Build a view from an explicit handle list, grouped under `category`.
    pub fn from_handles(category: &str, handles: impl IntoIterator<Item = EntityHandle>) -> Self {
        let handles: Vec<_> = handles.into_iter().collect();
        Self {
            members: handles.iter().copied().collect(),
            categories: BTreeMap::from([(category.to_owned(), handles)]),
        }
    }
}

/// Maps scenario category names to the entity kind they hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryKinds {
    kinds: BTreeMap<String, EntityKindTag>,
    aliases: BTreeMap<String, String>,
}

impl Default for CategoryKinds {
    fn default() -> Self {
        let kinds = [
            (REGIONS, EntityKindTag::Region),
            (COMPANIES, EntityKindTag::Company),
            (TECHNOLOGY_NODES, EntityKindTag::TechnologyNode),
            (END_MARKETS, EntityKindTag::EndMarket),
            (POLICIES, EntityKindTag::Policy),
        ]
        .into_iter()
        .map(|(name, kind)| (name.to_owned(), kind))
        .collect();
        let mut category_kinds = Self {
            kinds,
            aliases: BTreeMap::new(),
        };
        category_kinds.alias("tech_nodes", TECHNOLOGY_NODES);
        category_kinds
    }
}

impl CategoryKinds {
    /// Map `category` to `kind`, replacing any earlier mapping.
    pub fn insert(&mut self, category: impl Into<String>, kind: EntityKindTag) {
        self.kinds.insert(category.into(), kind);
    }

    /// Accept `alias` as another spelling of `canonical`.
    pub fn alias(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.aliases.insert(alias.into(), canonical.into());
    }

    /// Resolve a category name (or alias) to its canonical name and kind.
    pub fn resolve<'a>(&'a self, category: &'a str) -> Option<(&'a str, EntityKindTag)> {
        let canonical = self
            .aliases
            .get(category)
            .map_or(category, String::as_str);
        self.kinds
            .get_key_value(canonical)
            .map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Every canonical category with its kind, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, EntityKindTag)> {
        self.kinds.iter().map(|(name, kind)| (name.as_str(), *kind))
    }
}
