use crate::association::{AssociationSource, AssociationWriter};
use crate::core::{DeferError, Entity, Result};
use log::trace;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type LinkKey = (String, String);

#[derive(Debug, Default)]
struct StoreState {
    /// Rows by persist id
    entities: HashMap<String, Entity>,
    /// Join table: (owner id, association name) -> member ids in link order
    links: HashMap<LinkKey, Vec<String>>,
    /// Member id -> owner id, registered through inverse propagation
    inverse: HashMap<String, String>,
}

/// Shared in-memory storage of entities and association join rows.
///
/// Cloning the store yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a new entity built from `fields`.
    pub fn insert(&self, fields: serde_json::Value) -> Result<Entity> {
        self.insert_entity(Entity::new(fields)?)
    }

    /// Persist `entity`, overwriting any row with the same persist id.
    pub fn insert_entity(&self, mut entity: Entity) -> Result<Entity> {
        entity.persisted = true;
        let mut state = self.state.write()?;
        state
            .entities
            .insert(entity.persist_id.clone(), entity.clone());
        trace!("stored entity {}", entity.persist_id);
        Ok(entity)
    }

    pub fn get(&self, persist_id: &str) -> Result<Option<Entity>> {
        let state = self.state.read()?;
        Ok(state.entities.get(persist_id).cloned())
    }

    /// Add a join row. Linking an already linked member is a no-op;
    /// linking an unsaved member persists it first.
    pub fn link(&self, owner_id: &str, name: &str, member: &Entity) -> Result<()> {
        let mut state = self.state.write()?;
        if !state.entities.contains_key(&member.persist_id) {
            let mut saved = member.clone();
            saved.persisted = true;
            state.entities.insert(saved.persist_id.clone(), saved);
        }

        let members = state
            .links
            .entry((owner_id.to_string(), name.to_string()))
            .or_default();
        if !members.contains(&member.persist_id) {
            members.push(member.persist_id.clone());
            trace!("linked {} -> {} ({})", owner_id, member.persist_id, name);
        }
        Ok(())
    }

    /// Remove a join row. Fails when the member is not linked.
    pub fn unlink(&self, owner_id: &str, name: &str, member: &Entity) -> Result<()> {
        let mut state = self.state.write()?;
        let members = state
            .links
            .get_mut(&(owner_id.to_string(), name.to_string()))
            .ok_or_else(|| DeferError::LinkError(format!("{} has no '{}' links", owner_id, name)))?;

        let pos = members
            .iter()
            .position(|id| id == &member.persist_id)
            .ok_or_else(|| {
                DeferError::LinkError(format!(
                    "{} is not linked to {} through '{}'",
                    member.persist_id, owner_id, name
                ))
            })?;
        members.remove(pos);
        trace!("unlinked {} -> {} ({})", owner_id, member.persist_id, name);
        Ok(())
    }

    /// Linked members in link order.
    pub fn members(&self, owner_id: &str, name: &str) -> Result<Vec<Entity>> {
        let state = self.state.read()?;
        let Some(ids) = state.links.get(&(owner_id.to_string(), name.to_string())) else {
            return Ok(Vec::new());
        };
        ids.iter()
            .map(|id| {
                state.entities.get(id).cloned().ok_or_else(|| {
                    DeferError::SourceError(format!("dangling link to missing entity {}", id))
                })
            })
            .collect()
    }

    fn member_at(&self, owner_id: &str, name: &str, from_end: bool) -> Result<Option<Entity>> {
        let state = self.state.read()?;
        let ids = state.links.get(&(owner_id.to_string(), name.to_string()));
        let id = match (ids, from_end) {
            (Some(ids), false) => ids.first(),
            (Some(ids), true) => ids.last(),
            (None, _) => None,
        };
        Ok(id.and_then(|id| state.entities.get(id).cloned()))
    }

    /// Owner registered for `member_id` through inverse propagation
    pub fn owner_of(&self, member_id: &str) -> Result<Option<String>> {
        let state = self.state.read()?;
        Ok(state.inverse.get(member_id).cloned())
    }

    /// Live accessor for the `name` association of `owner`.
    pub fn association(&self, owner: &Entity, name: &str) -> MemoryAssociation {
        MemoryAssociation {
            store: self.clone(),
            owner_id: owner.persist_id.clone(),
            name: name.to_string(),
            cached: RefCell::new(None),
            stats: Cell::new(MemoryAssociationStats::default()),
        }
    }
}

/// Counters kept by a [`MemoryAssociation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryAssociationStats {
    /// Member lists read from the store
    pub fetches: usize,
    /// `first`/`last` answered from the store without a full fetch
    pub peeks: usize,
    pub reloads: usize,
    pub links: usize,
    pub unlinks: usize,
}

/// One owner's association in a [`MemoryStore`].
///
/// Caches the member list after the first fetch until `reload`.
#[derive(Debug)]
pub struct MemoryAssociation {
    store: MemoryStore,
    owner_id: String,
    name: String,
    cached: RefCell<Option<Vec<Entity>>>,
    stats: Cell<MemoryAssociationStats>,
}

impl MemoryAssociation {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn stats(&self) -> MemoryAssociationStats {
        self.stats.get()
    }

    fn record(&self, update: impl FnOnce(&mut MemoryAssociationStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    fn peek(&self, from_end: bool) -> Result<Option<Entity>> {
        if let Some(cached) = self.cached.borrow().as_ref() {
            let member = if from_end { cached.last() } else { cached.first() };
            return Ok(member.cloned());
        }
        self.record(|stats| stats.peeks += 1);
        self.store.member_at(&self.owner_id, &self.name, from_end)
    }
}

impl AssociationSource for MemoryAssociation {
    type Record = Entity;
    type Attributes = serde_json::Value;
    type Owner = Entity;

    fn fetch_all(&self) -> Result<Vec<Entity>> {
        if let Some(cached) = self.cached.borrow().as_ref() {
            return Ok(cached.clone());
        }
        let members = self.store.members(&self.owner_id, &self.name)?;
        self.record(|stats| stats.fetches += 1);
        *self.cached.borrow_mut() = Some(members.clone());
        Ok(members)
    }

    fn first(&self) -> Result<Option<Entity>> {
        self.peek(false)
    }

    fn last(&self) -> Result<Option<Entity>> {
        self.peek(true)
    }

    fn build(&mut self, attributes: Vec<serde_json::Value>) -> Result<Vec<Entity>> {
        attributes.into_iter().map(Entity::new).collect()
    }

    fn create(&mut self, attributes: Vec<serde_json::Value>) -> Result<Vec<Entity>> {
        // Validate everything before the first write
        let built = self.build(attributes)?;
        let mut created = Vec::with_capacity(built.len());
        for entity in built {
            let entity = self.store.insert_entity(entity)?;
            self.store.link(&self.owner_id, &self.name, &entity)?;
            created.push(entity);
        }
        if let Some(cached) = self.cached.get_mut().as_mut() {
            cached.extend(created.iter().cloned());
        }
        Ok(created)
    }

    fn reload(&mut self) -> Result<()> {
        *self.cached.get_mut() = None;
        self.record(|stats| stats.reloads += 1);
        Ok(())
    }

    fn set_inverse_instance(&mut self, record: &Entity, owner: &Entity) -> Result<()> {
        let mut state = self.store.state.write()?;
        state
            .inverse
            .insert(record.persist_id.clone(), owner.persist_id.clone());
        Ok(())
    }
}

impl AssociationWriter for MemoryAssociation {
    fn link(&mut self, record: &Entity) -> Result<()> {
        self.store.link(&self.owner_id, &self.name, record)?;
        self.record(|stats| stats.links += 1);
        Ok(())
    }

    fn unlink(&mut self, record: &Entity) -> Result<()> {
        self.store.unlink(&self.owner_id, &self.name, record)?;
        self.record(|stats| stats.unlinks += 1);
        Ok(())
    }
}
