// Entity containers owned by another entity (inventories, slots, storage)

use std::any::Any;
use std::collections::HashMap;
use thiserror::Error;

use crate::core::entity::EntityUid;

/// Container errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContainerError {
    #[error("Container not found: {0}")]
    NotFound(String),

    #[error("Container already exists: {0}")]
    AlreadyExists(String),

    #[error("Container '{id}' has type {actual}, expected {expected}")]
    TypeMismatch {
        id: String,
        expected: String,
        actual: String,
    },
}

/// A set of entities held by an owner
pub trait Container: Any {
    fn contains(&self, entity: EntityUid) -> bool;

    /// Returns `false` if the container refuses the entity
    fn insert(&mut self, entity: EntityUid) -> bool;

    fn remove(&mut self, entity: EntityUid) -> bool;

    fn entities(&self) -> Vec<EntityUid>;

    fn container_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Unbounded, insertion-ordered container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityContainer {
    entities: Vec<EntityUid>,
}

impl Container for EntityContainer {
    fn contains(&self, entity: EntityUid) -> bool {
        self.entities.contains(&entity)
    }

    fn insert(&mut self, entity: EntityUid) -> bool {
        if self.contains(entity) {
            return false;
        }
        self.entities.push(entity);
        true
    }

    fn remove(&mut self, entity: EntityUid) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| *e != entity);
        self.entities.len() != before
    }

    fn entities(&self) -> Vec<EntityUid> {
        self.entities.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Holds at most one entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotContainer {
    occupant: Option<EntityUid>,
}

impl SlotContainer {
    pub fn occupant(&self) -> Option<EntityUid> {
        self.occupant
    }
}

impl Container for SlotContainer {
    fn contains(&self, entity: EntityUid) -> bool {
        self.occupant == Some(entity)
    }

    fn insert(&mut self, entity: EntityUid) -> bool {
        if self.occupant.is_some() {
            return false;
        }
        self.occupant = Some(entity);
        true
    }

    fn remove(&mut self, entity: EntityUid) -> bool {
        if self.contains(entity) {
            self.occupant = None;
            return true;
        }
        false
    }

    fn entities(&self) -> Vec<EntityUid> {
        self.occupant.into_iter().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Named containers belonging to one owner entity
pub struct ContainerManager {
    owner: EntityUid,
    containers: HashMap<String, Box<dyn Container>>,
}

impl ContainerManager {
    pub fn new(owner: EntityUid) -> Self {
        Self {
            owner,
            containers: HashMap::new(),
        }
    }

    pub fn owner(&self) -> EntityUid {
        self.owner
    }

    /// Create a new container; an existing ID is an error
    pub fn make_container<T: Container + Default>(&mut self, id: &str) -> Result<&mut T, ContainerError> {
        if self.containers.contains_key(id) {
            return Err(ContainerError::AlreadyExists(id.to_string()));
        }
        self.containers.insert(id.to_string(), Box::new(T::default()));
        log::trace!("Created container '{}' on {}", id, self.owner);
        self.get_container_mut::<T>(id)
    }

    /// Get the container with this ID, creating it if missing.
    ///
    /// An existing container of another type is an error naming both types.
    pub fn ensure_container<T: Container + Default>(&mut self, id: &str) -> Result<&mut T, ContainerError> {
        if !self.containers.contains_key(id) {
            return self.make_container::<T>(id);
        }
        self.get_container_mut::<T>(id)
    }

    pub fn get_container_mut<T: Container>(&mut self, id: &str) -> Result<&mut T, ContainerError> {
        let container = self
            .containers
            .get_mut(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        let actual = container.container_type();

        container
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| ContainerError::TypeMismatch {
                id: id.to_string(),
                expected: std::any::type_name::<T>().to_string(),
                actual: actual.to_string(),
            })
    }

    pub fn get_container(&self, id: &str) -> Option<&dyn Container> {
        self.containers.get(id).map(|c| c.as_ref())
    }

    pub fn has_container(&self, id: &str) -> bool {
        self.containers.contains_key(id)
    }

    pub fn remove_container(&mut self, id: &str) -> Option<Box<dyn Container>> {
        self.containers.remove(id)
    }

    /// ID of the container holding `entity`, if any
    pub fn container_of(&self, entity: EntityUid) -> Option<&str> {
        self.containers
            .iter()
            .find(|(_, c)| c.contains(entity))
            .map(|(id, _)| id.as_str())
    }

    pub fn contains_entity(&self, entity: EntityUid) -> bool {
        self.container_of(entity).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_returns_existing() {
        let mut containers = ContainerManager::new(EntityUid(1));
        containers
            .ensure_container::<EntityContainer>("storage")
            .unwrap()
            .insert(EntityUid(2));

        let storage = containers.ensure_container::<EntityContainer>("storage").unwrap();
        assert_eq!(storage.entities(), vec![EntityUid(2)]);
        assert_eq!(containers.container_of(EntityUid(2)), Some("storage"));
    }

    #[test]
    fn test_ensure_with_wrong_type_names_it() {
        let mut containers = ContainerManager::new(EntityUid(1));
        containers.make_container::<SlotContainer>("hand").unwrap();

        let err = containers
            .ensure_container::<EntityContainer>("hand")
            .err()
            .unwrap();
        match &err {
            ContainerError::TypeMismatch { id, actual, .. } => {
                assert_eq!(id, "hand");
                assert!(actual.ends_with("SlotContainer"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("SlotContainer"));
    }

    #[test]
    fn test_make_twice_fails() {
        let mut containers = ContainerManager::new(EntityUid(1));
        containers.make_container::<EntityContainer>("a").unwrap();
        assert_eq!(
            containers.make_container::<EntityContainer>("a").err(),
            Some(ContainerError::AlreadyExists("a".to_string()))
        );
    }

    #[test]
    fn test_slot_holds_one() {
        let mut slot = SlotContainer::default();
        assert!(slot.insert(EntityUid(3)));
        assert!(!slot.insert(EntityUid(4)));
        assert!(slot.remove(EntityUid(3)));
        assert_eq!(slot.occupant(), None);
    }
}
