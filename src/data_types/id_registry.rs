
use rustc_hash::FxHashMap as HashMap;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("key {key} was never registered")]
    KeyNotFound { key: String },
    #[error("id {id} was never issued")]
    IdNotFound { id: i32 },
    #[error("key {key} is already registered")]
    DuplicateKey { key: String },
    #[error("id {id} is already assigned to another key")]
    DuplicateId { id: i32 }
}

/// Bijective mapping from arbitrary keys (usually contig names) to integer ids.
/// Ids are handed out on first sight and never reused, so they remain stable for the lifetime of the registry.
#[derive(Clone, Debug)]
pub struct IdRegistry<K: Clone + Debug + Eq + Hash> {
    /// Forward lookup
    key_to_id: HashMap<K, i32>,
    /// Reverse lookup, ordered so iteration is by id
    id_to_key: BTreeMap<i32, K>,
    /// The next id that `try_insert` will hand out
    next_id: i32
}

impl<K: Clone + Debug + Eq + Hash> IdRegistry<K> {
    /// Creates an empty registry.
    /// # Arguments
    /// * `zero_based` - if true, ids start at 0 and are dense array indices in first-seen order; otherwise 0 is reserved and ids start at 1
    pub fn new(zero_based: bool) -> IdRegistry<K> {
        IdRegistry {
            key_to_id: Default::default(),
            id_to_key: Default::default(),
            next_id: if zero_based { 0 } else { 1 }
        }
    }

    /// Returns the id for `key`, allocating the next sequential id if the key has not been seen before.
    /// # Arguments
    /// * `key` - the key to look up or register
    pub fn try_insert(&mut self, key: K) -> i32 {
        if let Some(&id) = self.key_to_id.get(&key) {
            return id;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.id_to_key.insert(id, key.clone());
        self.key_to_id.insert(key, id);
        id
    }

    /// Registers a key that must not already exist, returning its new id.
    /// # Errors
    /// * `DuplicateKey` if the key was already registered
    pub fn insert(&mut self, key: K) -> Result<i32, RegistryError> {
        if self.key_to_id.contains_key(&key) {
            return Err(RegistryError::DuplicateKey { key: format!("{key:?}") });
        }
        Ok(self.try_insert(key))
    }

    /// Registers a key under an externally issued id.
    /// Later calls to `try_insert` continue above the largest id seen so far.
    /// # Errors
    /// * `DuplicateKey` if the key was already registered
    /// * `DuplicateId` if the id is already in use
    pub fn insert_with_id(&mut self, key: K, id: i32) -> Result<(), RegistryError> {
        if self.key_to_id.contains_key(&key) {
            return Err(RegistryError::DuplicateKey { key: format!("{key:?}") });
        }
        if self.id_to_key.contains_key(&id) {
            return Err(RegistryError::DuplicateId { id });
        }

        self.id_to_key.insert(id, key.clone());
        self.key_to_id.insert(key, id);
        self.next_id = self.next_id.max(id + 1);
        Ok(())
    }

    /// Forward lookup.
    /// # Errors
    /// * `KeyNotFound` if the key was never inserted
    pub fn get_id(&self, key: &K) -> Result<i32, RegistryError> {
        match self.key_to_id.get(key) {
            Some(&id) => Ok(id),
            None => Err(RegistryError::KeyNotFound { key: format!("{key:?}") })
        }
    }

    /// Reverse lookup.
    /// # Errors
    /// * `IdNotFound` if the id was never issued
    pub fn get_key(&self, id: i32) -> Result<&K, RegistryError> {
        self.id_to_key.get(&id)
            .ok_or(RegistryError::IdNotFound { id })
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.key_to_id.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.id_to_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_key.is_empty()
    }

    /// Iterates over all `(id, key)` pairs in increasing id order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &K)> {
        self.id_to_key.iter().map(|(&id, key)| (id, key))
    }
}

impl<K: Clone + Debug + Eq + Hash> Default for IdRegistry<K> {
    fn default() -> Self {
        IdRegistry::new(true)
    }
}
