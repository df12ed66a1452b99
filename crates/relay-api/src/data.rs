//! # Persistence
//!
//! A generic repository over an in-memory table.
//!
//! [`InMemoryStore`] is the process-wide table, shared by cloning. Handlers
//! never write to it directly: each call opens a [`UnitOfWork`] that stages
//! additions and applies them in one [`commit`](Repository::commit), which
//! assigns identity keys the way a database would.
//!
//! All locking is synchronous (`parking_lot`) and no lock is held across an
//! `.await`.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A persisted record with an integer identity key. `0` means unassigned.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> i32;
    fn set_id(&mut self, id: i32);
}

/// Persistence failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// An entity with an explicit key collides with a stored one.
    #[error("duplicate key: {0}")]
    DuplicateKey(i32),

    /// No identity key is left after the highest one stored.
    #[error("identity key space exhausted")]
    KeySpaceExhausted,
}

/// Generic repository contract.
pub trait Repository<T: Entity> {
    /// Stage an entity for insertion.
    fn add(&mut self, entity: T);

    /// All committed entities matching `predicate`.
    fn query(&self, predicate: impl Fn(&T) -> bool) -> Vec<T>;

    /// Apply staged changes, returning the stored entities with keys assigned.
    fn commit(&mut self) -> Result<Vec<T>, DataError>;
}

#[derive(Debug)]
struct Table<T> {
    rows: Vec<T>,
    next_id: i32,
}

/// Thread-safe, cloneable in-memory table.
#[derive(Debug)]
pub struct InMemoryStore<T> {
    table: Arc<RwLock<Table<T>>>,
}

impl<T> Clone for InMemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<T: Entity> InMemoryStore<T> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(Table {
                rows: Vec::new(),
                next_id: 1,
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Open a unit of work against this table.
    pub fn unit_of_work(&self) -> UnitOfWork<T> {
        UnitOfWork {
            store: self.clone(),
            pending: Vec::new(),
        }
    }
}

impl<T: Entity> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Call-scoped change set over an [`InMemoryStore`].
///
/// Queries see committed rows only. Dropping a unit of work without
/// committing discards its staged additions.
#[derive(Debug)]
pub struct UnitOfWork<T> {
    store: InMemoryStore<T>,
    pending: Vec<T>,
}

impl<T: Entity> UnitOfWork<T> {
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl<T: Entity> Repository<T> for UnitOfWork<T> {
    fn add(&mut self, entity: T) {
        self.pending.push(entity);
    }

    fn query(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.store
            .table
            .read()
            .rows
            .iter()
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }

    fn commit(&mut self) -> Result<Vec<T>, DataError> {
        let mut table = self.store.table.write();

        // Plan the whole batch before touching the table.
        let mut next_id = table.next_id;
        let mut taken: HashSet<i32> = table.rows.iter().map(|row| row.id()).collect();
        let mut saved = Vec::with_capacity(self.pending.len());
        for entity in &self.pending {
            let mut entity = entity.clone();
            if entity.id() == 0 {
                entity.set_id(next_id);
            }
            let id = entity.id();
            if !taken.insert(id) {
                return Err(DataError::DuplicateKey(id));
            }
            let after = id.checked_add(1).ok_or(DataError::KeySpaceExhausted)?;
            next_id = next_id.max(after);
            saved.push(entity);
        }

        table.rows.extend(saved.iter().cloned());
        table.next_id = next_id;
        self.pending.clear();

        tracing::debug!(rows = saved.len(), next_id, "unit of work committed");
        Ok(saved)
    }
}

// ── Entities ────────────────────────────────────────────────────────────────

/// A blog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: i32,
    pub title: String,
    pub created_by: String,
}

impl Entity for Blog {
    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }
}
