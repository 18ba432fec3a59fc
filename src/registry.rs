//! Owning registries, one per workflow kind
use super::error::WorkflowError;
use super::history::{History, Status};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowKind {
    HrRequest,
    BudgetRequest,
    Negotiation,
    EventApplication,
    Task,
}

/// Common surface of every tracked instance
pub trait Workflow: Clone {
    type Status: Status;
    const KIND: WorkflowKind;

    fn id(&self) -> u64;
    fn history(&self) -> &History<Self::Status>;
    /// One line description used in listings
    fn headline(&self) -> String;

    fn status(&self) -> Self::Status {
        self.history().current()
    }

    fn summary(&self) -> Summary {
        Summary {
            kind: Self::KIND,
            id: self.id(),
            headline: self.headline(),
            status: self.status().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub kind: WorkflowKind,
    pub id: u64,
    pub headline: String,
    pub status: String,
}

/// Instances keyed by id. Ids start at 1 and are never reused.
///
/// The map lock is only held long enough to find an instance, all reads and writes
/// of the instance itself go through its own mutex.
pub struct Registry<T> {
    entries: RwLock<Entries<T>>,
}

struct Entries<T> {
    next_id: u64,
    map: BTreeMap<u64, Arc<Mutex<T>>>,
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowKind::HrRequest => f.write_str("HR request"),
            WorkflowKind::BudgetRequest => f.write_str("budget request"),
            WorkflowKind::Negotiation => f.write_str("negotiation"),
            WorkflowKind::EventApplication => f.write_str("event application"),
            WorkflowKind::Task => f.write_str("task"),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[#{}] {} ({})", self.id, self.headline, self.status)
    }
}

impl<T: Workflow> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries {
                next_id: 1,
                map: BTreeMap::new(),
            }),
        }
    }

    /// Build and store a new instance under the next id. A failed build consumes no id.
    pub fn insert_with<F>(&self, build: F) -> Result<T, WorkflowError>
    where
        F: FnOnce(u64) -> Result<T, WorkflowError>,
    {
        let mut entries = self.entries.write();
        let id = entries.next_id;
        let instance = build(id)?;

        entries.next_id += 1;
        entries
            .map
            .insert(id, Arc::new(Mutex::new(instance.clone())));

        Ok(instance)
    }

    pub fn handle(&self, id: u64) -> Result<Arc<Mutex<T>>, WorkflowError> {
        self.entries
            .read()
            .map
            .get(&id)
            .cloned()
            .ok_or(WorkflowError::NotFound { kind: T::KIND, id })
    }

    /// Snapshot of a single instance
    pub fn get(&self, id: u64) -> Result<T, WorkflowError> {
        let handle = self.handle(id)?;
        let instance = handle.lock().clone();
        Ok(instance)
    }

    /// Run `apply` under the instance's exclusive lock and hand back a snapshot of the result
    pub fn update<F>(&self, id: u64, apply: F) -> Result<T, WorkflowError>
    where
        F: FnOnce(&mut T) -> Result<(), WorkflowError>,
    {
        let handle = self.handle(id)?;
        let mut instance = handle.lock();
        apply(&mut *instance)?;
        Ok(instance.clone())
    }

    /// Snapshots of every instance in creation order
    pub fn list(&self) -> Vec<T> {
        let handles: Vec<Arc<Mutex<T>>> = self.entries.read().map.values().cloned().collect();
        handles.iter().map(|handle| handle.lock().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Workflow> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
