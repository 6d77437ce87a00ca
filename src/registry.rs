//! In-memory allowlist of wakeable machines.

use crate::machine::{Machine, MachineError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("invalid machine '{id}' at index {index}")]
    InvalidMachine {
        index: usize,
        id: String,
        #[source]
        source: MachineError,
    },
    #[error("duplicate machine ID: {0}")]
    DuplicateId(String),
    #[error("machine not found")]
    NotFound,
}

/// Validated machine allowlist, built once at startup and read-only
/// afterwards. The lock exists only as a guard; there are no writers
/// after construction.
#[derive(Debug)]
pub struct Registry {
    machines: RwLock<HashMap<String, Arc<Machine>>>,
}

impl Registry {
    /// Builds a registry from raw machine records, failing on the
    /// first invalid or duplicate entry. No partially-built registry
    /// is ever returned.
    pub fn new(records: Vec<Machine>) -> Result<Registry, RegistryError> {
        let mut machines = HashMap::with_capacity(records.len());
        for (index, machine) in records.into_iter().enumerate() {
            machine
                .validate()
                .map_err(|source| RegistryError::InvalidMachine {
                    index,
                    id: machine.id.clone(),
                    source,
                })?;
            if machines.contains_key(&machine.id) {
                return Err(RegistryError::DuplicateId(machine.id));
            }
            machines.insert(machine.id.clone(), Arc::new(machine));
        }
        Ok(Registry {
            machines: RwLock::new(machines),
        })
    }

    pub fn get_by_id(&self, id: &str) -> Result<Arc<Machine>, RegistryError> {
        let machines = self.machines.read().expect("registry lock poisoned");
        machines.get(id).cloned().ok_or(RegistryError::NotFound)
    }

    /// All registered machines, in no particular order. Empty registry
    /// yields an empty vec.
    pub fn get_all(&self) -> Vec<Arc<Machine>> {
        let machines = self.machines.read().expect("registry lock poisoned");
        machines.values().cloned().collect()
    }

    pub fn exists(&self, id: &str) -> bool {
        let machines = self.machines.read().expect("registry lock poisoned");
        machines.contains_key(id)
    }

    pub fn len(&self) -> usize {
        let machines = self.machines.read().expect("registry lock poisoned");
        machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
