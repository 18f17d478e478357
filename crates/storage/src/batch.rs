//! Batch transaction coordinator.
//!
//! Multi-key writes are collected into a [`Batch`] and handed to a backend
//! in one call. The SQLite backend applies a batch inside a single
//! transaction; host storage applies each mutation independently.

use serde_json::{Map, Value};

/// One write inside a batch. Keys are fully qualified.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert or replace the raw stored value.
    Put { key: String, value: Value },
    /// Delete the record if it exists.
    Delete { key: String },
}

/// Ordered list of mutations applied as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    mutations: Vec<Mutation>,
}

impl Batch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch of upserts from raw `(key, value)` pairs.
    pub fn puts<I>(items: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            mutations: items.into_iter().map(|(key, value)| Mutation::Put { key, value }).collect(),
        }
    }

    /// Batch of deletes.
    pub fn deletes<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self { mutations: keys.into_iter().map(|key| Mutation::Delete { key }).collect() }
    }

    pub fn put(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.mutations.push(Mutation::Put { key: key.into(), value });
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.mutations.push(Mutation::Delete { key: key.into() });
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Split into consecutive runs of upserts and deletes, preserving order.
    ///
    /// Host storage only offers bulk `set` and bulk `remove`, so each run
    /// becomes one host call.
    #[must_use]
    pub fn into_runs(self) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();
        for mutation in self.mutations {
            match mutation {
                Mutation::Put { key, value } => {
                    if let Some(Run::Puts(items)) = runs.last_mut() {
                        items.insert(key, value);
                    } else {
                        let mut items = Map::new();
                        items.insert(key, value);
                        runs.push(Run::Puts(items));
                    }
                },
                Mutation::Delete { key } => {
                    if let Some(Run::Deletes(keys)) = runs.last_mut() {
                        keys.push(key);
                    } else {
                        runs.push(Run::Deletes(vec![key]));
                    }
                },
            }
        }
        runs
    }
}

impl IntoIterator for Batch {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_iter()
    }
}

/// A run of same-kind mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum Run {
    Puts(Map<String, Value>),
    Deletes(Vec<String>),
}
