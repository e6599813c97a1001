// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The persistence interface the mutation engine drives.
//!
//! The engine never talks to a database directly. Everything it needs from the underlying
//! object-relational layer (loading, saving and deleting records, following relations,
//! maintaining pivot rows and bracketing the work in a transaction) goes through [`RecordStore`].

mod memory_store;

pub use memory_store::MemoryStore;

use async_trait::async_trait;
use common::value::Val;
use indexmap::IndexMap;
use mutation_model::{
    record::{Record, RecordId},
    relation::Relation,
    schema::SchemaError,
};
use thiserror::Error;

/// Extra columns of a pivot row, beyond the two keys
pub type PivotData = IndexMap<String, Val>;

/// The desired membership of a many-to-many relation
#[derive(Debug, Clone, PartialEq)]
pub enum SyncSet {
    /// Bare ids; pivot data of rows that stay attached is left alone
    Ids(Vec<RecordId>),
    /// Ids with the pivot data each row should carry
    WithPivot(IndexMap<RecordId, PivotData>),
}

impl SyncSet {
    pub fn ids(&self) -> Vec<RecordId> {
        match self {
            SyncSet::Ids(ids) => ids.clone(),
            SyncSet::WithPivot(map) => map.keys().cloned().collect(),
        }
    }

    pub fn pivot_data(&self, id: &RecordId) -> Option<&PivotData> {
        match self {
            SyncSet::Ids(_) => None,
            SyncSet::WithPivot(map) => map.get(id),
        }
    }
}

/// What a [`RecordStore::sync`] call changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncChanges {
    pub attached: Vec<RecordId>,
    pub detached: Vec<RecordId>,
    pub updated: Vec<RecordId>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// A constraint rejected the write (duplicate unique value, dangling or still-referenced key)
    #[error("Validation: {0}")]
    Validation(String),

    #[error("Failed to execute transaction: {0}")]
    Transaction(String),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0} {1}")]
    WithContext(String, #[source] Box<StoreError>),
}

impl StoreError {
    pub fn with_context(self, context: String) -> StoreError {
        StoreError::WithContext(context, Box::new(self))
    }

    /// Whether this is a constraint violation, looking through any context
    pub fn is_validation(&self) -> bool {
        match self {
            StoreError::Validation(_) => true,
            StoreError::WithContext(_, inner) => inner.is_validation(),
            _ => false,
        }
    }
}

/// Record persistence and relation access, as provided by the surrounding ORM.
///
/// All calls made while a transaction is open (between [`RecordStore::begin`] and
/// [`RecordStore::commit`]/[`RecordStore::rollback`]) must be undone together on rollback.
#[async_trait]
pub trait RecordStore: Send {
    async fn find(&mut self, entity: &str, id: &RecordId) -> Result<Option<Record>, StoreError>;

    /// Insert (assigning an id) or update the record. On return, `record` reflects the stored
    /// row.
    async fn save(&mut self, record: &mut Record) -> Result<(), StoreError>;

    /// Delete a single row. Fails if other rows still hold a foreign key to it.
    async fn delete(&mut self, entity: &str, id: &RecordId) -> Result<(), StoreError>;

    /// Delete a row together with its dependents, following the type's cascade rules
    async fn cascade_delete(&mut self, entity: &str, id: &RecordId) -> Result<(), StoreError>;

    /// Records currently behind `relation` of `parent`
    async fn related(
        &mut self,
        parent: &Record,
        relation: &Relation,
    ) -> Result<Vec<Record>, StoreError>;

    /// Link `id` to `parent` through a many-to-many relation. Attaching an already attached
    /// record merges the pivot data into the existing row.
    async fn attach(
        &mut self,
        parent: &Record,
        relation: &Relation,
        id: &RecordId,
        pivot: PivotData,
    ) -> Result<(), StoreError>;

    async fn detach(
        &mut self,
        parent: &Record,
        relation: &Relation,
        id: &RecordId,
    ) -> Result<(), StoreError>;

    /// Make the many-to-many membership exactly `set`: attach missing ids, detach the rest and
    /// update pivot data of the ids that stay
    async fn sync(
        &mut self,
        parent: &Record,
        relation: &Relation,
        set: SyncSet,
    ) -> Result<SyncChanges, StoreError>;

    async fn begin(&mut self) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;

    /// Reload a persisted record
    async fn refresh(&mut self, record: &Record) -> Result<Option<Record>, StoreError> {
        match record.id() {
            Some(id) => self.find(record.entity(), id).await,
            None => Ok(None),
        }
    }
}
