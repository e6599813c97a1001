// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use common::value::Val;
use indexmap::IndexMap;
use mutation_model::{
    record::{Record, RecordId},
    relation::{Relation, RelationKind},
    schema::Schema,
};
use tracing::{debug, trace};

use super::{PivotData, RecordStore, StoreError, SyncChanges, SyncSet};

type Row = IndexMap<String, Val>;

#[derive(Debug, Clone, Default)]
struct Table {
    last_id: i64,
    rows: IndexMap<RecordId, Row>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    tables: IndexMap<String, Table>,
    pivots: IndexMap<String, Vec<Row>>,
}

/// A [`RecordStore`] keeping every table in memory.
///
/// Enforces the constraints a relational backend would: unique fields, foreign keys of
/// belongs-to relations must point at existing rows, and rows still referenced by a foreign key
/// cannot be deleted. Transactions snapshot the whole state on `begin`.
pub struct MemoryStore {
    schema: Arc<Schema>,
    state: StoreState,
    snapshot: Option<StoreState>,
}

fn matches_id(value: Option<&Val>, id: &RecordId) -> bool {
    value.and_then(RecordId::from_val).as_ref() == Some(id)
}

impl MemoryStore {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            state: StoreState::default(),
            snapshot: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Read a row without going through the async interface
    pub fn get(&self, entity: &str, id: &RecordId) -> Option<Record> {
        self.state
            .tables
            .get(entity)
            .and_then(|table| table.rows.get(id))
            .map(|row| Record::with_fields(entity, id.clone(), row.clone()))
    }

    /// All rows of a type, in insertion order
    pub fn records(&self, entity: &str) -> Vec<Record> {
        self.state
            .tables
            .get(entity)
            .map(|table| {
                table
                    .rows
                    .iter()
                    .map(|(id, row)| Record::with_fields(entity, id.clone(), row.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All rows of a pivot table, including their key columns
    pub fn pivot_rows(&self, pivot: &str) -> Vec<Row> {
        self.state.pivots.get(pivot).cloned().unwrap_or_default()
    }

    fn exists(&self, entity: &str, id: &RecordId) -> bool {
        self.state
            .tables
            .get(entity)
            .is_some_and(|table| table.rows.contains_key(id))
    }

    fn check_constraints(&self, record: &Record) -> Result<(), StoreError> {
        let entity = self.schema.entity(record.entity())?;

        for relation in &entity.relations {
            if relation.kind != RelationKind::BelongsTo {
                continue;
            }
            if let Some(target_id) = record.related_id(relation) {
                if !self.exists(&relation.target, &target_id) {
                    return Err(StoreError::Validation(format!(
                        "{}.{} references missing {} {}",
                        entity.name, relation.foreign_key, relation.target, target_id
                    )));
                }
            }
        }

        let rows = self.state.tables.get(&entity.name);
        for field in &entity.unique {
            let Some(value) = record.get(field).filter(|value| !value.is_null()) else {
                continue;
            };
            let duplicate = rows.is_some_and(|table| {
                table
                    .rows
                    .iter()
                    .any(|(id, row)| Some(id) != record.id() && row.get(field) == Some(value))
            });
            if duplicate {
                return Err(StoreError::Validation(format!(
                    "duplicate value {value} for {}.{field}",
                    entity.name
                )));
            }
        }

        Ok(())
    }

    /// Fail if some row outside the row itself still holds a foreign key to it
    fn check_unreferenced(&self, entity: &str, id: &RecordId) -> Result<(), StoreError> {
        for (owner, relation) in self.schema.referencing_relations(entity) {
            let Some(table) = self.state.tables.get(&owner.name) else {
                continue;
            };
            let referenced = table.rows.iter().any(|(row_id, row)| {
                !(owner.name == entity && row_id == id)
                    && matches_id(row.get(&relation.foreign_key), id)
            });
            if referenced {
                return Err(StoreError::Validation(format!(
                    "{entity} {id} is still referenced by {}.{}",
                    owner.name, relation.foreign_key
                )));
            }
        }
        Ok(())
    }

    fn remove_row(&mut self, entity: &str, id: &RecordId) -> Result<(), StoreError> {
        self.check_unreferenced(entity, id)?;

        if let Some(table) = self.state.tables.get_mut(entity) {
            table.rows.shift_remove(id);
        }

        // Pivot rows pointing at a deleted record go with it
        for (owner, relation) in self.pivot_relations_touching(entity) {
            let Some(pivot) = &relation.pivot else {
                continue;
            };
            let column = if owner == entity {
                relation.foreign_key.clone()
            } else {
                relation.related_key.clone().unwrap_or_default()
            };
            if let Some(rows) = self.state.pivots.get_mut(pivot) {
                rows.retain(|row| !matches_id(row.get(&column), id));
            }
        }

        debug!(entity, %id, "deleted");
        Ok(())
    }

    /// Many-to-many relations whose pivot table has a column pointing at `entity`
    fn pivot_relations_touching(&self, entity: &str) -> Vec<(String, Relation)> {
        self.schema
            .entities()
            .flat_map(|owner| {
                owner
                    .relations
                    .iter()
                    .filter(move |relation| {
                        relation.kind == RelationKind::ManyToMany
                            && (owner.name == entity || relation.target == entity)
                    })
                    .map(move |relation| (owner.name.clone(), relation.clone()))
            })
            .collect()
    }

    fn dependent_ids(&self, relation: &Relation, parent_id: &RecordId) -> Vec<RecordId> {
        self.state
            .tables
            .get(&relation.target)
            .map(|table| {
                table
                    .rows
                    .iter()
                    .filter(|(_, row)| matches_id(row.get(&relation.foreign_key), parent_id))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn cascade_delete_row(
        &mut self,
        entity: &str,
        id: &RecordId,
        visited: &mut HashSet<(String, RecordId)>,
    ) -> Result<(), StoreError> {
        if !visited.insert((entity.to_string(), id.clone())) || !self.exists(entity, id) {
            return Ok(());
        }

        let relations = self.schema.entity(entity)?.relations.clone();
        for relation in &relations {
            match relation.kind {
                RelationKind::BelongsTo => {}
                RelationKind::OneToOne | RelationKind::OneToMany => {
                    for dependent in self.dependent_ids(relation, id) {
                        if relation.cascade {
                            self.cascade_delete_row(&relation.target, &dependent, visited)?;
                        } else if let Some(row) = self
                            .state
                            .tables
                            .get_mut(&relation.target)
                            .and_then(|table| table.rows.get_mut(&dependent))
                        {
                            row.insert(relation.foreign_key.clone(), Val::Null);
                            trace!(
                                entity = %relation.target,
                                %dependent,
                                "cleared {}",
                                relation.foreign_key
                            );
                        }
                    }
                }
                RelationKind::ManyToMany => {
                    let Some(pivot) = &relation.pivot else {
                        continue;
                    };
                    if let Some(rows) = self.state.pivots.get_mut(pivot) {
                        rows.retain(|row| !matches_id(row.get(&relation.foreign_key), id));
                    }
                }
            }
        }

        self.remove_row(entity, id)
    }

    fn pivot_columns<'a>(
        relation: &'a Relation,
    ) -> Result<(&'a str, &'a str, &'a str), StoreError> {
        match (&relation.pivot, &relation.related_key) {
            (Some(pivot), Some(related_key)) => Ok((
                pivot.as_str(),
                relation.foreign_key.as_str(),
                related_key.as_str(),
            )),
            _ => Err(StoreError::Validation(format!(
                "relation {} has no pivot table",
                relation.name
            ))),
        }
    }

    fn persisted_id<'a>(parent: &'a Record) -> Result<&'a RecordId, StoreError> {
        parent.id().ok_or_else(|| {
            StoreError::Validation(format!("{} has not been saved yet", parent.entity()))
        })
    }

    fn attached_ids(
        &self,
        relation: &Relation,
        parent_id: &RecordId,
    ) -> Result<Vec<RecordId>, StoreError> {
        let (pivot, foreign_key, related_key) = Self::pivot_columns(relation)?;
        Ok(self
            .state
            .pivots
            .get(pivot)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_id(row.get(foreign_key), parent_id))
                    .filter_map(|row| row.get(related_key).and_then(RecordId::from_val))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn attach_row(
        &mut self,
        parent_id: &RecordId,
        relation: &Relation,
        id: &RecordId,
        pivot_data: PivotData,
    ) -> Result<(), StoreError> {
        if !self.exists(&relation.target, id) {
            return Err(StoreError::Validation(format!(
                "cannot attach missing {} {id}",
                relation.target
            )));
        }

        let (pivot, foreign_key, related_key) = Self::pivot_columns(relation)?;
        let rows = self.state.pivots.entry(pivot.to_string()).or_default();

        match rows.iter_mut().find(|row| {
            matches_id(row.get(foreign_key), parent_id) && matches_id(row.get(related_key), id)
        }) {
            Some(row) => row.extend(pivot_data),
            None => {
                let mut row = Row::new();
                row.insert(foreign_key.to_string(), parent_id.into());
                row.insert(related_key.to_string(), id.into());
                row.extend(pivot_data);
                rows.push(row);
            }
        }

        trace!(pivot, %parent_id, %id, "attached");
        Ok(())
    }

    fn detach_row(
        &mut self,
        parent_id: &RecordId,
        relation: &Relation,
        id: &RecordId,
    ) -> Result<(), StoreError> {
        let (pivot, foreign_key, related_key) = Self::pivot_columns(relation)?;
        if let Some(rows) = self.state.pivots.get_mut(pivot) {
            rows.retain(|row| {
                !(matches_id(row.get(foreign_key), parent_id)
                    && matches_id(row.get(related_key), id))
            });
        }
        trace!(pivot, %parent_id, %id, "detached");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&mut self, entity: &str, id: &RecordId) -> Result<Option<Record>, StoreError> {
        self.schema.entity(entity)?;
        Ok(self.get(entity, id))
    }

    async fn save(&mut self, record: &mut Record) -> Result<(), StoreError> {
        self.check_constraints(record)?;

        let table = self
            .state
            .tables
            .entry(record.entity().to_string())
            .or_default();

        let id = match record.id() {
            Some(id) => {
                if let RecordId::Int(n) = id {
                    table.last_id = table.last_id.max(*n);
                }
                id.clone()
            }
            None => {
                table.last_id += 1;
                RecordId::Int(table.last_id)
            }
        };

        let row = table.rows.entry(id.clone()).or_default();
        row.extend(record.fields().iter().map(|(k, v)| (k.clone(), v.clone())));

        *record = Record::with_fields(record.entity(), id, row.clone());
        debug!(entity = record.entity(), id = ?record.id(), "saved");
        Ok(())
    }

    async fn delete(&mut self, entity: &str, id: &RecordId) -> Result<(), StoreError> {
        self.schema.entity(entity)?;
        if !self.exists(entity, id) {
            return Ok(());
        }
        self.remove_row(entity, id)
    }

    async fn cascade_delete(&mut self, entity: &str, id: &RecordId) -> Result<(), StoreError> {
        self.cascade_delete_row(entity, id, &mut HashSet::new())
    }

    async fn related(
        &mut self,
        parent: &Record,
        relation: &Relation,
    ) -> Result<Vec<Record>, StoreError> {
        if relation.kind == RelationKind::BelongsTo {
            return Ok(parent
                .related_id(relation)
                .and_then(|id| self.get(&relation.target, &id))
                .into_iter()
                .collect());
        }

        let Some(parent_id) = parent.id() else {
            return Ok(vec![]);
        };

        let ids = match relation.kind {
            RelationKind::ManyToMany => self.attached_ids(relation, parent_id)?,
            _ => self.dependent_ids(relation, parent_id),
        };

        Ok(ids
            .iter()
            .filter_map(|id| self.get(&relation.target, id))
            .collect())
    }

    async fn attach(
        &mut self,
        parent: &Record,
        relation: &Relation,
        id: &RecordId,
        pivot: PivotData,
    ) -> Result<(), StoreError> {
        let parent_id = Self::persisted_id(parent)?.clone();
        self.attach_row(&parent_id, relation, id, pivot)
    }

    async fn detach(
        &mut self,
        parent: &Record,
        relation: &Relation,
        id: &RecordId,
    ) -> Result<(), StoreError> {
        let parent_id = Self::persisted_id(parent)?.clone();
        self.detach_row(&parent_id, relation, id)
    }

    async fn sync(
        &mut self,
        parent: &Record,
        relation: &Relation,
        set: SyncSet,
    ) -> Result<SyncChanges, StoreError> {
        let parent_id = Self::persisted_id(parent)?.clone();
        let current = self.attached_ids(relation, &parent_id)?;
        let desired = set.ids();
        let mut changes = SyncChanges::default();

        for id in &current {
            if !desired.contains(id) {
                self.detach_row(&parent_id, relation, id)?;
                changes.detached.push(id.clone());
            }
        }

        for id in &desired {
            let pivot_data = set.pivot_data(id).cloned().unwrap_or_default();
            if !current.contains(id) {
                self.attach_row(&parent_id, relation, id, pivot_data)?;
                changes.attached.push(id.clone());
            } else if !pivot_data.is_empty() {
                self.attach_row(&parent_id, relation, id, pivot_data)?;
                changes.updated.push(id.clone());
            }
        }

        Ok(changes)
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.snapshot.is_some() {
            return Err(StoreError::Transaction(
                "a transaction is already open".to_string(),
            ));
        }
        self.snapshot = Some(self.state.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::Transaction("no open transaction to commit".to_string()))
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        let snapshot = self.snapshot.take().ok_or_else(|| {
            StoreError::Transaction("no open transaction to roll back".to_string())
        })?;
        self.state = snapshot;
        Ok(())
    }
}
