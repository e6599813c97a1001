// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use common::value::Val;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::relation::Relation;

/// Primary key of a record.
///
/// Ids arriving as numeric strings (GraphQL `ID` values) and ids arriving as numbers name the
/// same record, so numeric strings are normalized to [`RecordId::Int`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Interpret an argument value as an id. Returns `None` for `null`, objects, lists and
    /// non-integral numbers.
    pub fn from_val(val: &Val) -> Option<RecordId> {
        match val {
            Val::Number(n) => n.as_i64().map(RecordId::Int),
            Val::String(s) | Val::Enum(s) => Some(
                s.trim()
                    .parse::<i64>()
                    .map(RecordId::Int)
                    .unwrap_or_else(|_| RecordId::Str(s.clone())),
            ),
            _ => None,
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Int(value)
    }
}

impl From<&RecordId> for Val {
    fn from(value: &RecordId) -> Self {
        match value {
            RecordId::Int(n) => Val::from(*n),
            RecordId::Str(s) => Val::String(s.clone()),
        }
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{n}"),
            RecordId::Str(s) => write!(f, "{s}"),
        }
    }
}

/// A row of some entity type, as seen by the mutation engine.
///
/// Foreign keys of belongs-to relations are ordinary fields; [`Record::associate`] and
/// [`Record::dissociate`] only change them in memory, and take effect on the next save.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Record {
    entity: String,
    id: Option<RecordId>,
    fields: IndexMap<String, Val>,
}

impl Record {
    /// An empty, not yet persisted record of the given type
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: None,
            fields: IndexMap::new(),
        }
    }

    pub fn with_fields(
        entity: impl Into<String>,
        id: RecordId,
        fields: IndexMap<String, Val>,
    ) -> Self {
        Self {
            entity: entity.into(),
            id: Some(id),
            fields,
        }
    }

    /// An empty record of the same type
    pub fn new_instance(&self) -> Self {
        Self::new(self.entity.clone())
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    pub fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn get(&self, field: &str) -> Option<&Val> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Val) {
        self.fields.insert(field.into(), value);
    }

    pub fn fields(&self) -> &IndexMap<String, Val> {
        &self.fields
    }

    /// Point a belongs-to relation at the record with the given id
    pub fn associate(&mut self, relation: &Relation, id: &RecordId) {
        self.set(relation.foreign_key.clone(), id.into());
    }

    /// Clear the foreign key of a belongs-to relation
    pub fn dissociate(&mut self, relation: &Relation) {
        self.set(relation.foreign_key.clone(), Val::Null);
    }

    /// The id a belongs-to relation currently points at
    pub fn related_id(&self, relation: &Relation) -> Option<RecordId> {
        self.get(&relation.foreign_key).and_then(RecordId::from_val)
    }

    pub fn to_val(&self) -> Val {
        let mut object = IndexMap::new();
        if let Some(id) = &self.id {
            object.insert("id".to_string(), id.into());
        }
        object.extend(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        Val::Object(object)
    }
}
