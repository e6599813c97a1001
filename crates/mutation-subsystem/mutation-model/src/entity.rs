// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use crate::{capability::Capabilities, relation::Relation};

/// Accessor table for one model type: its plain fields, its relations and what nested
/// mutations may do to it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityType {
    pub name: String,
    /// Plain (non-relation) fields, in the schema's field case. Belongs-to foreign keys are
    /// plain fields too.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Capability descriptor consulted when this type is the target of a nested mutation.
    /// `None` means nested mutations may not create, update or delete records of this type.
    #[serde(default)]
    pub availability: Option<Capabilities>,
    /// Fields whose values must be unique across all records of this type
    #[serde(default)]
    pub unique: Vec<String>,
    /// For a member of a union, the type holding the union. The holding type must declare a
    /// one-to-one relation named after this type.
    #[serde(default)]
    pub union_parent: Option<String>,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![],
            relations: vec![],
            availability: None,
            unique: vec![],
            union_parent: None,
        }
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn with_availability(mut self, availability: Capabilities) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn with_unique(mut self, field: &str) -> Self {
        self.unique.push(field.to_string());
        self
    }

    pub fn with_union_parent(mut self, parent: &str) -> Self {
        self.union_parent = Some(parent.to_string());
        self
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field == name)
    }
}
