// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    entity::EntityType,
    naming::FieldCase,
    relation::{Relation, RelationKind},
};

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown type '{0}'")]
    UnknownEntity(String),

    #[error("Type '{0}' is defined more than once")]
    DuplicateEntity(String),

    #[error("Type '{entity}' has no relation '{relation}'")]
    UnknownRelation { entity: String, relation: String },

    #[error("Relation '{entity}.{relation}' points to unknown type '{target}'")]
    UnknownRelationTarget {
        entity: String,
        relation: String,
        target: String,
    },

    #[error("Invalid relation '{entity}.{relation}': {message}")]
    InvalidRelation {
        entity: String,
        relation: String,
        message: String,
    },

    #[error("Invalid schema definition: {0}")]
    Definition(#[from] serde_json::Error),
}

/// The relation-name lookup shared by the resolvers: every entity type, keyed by name
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: IndexMap<String, EntityType>,
    field_case: FieldCase,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaDefinition {
    #[serde(default)]
    field_case: FieldCase,
    entities: Vec<EntityType>,
}

impl Schema {
    pub fn new(entities: Vec<EntityType>) -> Result<Self, SchemaError> {
        let mut map = IndexMap::new();
        for entity in entities {
            if map.contains_key(&entity.name) {
                return Err(SchemaError::DuplicateEntity(entity.name));
            }
            map.insert(entity.name.clone(), entity);
        }

        let schema = Self {
            entities: map,
            field_case: FieldCase::default(),
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Load a schema from its JSON definition:
    /// `{"fieldCase": "camel", "entities": [{"name": "Venue", "fields": [...], ...}]}`
    pub fn from_json(definition: serde_json::Value) -> Result<Self, SchemaError> {
        let SchemaDefinition {
            field_case,
            entities,
        } = serde_json::from_value(definition)?;
        Ok(Self::new(entities)?.with_field_case(field_case))
    }

    pub fn with_field_case(self, field_case: FieldCase) -> Self {
        Self { field_case, ..self }
    }

    pub fn field_case(&self) -> FieldCase {
        self.field_case
    }

    pub fn get(&self, name: &str) -> Option<&EntityType> {
        self.entities.get(name)
    }

    pub fn entity(&self, name: &str) -> Result<&EntityType, SchemaError> {
        self.get(name)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityType> {
        self.entities.values()
    }

    pub fn relation(&self, entity: &str, name: &str) -> Result<&Relation, SchemaError> {
        self.entity(entity)?
            .relation(name)
            .ok_or_else(|| SchemaError::UnknownRelation {
                entity: entity.to_string(),
                relation: name.to_string(),
            })
    }

    /// Belongs-to relations (of any type) that point at `target`, with their owning type
    pub fn referencing_relations<'a>(
        &'a self,
        target: &'a str,
    ) -> impl Iterator<Item = (&'a EntityType, &'a Relation)> + 'a {
        self.entities().flat_map(move |entity| {
            entity
                .relations
                .iter()
                .filter(move |relation| {
                    relation.kind == RelationKind::BelongsTo && relation.target == target
                })
                .map(move |relation| (entity, relation))
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for entity in self.entities() {
            for relation in &entity.relations {
                let invalid = |message: &str| SchemaError::InvalidRelation {
                    entity: entity.name.clone(),
                    relation: relation.name.clone(),
                    message: message.to_string(),
                };

                if !self.entities.contains_key(&relation.target) {
                    return Err(SchemaError::UnknownRelationTarget {
                        entity: entity.name.clone(),
                        relation: relation.name.clone(),
                        target: relation.target.clone(),
                    });
                }

                if relation.kind == RelationKind::ManyToMany
                    && (relation.pivot.is_none() || relation.related_key.is_none())
                {
                    return Err(invalid(
                        "many-to-many relations need a pivot table and a related key",
                    ));
                }

                if relation.kind == RelationKind::BelongsTo
                    && !entity.has_field(&relation.foreign_key)
                {
                    return Err(invalid("the foreign key must be one of the type's fields"));
                }
            }

            if let Some(parent) = &entity.union_parent {
                let parent_type = self.entity(parent)?;
                match parent_type.relation(&entity.name) {
                    Some(relation) if relation.kind == RelationKind::OneToOne => {}
                    _ => {
                        return Err(SchemaError::InvalidRelation {
                            entity: parent.clone(),
                            relation: entity.name.clone(),
                            message: "a union holder needs a one-to-one relation named after each member"
                                .to_string(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
