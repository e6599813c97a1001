// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use common::value::Val;
use mutation_model::{
    argument::{Argument, ArgumentSet},
    capability::{Capabilities, CapabilityPolicy},
    entity::EntityType,
    record::{Record, RecordId},
    relation::{Relation, RelationKind},
    schema::Schema,
};

use crate::{
    resolution_context::ResolutionContext,
    store::{MemoryStore, PivotData, RecordStore},
};

/// Venues host concerts; concerts belong to a venue, may have a poster, sell tickets and feature
/// artists. Animals hold a `Dog | Cat` union.
fn entities() -> Vec<EntityType> {
    vec![
        EntityType::new("Venue")
            .with_fields(&["name"])
            .with_unique("name")
            .with_relation(
                Relation::new("concerts", RelationKind::OneToMany, "Concert", "venueId")
                    .cascading(),
            )
            .with_relation(Relation::new(
                "manager",
                RelationKind::OneToOne,
                "Manager",
                "venueId",
            ))
            .with_availability(Capabilities::all()),
        EntityType::new("Concert")
            .with_fields(&["title", "venueId", "posterId"])
            .with_relation(Relation::new(
                "venue",
                RelationKind::BelongsTo,
                "Venue",
                "venueId",
            ))
            .with_relation(Relation::new(
                "poster",
                RelationKind::BelongsTo,
                "Poster",
                "posterId",
            ))
            .with_relation(Relation::many_to_many(
                "artists",
                "Artist",
                "concert_artists",
                "concertId",
                "artistId",
            ))
            .with_relation(
                Relation::new("tickets", RelationKind::OneToMany, "Ticket", "concertId")
                    .cascading(),
            )
            .with_availability(Capabilities::all()),
        EntityType::new("Manager")
            .with_fields(&["name", "venueId"])
            .with_availability(Capabilities::all()),
        EntityType::new("Poster")
            .with_fields(&["url"])
            .with_availability(Capabilities::all()),
        EntityType::new("Artist")
            .with_fields(&["name"])
            .with_unique("name")
            .with_availability(Capabilities::all()),
        EntityType::new("Ticket")
            .with_fields(&["price", "concertId"])
            .with_relation(Relation::new(
                "concert",
                RelationKind::BelongsTo,
                "Concert",
                "concertId",
            ))
            .with_availability(Capabilities::all()),
        EntityType::new("Animal")
            .with_fields(&["name"])
            .with_relation(
                Relation::new("Dog", RelationKind::OneToOne, "Dog", "animalId").cascading(),
            )
            .with_relation(
                Relation::new("Cat", RelationKind::OneToOne, "Cat", "animalId").cascading(),
            ),
        EntityType::new("Dog")
            .with_fields(&["bark", "animalId"])
            .with_union_parent("Animal")
            .with_availability(Capabilities::all()),
        EntityType::new("Cat")
            .with_fields(&["meow", "animalId"])
            .with_union_parent("Animal")
            .with_availability(Capabilities::all()),
    ]
}

pub(crate) struct TestFixture {
    pub schema: Arc<Schema>,
    pub store: MemoryStore,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_capabilities(&[])
    }

    /// Replace the capability descriptors of some types (`None` removes the descriptor)
    pub fn with_capabilities(overrides: &[(&str, Option<Capabilities>)]) -> Self {
        let entities = entities()
            .into_iter()
            .map(|mut entity| {
                if let Some((_, availability)) =
                    overrides.iter().find(|(name, _)| *name == entity.name)
                {
                    entity.availability = availability.clone();
                }
                entity
            })
            .collect();

        let schema = Arc::new(Schema::new(entities).unwrap());
        Self {
            store: MemoryStore::new(schema.clone()),
            schema,
        }
    }

    pub fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    pub async fn insert(&mut self, entity: &str, fields: serde_json::Value) -> Record {
        let mut record = Record::new(entity);
        if let Val::Object(fields) = Val::from(fields) {
            for (name, value) in fields {
                record.set(name, value);
            }
        }
        self.store.save(&mut record).await.unwrap();
        record
    }

    pub async fn attach(&mut self, parent: &Record, relation: &str, id: i64) {
        let relation = self.schema.relation(parent.entity(), relation).unwrap().clone();
        self.store
            .attach(parent, &relation, &RecordId::Int(id), PivotData::new())
            .await
            .unwrap();
    }

    pub fn get(&self, entity: &str, id: i64) -> Option<Record> {
        self.store.get(entity, &RecordId::Int(id))
    }

    pub fn ids(&self, entity: &str) -> Vec<i64> {
        self.store
            .records(entity)
            .iter()
            .filter_map(|record| match record.id() {
                Some(RecordId::Int(id)) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub async fn related_ids(&mut self, parent: &Record, relation: &str) -> Vec<i64> {
        let relation = self.schema.relation(parent.entity(), relation).unwrap().clone();
        self.store
            .related(parent, &relation)
            .await
            .unwrap()
            .iter()
            .filter_map(|record| match record.id() {
                Some(RecordId::Int(id)) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

pub(crate) fn context(schema: &Schema) -> ResolutionContext<'_> {
    ResolutionContext::new(schema, CapabilityPolicy::DenyByDefault)
}

pub(crate) fn args(value: serde_json::Value) -> ArgumentSet {
    ArgumentSet::try_from(Val::from(value)).unwrap()
}

pub(crate) fn argument(value: serde_json::Value) -> Argument {
    Argument::from_val(Val::from(value))
}

pub(crate) fn capabilities(create: bool, update: bool, delete: bool) -> Option<Capabilities> {
    Some(Capabilities {
        create: Some(create),
        update: Some(update),
        delete: Some(delete),
    })
}
