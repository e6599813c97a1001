// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::sync::Arc;

use common::value::Val;
use mutation_model::{
    record::{Record, RecordId},
    schema::Schema,
};
use mutation_resolver::{
    config::MutationConfig,
    mutation_error::MutationError,
    mutation_executor::{MutationExecutor, MutationOperation},
    store::{MemoryStore, PivotData, RecordStore},
};
use serde_json::{Value, json};

/// Users write posts; posts have comments and tags, and attachments hold an `Image | Video`
/// union. Every type may be created, updated and deleted through nested mutations unless
/// overridden.
pub fn schema_definition() -> Value {
    let all = json!({"create": true, "update": true, "delete": true});

    json!({
        "fieldCase": "camel",
        "entities": [
            {
                "name": "User",
                "fields": ["name", "email"],
                "unique": ["email"],
                "availability": all,
            },
            {
                "name": "Post",
                "fields": ["title", "publishedAt", "authorId"],
                "relations": [
                    {"name": "author", "kind": "belongsTo", "target": "User", "foreignKey": "authorId"},
                    {"name": "comments", "kind": "oneToMany", "target": "Comment", "foreignKey": "postId", "cascade": true},
                    {
                        "name": "tags",
                        "kind": "manyToMany",
                        "target": "Tag",
                        "foreignKey": "postId",
                        "relatedKey": "tagId",
                        "pivot": "post_tags"
                    }
                ],
                "availability": all,
            },
            {
                "name": "Comment",
                "fields": ["body", "createdBy", "postId"],
                "relations": [
                    {"name": "post", "kind": "belongsTo", "target": "Post", "foreignKey": "postId"}
                ],
                "availability": all,
            },
            {
                "name": "Tag",
                "fields": ["label"],
                "unique": ["label"],
                "availability": all,
            },
            {
                "name": "Attachment",
                "fields": ["name"],
                "relations": [
                    {"name": "Image", "kind": "oneToOne", "target": "Image", "foreignKey": "attachmentId", "cascade": true},
                    {"name": "Video", "kind": "oneToOne", "target": "Video", "foreignKey": "attachmentId", "cascade": true}
                ],
            },
            {
                "name": "Image",
                "fields": ["width", "attachmentId"],
                "unionParent": "Attachment",
                "availability": all,
            },
            {
                "name": "Video",
                "fields": ["seconds", "attachmentId"],
                "unionParent": "Attachment",
                "availability": all,
            }
        ]
    })
}

pub struct TestSystem {
    pub executor: MutationExecutor,
    pub store: MemoryStore,
}

impl TestSystem {
    pub fn new() -> Self {
        Self::with(&[], MutationConfig::default())
    }

    /// Override the capability descriptor of some types (`null` removes it)
    pub fn with(availability: &[(&str, Value)], config: MutationConfig) -> Self {
        let mut definition = schema_definition();
        for entity in definition["entities"].as_array_mut().unwrap() {
            if let Some((_, value)) = availability
                .iter()
                .find(|(name, _)| entity["name"] == json!(name))
            {
                entity["availability"] = value.clone();
            }
        }

        let schema = Arc::new(Schema::from_json(definition).unwrap());
        Self {
            store: MemoryStore::new(schema.clone()),
            executor: MutationExecutor::new(schema, config),
        }
    }

    pub async fn create(&mut self, entity: &str, input: Value) -> Result<Record, MutationError> {
        self.executor
            .execute(
                &mut self.store,
                entity,
                MutationOperation::Create,
                Val::from(input),
            )
            .await
    }

    pub async fn update(&mut self, entity: &str, input: Value) -> Result<Record, MutationError> {
        self.executor
            .execute(
                &mut self.store,
                entity,
                MutationOperation::Update,
                Val::from(input),
            )
            .await
    }

    /// Store a record directly, bypassing the engine
    pub async fn seed(&mut self, entity: &str, fields: Value) -> Record {
        let mut record = Record::new(entity);
        if let Val::Object(fields) = Val::from(fields) {
            for (name, value) in fields {
                record.set(name, value);
            }
        }
        self.store.save(&mut record).await.unwrap();
        record
    }

    pub async fn seed_attached(&mut self, parent: &Record, relation: &str, id: i64, pivot: Value) {
        let relation = self
            .executor
            .schema()
            .relation(parent.entity(), relation)
            .unwrap()
            .clone();
        let pivot = match Val::from(pivot) {
            Val::Object(pivot) => pivot,
            _ => PivotData::new(),
        };
        self.store
            .attach(parent, &relation, &RecordId::Int(id), pivot)
            .await
            .unwrap();
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

    pub fn field(&self, entity: &str, id: i64, field: &str) -> Option<Val> {
        self.store
            .get(entity, &RecordId::Int(id))
            .and_then(|record| record.get(field).cloned())
    }

    pub async fn related_ids(&mut self, entity: &str, id: i64, relation: &str) -> Vec<i64> {
        let relation = self
            .executor
            .schema()
            .relation(entity, relation)
            .unwrap()
            .clone();
        let parent = self.store.get(entity, &RecordId::Int(id)).unwrap();
        self.store
            .related(&parent, &relation)
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

pub fn capabilities(create: bool, update: bool, delete: bool) -> Value {
    json!({"create": create, "update": update, "delete": delete})
}
