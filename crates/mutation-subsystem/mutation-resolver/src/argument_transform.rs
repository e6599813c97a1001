// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Rewrites applied to raw mutation input before it becomes an
//! [`ArgumentSet`](mutation_model::argument::ArgumentSet):
//! - keys are brought to the schema's field case,
//! - relation shorthand (`venue: 3`, `artists: [1, 2]`) is expanded to the object form,
//! - union members selected through `typename` are regrouped under a nested object named after
//!   the member type.

use async_recursion::async_recursion;
use common::value::Val;
use indexmap::IndexMap;
use mutation_model::{
    argument::ID_ARGUMENT,
    entity::EntityType,
    naming::FieldCase,
    record::{Record, RecordId},
    relation::{Relation, RelationKind},
    schema::Schema,
};
use tracing::debug;

use crate::{mutation_error::MutationError, store::RecordStore};

pub const TYPENAME_ARGUMENT: &str = "typename";

/// Convert every object key, at any depth, to `case`
pub fn to_canonical_case(value: Val, case: FieldCase) -> Val {
    match value {
        Val::Object(object) => Val::Object(
            object
                .into_iter()
                .map(|(key, value)| (case.apply(&key), to_canonical_case(value, case)))
                .collect(),
        ),
        Val::List(items) => Val::List(
            items
                .into_iter()
                .map(|item| to_canonical_case(item, case))
                .collect(),
        ),
        other => other,
    }
}

/// Expand relation shorthand of `entity` and, recursively, of the related types:
/// a bare id for a belongs-to relation becomes `{id}`, and the bare ids of a many-to-many list
/// become `[{id}, ...]`.
pub fn expand_relation_shorthand(
    schema: &Schema,
    entity: &EntityType,
    value: Val,
) -> Result<Val, MutationError> {
    match value {
        Val::Object(object) => {
            let mut expanded = IndexMap::new();
            for (key, value) in object {
                let value = match entity.relation(&key) {
                    Some(relation) => expand_relation_value(schema, relation, value)?,
                    None => value,
                };
                expanded.insert(key, value);
            }
            Ok(Val::Object(expanded))
        }
        Val::List(items) => Ok(Val::List(
            items
                .into_iter()
                .map(|item| expand_relation_shorthand(schema, entity, item))
                .collect::<Result<_, _>>()?,
        )),
        other => Ok(other),
    }
}

fn expand_relation_value(
    schema: &Schema,
    relation: &Relation,
    value: Val,
) -> Result<Val, MutationError> {
    let target = schema.entity(&relation.target)?;
    let id_object = |id: Val| Val::Object(IndexMap::from([(ID_ARGUMENT.to_string(), id)]));

    Ok(match (relation.kind, value) {
        (RelationKind::BelongsTo, id @ (Val::Number(_) | Val::String(_))) => id_object(id),
        (RelationKind::ManyToMany, Val::List(items)) => Val::List(
            items
                .into_iter()
                .map(|item| match item {
                    id @ (Val::Number(_) | Val::String(_)) => Ok(id_object(id)),
                    other => expand_relation_shorthand(schema, target, other),
                })
                .collect::<Result<_, MutationError>>()?,
        ),
        (_, value) => expand_relation_shorthand(schema, target, value)?,
    })
}

/// Regroup union members selected through `typename`, at any depth.
///
/// `{typename: "Dog", id: 5, bark: "loud"}` becomes `{id: 5, Dog: {bark: "loud", id: <dog>}}`:
/// the fields and relations of the member type move under a nested object named after it. The
/// `id` is the holder's; when the holder exists and already has a member of that type, the
/// member's id is added so that it gets updated rather than created.
#[async_recursion]
pub async fn regroup_unions(
    schema: &Schema,
    store: &mut dyn RecordStore,
    value: Val,
) -> Result<Val, MutationError> {
    match value {
        Val::Object(object) => {
            let object = if object.contains_key(TYPENAME_ARGUMENT) {
                regroup_member(schema, store, object).await?
            } else {
                object
            };

            let mut regrouped = IndexMap::new();
            for (key, value) in object {
                regrouped.insert(key, regroup_unions(schema, store, value).await?);
            }
            Ok(Val::Object(regrouped))
        }
        Val::List(items) => {
            let mut regrouped = vec![];
            for item in items {
                regrouped.push(regroup_unions(schema, store, item).await?);
            }
            Ok(Val::List(regrouped))
        }
        other => Ok(other),
    }
}

async fn regroup_member(
    schema: &Schema,
    store: &mut dyn RecordStore,
    mut object: IndexMap<String, Val>,
) -> Result<IndexMap<String, Val>, MutationError> {
    let typename = match object.shift_remove(TYPENAME_ARGUMENT) {
        Some(Val::String(name) | Val::Enum(name)) => name,
        other => {
            return Err(MutationError::Configuration(format!(
                "invalid typename {}",
                other.unwrap_or_default()
            )));
        }
    };

    let member = schema.get(&typename).ok_or_else(|| {
        MutationError::Configuration(format!("unknown typename '{typename}'"))
    })?;
    let holder = member.union_parent.as_deref().ok_or_else(|| {
        MutationError::Configuration(format!("'{typename}' is not a member of a union"))
    })?;

    let holder_id = object.get(ID_ARGUMENT).and_then(RecordId::from_val);
    let member_id = match holder_id {
        Some(holder_id) => existing_member_id(schema, store, holder, &holder_id, &typename).await?,
        None => None,
    };

    let (moved, mut rest): (IndexMap<_, _>, IndexMap<_, _>) =
        object.into_iter().partition(|(key, _)| {
            key != ID_ARGUMENT
                && key != &typename
                && (member.has_field(key) || member.relation(key).is_some())
        });

    let mut nested = moved;
    if let Some(member_id) = member_id {
        nested.insert(ID_ARGUMENT.to_string(), (&member_id).into());
    }
    debug!(%typename, fields = nested.len(), "regrouped union member");

    rest.insert(typename, Val::Object(nested));
    Ok(rest)
}

/// The id of the `typename` member currently held by the holder record, if any. A holder that
/// does not exist yet has no member.
async fn existing_member_id(
    schema: &Schema,
    store: &mut dyn RecordStore,
    holder: &str,
    holder_id: &RecordId,
    typename: &str,
) -> Result<Option<RecordId>, MutationError> {
    let Some(holder_record) = store.find(holder, holder_id).await? else {
        return Ok(None);
    };
    let relation = schema.relation(holder, typename)?;

    Ok(store
        .related(&holder_record, relation)
        .await?
        .first()
        .and_then(Record::id)
        .cloned())
}
