// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::value::Val;
use indexmap::IndexMap;
use mutation_model::{
    argument::{Argument, ID_ARGUMENT},
    capability::Availability,
    record::{Record, RecordId},
    relation::Relation,
};
use tracing::debug;

use crate::{
    mutation_error::MutationError,
    resolution_context::ResolutionContext,
    resolve_nested::ResolveNested,
    save_model::ParentLink,
    store::{PivotData, RecordStore, SyncSet},
};

/// Resolves a many-to-many argument.
///
/// When the target type may not be created through nested mutations, the argument is just the
/// new membership and is synced in one go. Otherwise each item is created, updated or attached
/// on its own, and previously attached records that were not mentioned are detached.
pub struct NestedManyToMany<'a> {
    relation: &'a Relation,
    availability: Availability,
}

impl<'a> NestedManyToMany<'a> {
    pub fn new(relation: &'a Relation, availability: Availability) -> Self {
        Self {
            relation,
            availability,
        }
    }

    pub async fn resolve(
        &self,
        ctx: ResolutionContext<'_>,
        store: &mut dyn RecordStore,
        parent: &Record,
        argument: &Argument,
    ) -> Result<(), MutationError> {
        // An explicit null leaves the relation as it is
        if argument.is_null() {
            debug!(relation = %self.relation.name, "null argument, unchanged");
            return Ok(());
        }

        if !self.availability.create {
            let changes = store
                .sync(parent, self.relation, generate_relation_array(argument)?)
                .await?;
            debug!(relation = %self.relation.name, ?changes, "synced");
            return Ok(());
        }

        let current = store.related(parent, self.relation).await?;
        let link = ParentLink::Pivot {
            parent,
            relation: self.relation,
        };

        let mut kept = vec![];
        for args in argument.item_sets() {
            let target = Record::new(self.relation.target.clone());

            match args.id() {
                None => {
                    ResolveNested::save(link)
                        .resolve(ctx, store, target, &args)
                        .await?;
                }
                Some(id) => {
                    if self.availability.update {
                        ResolveNested::update(link)
                            .resolve(ctx, store, target, &args)
                            .await?;
                    } else {
                        store
                            .attach(parent, self.relation, &id, PivotData::new())
                            .await?;
                    }
                    kept.push(id);
                }
            }
        }

        for record in current {
            let Some(id) = record.id() else {
                continue;
            };
            if kept.contains(id) {
                continue;
            }
            store.detach(parent, self.relation, id).await?;
            if self.availability.delete {
                store.cascade_delete(&self.relation.target, id).await?;
            }
            debug!(
                relation = %self.relation.name,
                %id,
                deleted = self.availability.delete,
                "detached"
            );
        }

        Ok(())
    }
}

/// Turn a many-to-many argument into the membership to sync.
///
/// Input lists are monomorphic, so the first item decides the shape: objects carry pivot data
/// next to their `id`, anything else is a bare id.
pub fn generate_relation_array(argument: &Argument) -> Result<SyncSet, MutationError> {
    let values = match argument.to_val() {
        Val::List(values) => values,
        Val::Null => vec![],
        value => vec![value],
    };

    let invalid = |value: &Val| {
        MutationError::Configuration(format!("'{value}' does not identify a related record"))
    };

    if values.is_empty() {
        return Ok(SyncSet::Ids(vec![]));
    }

    if !matches!(values.first(), Some(Val::Object(_))) {
        return values
            .iter()
            .map(|value| RecordId::from_val(value).ok_or_else(|| invalid(value)))
            .collect::<Result<Vec<_>, _>>()
            .map(SyncSet::Ids);
    }

    let mut relation_array = IndexMap::new();
    for value in values {
        let mut pivot = match value {
            Val::Object(pivot) => pivot,
            other => return Err(invalid(&other)),
        };
        let id = pivot
            .shift_remove(ID_ARGUMENT)
            .as_ref()
            .and_then(RecordId::from_val)
            .ok_or_else(|| invalid(&Val::Object(pivot.clone())))?;
        relation_array.insert(id, pivot);
    }
    Ok(SyncSet::WithPivot(relation_array))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_log::test;

    use super::*;
    use crate::test_utils::{TestFixture, argument, capabilities, context};

    async fn setup(fixture: &mut TestFixture) -> Record {
        let concert = fixture.insert("Concert", json!({"title": "A"})).await;
        for name in ["X", "Y", "Z"] {
            fixture.insert("Artist", json!({ "name": name })).await;
        }
        fixture.attach(&concert, "artists", 1).await;
        fixture.attach(&concert, "artists", 2).await;
        concert
    }

    async fn resolve(
        fixture: &mut TestFixture,
        concert: &Record,
        input: serde_json::Value,
    ) -> Result<(), MutationError> {
        let schema = fixture.schema();
        let ctx = context(&schema);
        let relation = schema.relation("Concert", "artists").unwrap();
        NestedManyToMany::new(relation, ctx.availability(relation)?)
            .resolve(ctx, &mut fixture.store, concert, &argument(input))
            .await
    }

    #[test]
    fn relation_array_shapes() {
        assert_eq!(
            generate_relation_array(&argument(json!([3, "4"]))).unwrap(),
            SyncSet::Ids(vec![RecordId::Int(3), RecordId::Int(4)])
        );

        let with_pivot =
            generate_relation_array(&argument(json!([{"id": 3, "role": "lead"}, {"id": 4}])))
                .unwrap();
        let SyncSet::WithPivot(map) = with_pivot else {
            panic!("expected pivot data");
        };
        assert_eq!(map[&RecordId::Int(3)].get("role"), Some(&Val::from("lead")));
        assert!(map[&RecordId::Int(4)].is_empty());

        assert_eq!(
            generate_relation_array(&argument(json!([]))).unwrap(),
            SyncSet::Ids(vec![])
        );
        assert!(generate_relation_array(&argument(json!([{"id": 3}, 4]))).is_err());
    }

    #[test(tokio::test)]
    async fn null_keeps_attachments_with_or_without_create() {
        for create in [true, false] {
            let mut fixture =
                TestFixture::with_capabilities(&[("Artist", capabilities(create, true, true))]);
            let concert = setup(&mut fixture).await;

            resolve(&mut fixture, &concert, json!(null)).await.unwrap();

            assert_eq!(fixture.related_ids(&concert, "artists").await, vec![1, 2]);
            assert_eq!(fixture.ids("Artist"), vec![1, 2, 3]);
        }
    }

    #[test(tokio::test)]
    async fn syncs_when_create_is_not_allowed() {
        let mut fixture =
            TestFixture::with_capabilities(&[("Artist", capabilities(false, false, false))]);
        let concert = setup(&mut fixture).await;

        resolve(
            &mut fixture,
            &concert,
            json!([{"id": 2, "role": "lead"}, {"id": 3, "role": "support"}]),
        )
        .await
        .unwrap();

        assert_eq!(fixture.related_ids(&concert, "artists").await, vec![2, 3]);
        let roles: Vec<_> = fixture
            .store
            .pivot_rows("concert_artists")
            .iter()
            .map(|row| row.get("role").cloned())
            .collect();
        assert_eq!(
            roles,
            vec![Some(Val::from("lead")), Some(Val::from("support"))]
        );
        assert_eq!(fixture.ids("Artist"), vec![1, 2, 3]);
    }

    #[test(tokio::test)]
    async fn creates_updates_and_detaches_per_item() {
        let mut fixture = TestFixture::new();
        let concert = setup(&mut fixture).await;

        resolve(
            &mut fixture,
            &concert,
            json!([{"id": 2, "name": "Y2"}, {"name": "W"}]),
        )
        .await
        .unwrap();

        assert_eq!(fixture.related_ids(&concert, "artists").await, vec![2, 4]);
        assert_eq!(
            fixture.get("Artist", 2).unwrap().get("name"),
            Some(&Val::from("Y2"))
        );
        // Dropped and deletable
        assert!(fixture.get("Artist", 1).is_none());
        assert_eq!(fixture.store.pivot_rows("concert_artists").len(), 2);
    }

    #[test(tokio::test)]
    async fn attaches_as_is_without_update_permission() {
        let mut fixture =
            TestFixture::with_capabilities(&[("Artist", capabilities(true, false, false))]);
        let concert = setup(&mut fixture).await;

        resolve(&mut fixture, &concert, json!([{"id": 3, "name": "ignored"}]))
            .await
            .unwrap();

        assert_eq!(fixture.related_ids(&concert, "artists").await, vec![3]);
        assert_eq!(
            fixture.get("Artist", 3).unwrap().get("name"),
            Some(&Val::from("Z"))
        );
        assert_eq!(fixture.ids("Artist"), vec![1, 2, 3]);
    }
}
