// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use mutation_model::{
    record::{Record, RecordId},
    schema::Schema,
};
use tracing::trace;

use crate::store::{RecordStore, StoreError};

type Decorator = Box<dyn Fn(Vec<Record>) -> Vec<Record> + Send + Sync>;

/// Loads one relation for a batch of parents, grouping the related records by parent id.
///
/// The relation name may use dot notation (`concerts.tickets`); only the first segment is
/// loaded, the rest is left to whoever consumes the loaded records.
pub struct RelationBatchLoader {
    relation_name: String,
    decorator: Option<Decorator>,
}

impl RelationBatchLoader {
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self {
            relation_name: relation_name.into(),
            decorator: None,
        }
    }

    /// Post-process the related records of each parent (filter, reorder)
    pub fn decorate(
        mut self,
        decorator: impl Fn(Vec<Record>) -> Vec<Record> + Send + Sync + 'static,
    ) -> Self {
        self.decorator = Some(Box::new(decorator));
        self
    }

    fn first_relation(&self) -> &str {
        self.relation_name
            .split('.')
            .next()
            .unwrap_or(&self.relation_name)
    }

    pub async fn load(
        &self,
        schema: &Schema,
        store: &mut dyn RecordStore,
        parents: &[Record],
    ) -> Result<IndexMap<RecordId, Vec<Record>>, StoreError> {
        let relation_name = self.first_relation();
        let mut loaded = IndexMap::new();

        for parent in parents {
            // Unsaved parents have nothing related yet
            let Some(parent_id) = parent.id() else {
                continue;
            };
            let relation = schema.relation(parent.entity(), relation_name)?;
            let related = store.related(parent, relation).await?;

            let related = match &self.decorator {
                Some(decorator) => decorator(related),
                None => related,
            };
            trace!(%parent_id, relation = relation_name, count = related.len(), "loaded");
            loaded.insert(parent_id.clone(), related);
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use common::value::Val;
    use serde_json::json;
    use test_log::test;

    use super::*;
    use crate::test_utils::TestFixture;

    async fn venues_with_concerts(fixture: &mut TestFixture) -> Vec<Record> {
        let first = fixture.insert("Venue", json!({"name": "Hall"})).await;
        let second = fixture.insert("Venue", json!({"name": "Arena"})).await;
        for (title, venue) in [("A", 1), ("B", 2), ("C", 1)] {
            fixture
                .insert("Concert", json!({"title": title, "venueId": venue}))
                .await;
        }
        vec![first, second, Record::new("Venue")]
    }

    fn titles(records: &[Record]) -> Vec<Val> {
        records
            .iter()
            .filter_map(|record| record.get("title").cloned())
            .collect()
    }

    #[test(tokio::test)]
    async fn groups_related_records_by_parent() {
        let mut fixture = TestFixture::new();
        let venues = venues_with_concerts(&mut fixture).await;
        let schema = fixture.schema();

        let loaded = RelationBatchLoader::new("concerts.tickets")
            .load(&schema, &mut fixture.store, &venues)
            .await
            .unwrap();

        assert_eq!(
            loaded.keys().cloned().collect::<Vec<_>>(),
            vec![RecordId::Int(1), RecordId::Int(2)]
        );
        assert_eq!(
            titles(&loaded[&RecordId::Int(1)]),
            vec![Val::from("A"), Val::from("C")]
        );
        assert_eq!(titles(&loaded[&RecordId::Int(2)]), vec![Val::from("B")]);
    }

    #[test(tokio::test)]
    async fn applies_the_decorator_per_parent() {
        let mut fixture = TestFixture::new();
        let venues = venues_with_concerts(&mut fixture).await;
        let schema = fixture.schema();

        let loaded = RelationBatchLoader::new("concerts")
            .decorate(|mut concerts| {
                concerts.reverse();
                concerts.truncate(1);
                concerts
            })
            .load(&schema, &mut fixture.store, &venues)
            .await
            .unwrap();

        assert_eq!(titles(&loaded[&RecordId::Int(1)]), vec![Val::from("C")]);
        assert_eq!(titles(&loaded[&RecordId::Int(2)]), vec![Val::from("B")]);
    }

    #[test(tokio::test)]
    async fn unknown_relation_fails() {
        let mut fixture = TestFixture::new();
        let venues = venues_with_concerts(&mut fixture).await;
        let schema = fixture.schema();

        let result = RelationBatchLoader::new("sponsors")
            .load(&schema, &mut fixture.store, &venues)
            .await;

        assert!(matches!(result, Err(StoreError::Schema(_))));
    }
}
