// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use common::value::Val;
use mutation_model::{
    argument::{Argument, ArgumentSet},
    record::Record,
    relation::RelationKind,
    schema::Schema,
};
use tracing::{debug, instrument, warn};

use crate::{
    argument_transform::{expand_relation_shorthand, regroup_unions, to_canonical_case},
    config::MutationConfig,
    mutation_error::{MutationError, WithContext},
    resolution_context::ResolutionContext,
    resolve_nested::ResolveNested,
    save_model::{ParentLink, persisted_id},
    store::RecordStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOperation {
    Create,
    Update,
}

/// Where a nested mutation applies
#[derive(Debug)]
pub enum MutationTarget<'a> {
    /// Records of `entity`, not linked to anything
    Root { entity: &'a str },
    /// Records linked to `parent` through its relation named `relation`
    Relation {
        parent: &'a mut Record,
        relation: &'a str,
    },
}

/// Per-type callbacks around the commit of a root mutation
#[async_trait]
pub trait MutationHook: Send + Sync {
    /// Runs inside the transaction, on the refreshed root record. An error rolls the whole
    /// mutation back.
    async fn before_commit(
        &self,
        _store: &mut dyn RecordStore,
        _record: &Record,
    ) -> Result<(), MutationError> {
        Ok(())
    }

    /// Runs once the mutation is committed
    async fn after_commit(&self, _record: &Record) {}
}

/// Runs root mutations: normalizes the raw input, resolves it (with everything nested under it)
/// in a single transaction and returns the refreshed root record.
pub struct MutationExecutor {
    schema: Arc<Schema>,
    config: MutationConfig,
    hooks: HashMap<String, Arc<dyn MutationHook>>,
}

impl MutationExecutor {
    pub fn new(schema: Arc<Schema>, config: MutationConfig) -> Self {
        Self {
            schema,
            config,
            hooks: HashMap::new(),
        }
    }

    pub fn with_hook(
        mut self,
        entity: impl Into<String>,
        hook: impl MutationHook + 'static,
    ) -> Self {
        self.hooks.insert(entity.into(), Arc::new(hook));
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    fn context(&self) -> ResolutionContext<'_> {
        ResolutionContext::new(&self.schema, self.config.capability_policy)
    }

    #[instrument(skip_all, fields(entity = %entity, ?operation))]
    pub async fn execute(
        &self,
        store: &mut dyn RecordStore,
        entity: &str,
        operation: MutationOperation,
        input: Val,
    ) -> Result<Record, MutationError> {
        let args = self.normalize(store, entity, input).await?;
        let argument = Argument::Nested(args);

        if !self.config.transactional {
            let record = self.run(store, entity, operation, &argument).await?;
            self.after_commit(entity, &record).await;
            return Ok(record);
        }

        store.begin().await?;

        let record = match self.run(store, entity, operation, &argument).await {
            Ok(record) => record,
            Err(error) => {
                if let Err(rollback_error) = store.rollback().await {
                    warn!("Failed to roll back mutation on {entity}: {rollback_error}");
                }
                debug!("rolled back: {error}");
                return Err(error);
            }
        };

        store
            .commit()
            .await
            .map_err(MutationError::from)
            .with_context(format!("while committing the {entity} mutation"))?;

        self.after_commit(entity, &record).await;
        Ok(record)
    }

    /// Bring raw input to the shape the resolvers expect: canonical field case, union members
    /// regrouped, relation shorthand expanded
    pub async fn normalize(
        &self,
        store: &mut dyn RecordStore,
        entity: &str,
        input: Val,
    ) -> Result<ArgumentSet, MutationError> {
        let entity_type = self.schema.entity(entity)?;

        let value = to_canonical_case(input, self.schema.field_case());
        let value = regroup_unions(&self.schema, store, value).await?;
        let value = expand_relation_shorthand(&self.schema, entity_type, value)?;

        Ok(ArgumentSet::try_from(value)?)
    }

    async fn run(
        &self,
        store: &mut dyn RecordStore,
        entity: &str,
        operation: MutationOperation,
        argument: &Argument,
    ) -> Result<Record, MutationError> {
        let record = self
            .execute_nested_mutation(store, MutationTarget::Root { entity }, operation, argument)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MutationError::Configuration(format!("no {entity} to mutate")))?;

        let record = store.refresh(&record).await?.unwrap_or(record);

        if let Some(hook) = self.hooks.get(entity) {
            hook.before_commit(store, &record).await?;
        }

        Ok(record)
    }

    async fn after_commit(&self, entity: &str, record: &Record) {
        if let Some(hook) = self.hooks.get(entity) {
            hook.after_commit(record).await;
        }
    }

    /// Apply `operation` to each item of `argument` against `target`, resolving everything
    /// nested in the items. Used for root mutations and for mutations on a relation of an
    /// existing record alike. No transaction is opened here.
    pub async fn execute_nested_mutation(
        &self,
        store: &mut dyn RecordStore,
        target: MutationTarget<'_>,
        operation: MutationOperation,
        argument: &Argument,
    ) -> Result<Vec<Record>, MutationError> {
        let ctx = self.context();
        let mut records = vec![];

        match target {
            MutationTarget::Root { entity } => {
                ctx.entity(entity)?;
                for args in argument.item_sets() {
                    let record = resolver(operation, ParentLink::Root)
                        .resolve(ctx, store, Record::new(entity), &args)
                        .await?;
                    records.push(record);
                }
            }
            MutationTarget::Relation { parent, relation } => {
                let relation = self.schema.relation(parent.entity(), relation)?;

                if relation.kind == RelationKind::BelongsTo {
                    for args in argument.item_sets() {
                        let related = resolver(operation, ParentLink::Owner)
                            .resolve(ctx, store, Record::new(&relation.target), &args)
                            .await?;
                        parent.associate(relation, &persisted_id(&related)?);
                        records.push(related);
                    }
                    store.save(parent).await?;
                } else {
                    let parent: &Record = parent;
                    let link = match relation.kind {
                        RelationKind::ManyToMany => ParentLink::Pivot { parent, relation },
                        _ => ParentLink::Dependent { parent, relation },
                    };
                    for args in argument.item_sets() {
                        let record = resolver(operation, link)
                            .resolve(ctx, store, Record::new(&relation.target), &args)
                            .await?;
                        records.push(record);
                    }
                }
            }
        }

        Ok(records)
    }
}

fn resolver(operation: MutationOperation, link: ParentLink<'_>) -> ResolveNested<'_> {
    match operation {
        MutationOperation::Create => ResolveNested::save(link),
        MutationOperation::Update => ResolveNested::update(link),
    }
}
