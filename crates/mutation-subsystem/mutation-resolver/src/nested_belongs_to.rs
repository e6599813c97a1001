// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::value::Val;
use mutation_model::{
    argument::{Argument, ArgumentSet, ID_ARGUMENT},
    capability::Availability,
    record::{Record, RecordId},
    relation::Relation,
};
use tracing::debug;

use crate::{
    mutation_error::MutationError,
    resolution_context::ResolutionContext,
    resolve_nested::ResolveNested,
    save_model::{ParentLink, persisted_id},
    store::{RecordStore, StoreError},
};

pub const DISCONNECT_ARGUMENT: &str = "disconnect";
pub const DELETE_ARGUMENT: &str = "delete";

/// A related record to delete once the record that pointed at it has been written
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDelete {
    pub entity: String,
    pub id: RecordId,
    pub cascade: bool,
}

impl PendingDelete {
    pub async fn apply(self, store: &mut dyn RecordStore) -> Result<(), StoreError> {
        debug!(
            entity = %self.entity,
            id = %self.id,
            cascade = self.cascade,
            "deleting replaced record"
        );
        if self.cascade {
            store.cascade_delete(&self.entity, &self.id).await
        } else {
            store.delete(&self.entity, &self.id).await
        }
    }
}

/// Resolves a belongs-to argument: the parent holds the foreign key of exactly one related
/// record.
///
/// Only the parent's foreign key is changed here. The caller writes the parent and then applies
/// the returned [`PendingDelete`]s.
pub struct NestedBelongsTo<'a> {
    relation: &'a Relation,
    availability: Availability,
}

impl<'a> NestedBelongsTo<'a> {
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
        parent: &mut Record,
        argument: &Argument,
    ) -> Result<Vec<PendingDelete>, MutationError> {
        match argument {
            Argument::Scalar(Val::Null) => {
                parent.dissociate(self.relation);
                Ok(vec![])
            }
            Argument::Scalar(value) => {
                let id = RecordId::from_val(value).ok_or_else(|| {
                    MutationError::Configuration(format!(
                        "'{value}' is not a valid id for {}",
                        self.relation.name
                    ))
                })?;
                parent.associate(self.relation, &id);
                Ok(vec![])
            }
            Argument::Nested(args)
                if args.has(DISCONNECT_ARGUMENT) || args.has(DELETE_ARGUMENT) =>
            {
                Ok(self.disconnect_or_delete(parent, args))
            }
            Argument::Nested(args) => self.resolve_set(ctx, store, parent, args).await,
            Argument::List(_) => Err(MutationError::Configuration(format!(
                "{} expects a single related record",
                self.relation.name
            ))),
        }
    }

    async fn resolve_set(
        &self,
        ctx: ResolutionContext<'_>,
        store: &mut dyn RecordStore,
        parent: &mut Record,
        args: &ArgumentSet,
    ) -> Result<Vec<PendingDelete>, MutationError> {
        let target = Record::new(self.relation.target.clone());

        if let Some(id) = args.id() {
            if self.availability.update {
                let related = ResolveNested::update(ParentLink::Owner)
                    .resolve(ctx, store, target, args)
                    .await?;
                parent.associate(self.relation, &persisted_id(&related)?);
            } else {
                // The related record is left as is, whatever else was supplied
                parent.associate(self.relation, &id);
            }
            debug!(relation = %self.relation.name, %id, "associated");
            return Ok(vec![]);
        }

        let mut replaced = vec![];
        if self.availability.delete {
            if let Some(current) = parent.related_id(self.relation) {
                replaced.push(PendingDelete {
                    entity: self.relation.target.clone(),
                    id: current,
                    cascade: true,
                });
            }
        }
        parent.dissociate(self.relation);

        let has_fields = args.iter().any(|(name, _)| name != ID_ARGUMENT);
        if has_fields && self.availability.create {
            let related = ResolveNested::save(ParentLink::Owner)
                .resolve(ctx, store, target, args)
                .await?;
            let id = persisted_id(&related)?;
            parent.associate(self.relation, &id);
            debug!(relation = %self.relation.name, %id, "created and associated");
        }

        Ok(replaced)
    }

    /// Handle an explicit `{disconnect, delete}` pair. Each flag only takes effect when truthy:
    /// `disconnect` clears the foreign key, `delete` clears it and deletes the related record.
    pub fn disconnect_or_delete(
        &self,
        parent: &mut Record,
        args: &ArgumentSet,
    ) -> Vec<PendingDelete> {
        let flag = |name: &str| {
            args.get(name)
                .and_then(Argument::as_scalar)
                .is_some_and(Val::is_truthy)
        };

        // Read before either flag clears the foreign key
        let current = parent.related_id(self.relation);
        let mut deleted = vec![];

        if flag(DISCONNECT_ARGUMENT) {
            parent.dissociate(self.relation);
        }

        if flag(DELETE_ARGUMENT) {
            if let Some(current) = current {
                deleted.push(PendingDelete {
                    entity: self.relation.target.clone(),
                    id: current,
                    cascade: false,
                });
            }
            parent.dissociate(self.relation);
        }

        deleted
    }
}
