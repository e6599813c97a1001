// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use mutation_model::{
    argument::Argument,
    capability::{Availability, Operation},
    record::Record,
    relation::Relation,
};
use tracing::debug;

use crate::{
    mutation_error::MutationError,
    resolution_context::ResolutionContext,
    resolve_nested::ResolveNested,
    save_model::ParentLink,
    store::RecordStore,
};

/// Resolves a one-to-many argument by diffing the submitted items against the current
/// dependents: items with an id are kept (and updated), items without one are created, and
/// current dependents that were not kept are deleted when the target type allows it.
pub struct NestedOneToMany<'a> {
    relation: &'a Relation,
    availability: Availability,
}

impl<'a> NestedOneToMany<'a> {
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

        let current = store.related(parent, self.relation).await?;
        let link = ParentLink::Dependent {
            parent,
            relation: self.relation,
        };

        let mut kept = vec![];
        for args in argument.item_sets() {
            let target = Record::new(self.relation.target.clone());

            match args.id() {
                Some(id) if self.availability.update => {
                    ResolveNested::update(link)
                        .resolve(ctx, store, target, &args)
                        .await?;
                    kept.push(id);
                }
                _ if self.availability.create => {
                    ResolveNested::save(link)
                        .resolve(ctx, store, target, &args)
                        .await?;
                }
                id => {
                    let operation = if id.is_some() {
                        Operation::Update
                    } else {
                        Operation::Create
                    };
                    return Err(MutationError::permission_denied(
                        operation,
                        &self.relation.name,
                    ));
                }
            }
        }

        if !self.availability.delete {
            return Ok(());
        }

        for record in current {
            let Some(id) = record.id() else {
                continue;
            };
            if !kept.contains(id) {
                store.cascade_delete(&self.relation.target, id).await?;
                debug!(relation = %self.relation.name, %id, "deleted dropped record");
            }
        }

        Ok(())
    }
}
