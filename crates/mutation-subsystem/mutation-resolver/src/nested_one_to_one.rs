// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use mutation_model::{
    argument::Argument, capability::Availability, record::Record, relation::Relation,
};
use tracing::debug;

use crate::{
    mutation_error::MutationError,
    resolution_context::ResolutionContext,
    resolve_nested::ResolveNested,
    save_model::ParentLink,
    store::RecordStore,
};

/// Resolves a one-to-one argument: a single related record holds the foreign key to the parent
pub struct NestedOneToOne<'a> {
    relation: &'a Relation,
    availability: Availability,
}

impl<'a> NestedOneToOne<'a> {
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
        let mut sets = argument.item_sets();
        if sets.len() > 1 {
            return Err(MutationError::Configuration(format!(
                "{} expects a single related record",
                self.relation.name
            )));
        }
        let Some(args) = sets.pop() else {
            return Ok(());
        };

        let link = ParentLink::Dependent {
            parent,
            relation: self.relation,
        };
        let target = Record::new(self.relation.target.clone());

        if let Some(id) = args.id() {
            let current = store.related(parent, self.relation).await?.into_iter().next();

            if let Some(current_id) = current.as_ref().and_then(Record::id) {
                // The replaced record has nothing else to point at
                if *current_id != id && self.availability.delete {
                    store.cascade_delete(&self.relation.target, current_id).await?;
                    debug!(relation = %self.relation.name, %current_id, "deleted replaced record");
                }
            }

            if self.availability.update {
                ResolveNested::update(link)
                    .resolve(ctx, store, target, &args)
                    .await?;
                debug!(relation = %self.relation.name, %id, "updated");
            }
        } else if self.availability.create {
            let created = ResolveNested::save(link)
                .resolve(ctx, store, target, &args)
                .await?;
            debug!(relation = %self.relation.name, id = ?created.id(), "created");
        }

        Ok(())
    }
}
