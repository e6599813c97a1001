// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use mutation_model::{
    argument::{ArgumentSet, ID_ARGUMENT},
    record::{Record, RecordId},
    relation::{Relation, RelationKind},
};
use tracing::{debug, instrument};

use crate::{
    mutation_error::MutationError,
    nested_belongs_to::NestedBelongsTo,
    resolution_context::ResolutionContext,
    store::{PivotData, RecordStore},
};

/// How the record being saved hangs off the record that led to it
#[derive(Debug, Clone, Copy)]
pub enum ParentLink<'a> {
    /// A root mutation: nothing to link
    Root,
    /// The parent holds the foreign key (belongs-to) and associates the record after the save
    Owner,
    /// The record holds the foreign key to `parent` (one-to-one, one-to-many)
    Dependent {
        parent: &'a Record,
        relation: &'a Relation,
    },
    /// The record is linked to `parent` through a pivot row (many-to-many)
    Pivot {
        parent: &'a Record,
        relation: &'a Relation,
    },
}

/// Assigns the plain fields of an argument set to a record and persists it.
///
/// Belongs-to arguments are resolved here as well, before the write, since their foreign key
/// lives on the record being saved. Records such an argument replaces are deleted only after the
/// write, once nothing points at them anymore.
#[derive(Debug, Clone, Copy)]
pub struct SaveModel<'a> {
    link: ParentLink<'a>,
}

impl<'a> SaveModel<'a> {
    pub fn new(link: ParentLink<'a>) -> Self {
        Self { link }
    }

    #[instrument(skip_all, fields(entity = record.entity()))]
    pub async fn save(
        &self,
        ctx: ResolutionContext<'_>,
        store: &mut dyn RecordStore,
        mut record: Record,
        args: &ArgumentSet,
    ) -> Result<Record, MutationError> {
        let entity = ctx.entity(record.entity())?;
        let mut replaced = vec![];

        for (name, argument) in args.iter() {
            if name == ID_ARGUMENT {
                continue;
            }

            match entity.relation(name) {
                Some(relation) if relation.kind == RelationKind::BelongsTo => {
                    let resolver = NestedBelongsTo::new(relation, ctx.availability(relation)?);
                    replaced.extend(resolver.resolve(ctx, store, &mut record, argument).await?);
                }
                Some(relation) => {
                    return Err(MutationError::Configuration(format!(
                        "relation '{}' of {} can only be resolved once {} is saved",
                        relation.name, entity.name, entity.name
                    )));
                }
                None if entity.has_field(name) => record.set(name.clone(), argument.to_val()),
                None => {
                    return Err(MutationError::Configuration(format!(
                        "{} has no field or relation '{name}'",
                        entity.name
                    )));
                }
            }
        }

        if let ParentLink::Dependent { parent, relation } = self.link {
            let parent_id = persisted_id(parent)?;
            record.set(relation.foreign_key.clone(), (&parent_id).into());
        }

        store.save(&mut record).await?;
        debug!(id = ?record.id(), "saved");

        if let ParentLink::Pivot { parent, relation } = self.link {
            let id = persisted_id(&record)?;
            store.attach(parent, relation, &id, PivotData::new()).await?;
        }

        for pending in replaced {
            pending.apply(store).await?;
        }

        Ok(record)
    }
}

pub(crate) fn persisted_id(record: &Record) -> Result<RecordId, MutationError> {
    record.id().cloned().ok_or_else(|| {
        MutationError::Validation(format!("{} has not been saved", record.entity()))
    })
}
