// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_recursion::async_recursion;
use mutation_model::{
    argument::ArgumentSet,
    record::Record,
    relation::{Relation, RelationKind},
};
use tracing::trace;

use crate::{
    mutation_error::MutationError,
    nested_many_to_many::NestedManyToMany,
    nested_one_to_many::NestedOneToMany,
    nested_one_to_one::NestedOneToOne,
    resolution_context::ResolutionContext,
    save_model::{ParentLink, SaveModel},
    store::RecordStore,
    update_model::UpdateModel,
};

/// The write that persists the record itself
#[derive(Debug, Clone, Copy)]
pub enum Persist<'a> {
    Save(SaveModel<'a>),
    Update(UpdateModel<'a>),
}

/// Resolves one record and everything nested under it.
///
/// Plain fields and belongs-to relations go to the [`Persist`] step, so that the record has an
/// id by the time the relations whose foreign key lives on the other side are resolved.
#[derive(Debug, Clone, Copy)]
pub struct ResolveNested<'a> {
    persist: Persist<'a>,
}

impl<'a> ResolveNested<'a> {
    pub fn new(persist: Persist<'a>) -> Self {
        Self { persist }
    }

    pub fn save(link: ParentLink<'a>) -> Self {
        Self::new(Persist::Save(SaveModel::new(link)))
    }

    pub fn update(link: ParentLink<'a>) -> Self {
        Self::new(Persist::Update(UpdateModel::new(SaveModel::new(link))))
    }

    #[async_recursion]
    pub async fn resolve(
        &self,
        ctx: ResolutionContext<'a>,
        store: &mut dyn RecordStore,
        record: Record,
        args: &ArgumentSet,
    ) -> Result<Record, MutationError> {
        let entity = ctx.entity(record.entity())?;
        let (dependent, own) =
            args.partition(|name| entity.relation(name).is_some_and(Relation::is_dependent));

        let record = match &self.persist {
            Persist::Save(save) => save.save(ctx, store, record, &own).await?,
            Persist::Update(update) => update.update(ctx, store, record, &own).await?,
        };

        for (name, argument) in dependent.iter() {
            let Some(relation) = entity.relation(name) else {
                continue;
            };
            let availability = ctx.availability(relation)?;
            trace!(entity = %entity.name, relation = %relation.name, ?availability, "resolving");

            match relation.kind {
                RelationKind::OneToOne => {
                    NestedOneToOne::new(relation, availability)
                        .resolve(ctx, store, &record, argument)
                        .await?
                }
                RelationKind::OneToMany => {
                    NestedOneToMany::new(relation, availability)
                        .resolve(ctx, store, &record, argument)
                        .await?
                }
                RelationKind::ManyToMany => {
                    NestedManyToMany::new(relation, availability)
                        .resolve(ctx, store, &record, argument)
                        .await?
                }
                RelationKind::BelongsTo => {}
            }
        }

        Ok(record)
    }
}
