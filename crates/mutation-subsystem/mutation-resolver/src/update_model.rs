// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use mutation_model::{argument::ArgumentSet, record::Record};
use tracing::instrument;

use crate::{
    mutation_error::MutationError, resolution_context::ResolutionContext, save_model::SaveModel,
    store::RecordStore,
};

/// Loads the record named by the `id` argument and hands it to [`SaveModel`]
#[derive(Debug, Clone, Copy)]
pub struct UpdateModel<'a> {
    save: SaveModel<'a>,
}

impl<'a> UpdateModel<'a> {
    pub fn new(save: SaveModel<'a>) -> Self {
        Self { save }
    }

    /// `record` only supplies the type; the stored record replaces it
    #[instrument(skip_all, fields(entity = record.entity()))]
    pub async fn update(
        &self,
        ctx: ResolutionContext<'_>,
        store: &mut dyn RecordStore,
        record: Record,
        args: &ArgumentSet,
    ) -> Result<Record, MutationError> {
        let id = args.id().ok_or_else(|| {
            MutationError::Configuration(format!("updating {} requires an id", record.entity()))
        })?;

        let existing = store
            .find(record.entity(), &id)
            .await?
            .ok_or_else(|| MutationError::NotFound {
                entity: record.entity().to_string(),
                id,
            })?;

        self.save.save(ctx, store, existing, args).await
    }
}
