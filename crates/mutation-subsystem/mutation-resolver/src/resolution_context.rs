// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use mutation_model::{
    capability::{Availability, CapabilityPolicy},
    entity::EntityType,
    relation::Relation,
    schema::Schema,
};

use crate::mutation_error::MutationError;

/// What every resolver needs besides the store: the schema and the capability policy
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub schema: &'a Schema,
    pub policy: CapabilityPolicy,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(schema: &'a Schema, policy: CapabilityPolicy) -> Self {
        Self { schema, policy }
    }

    pub fn entity(&self, name: &str) -> Result<&'a EntityType, MutationError> {
        Ok(self.schema.entity(name)?)
    }

    /// The operations nested mutations may perform on the target of `relation`
    pub fn availability(&self, relation: &Relation) -> Result<Availability, MutationError> {
        let target = self.entity(&relation.target)?;
        Ok(Availability::resolve(target.availability.as_ref(), self.policy))
    }
}
