// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::env::{EnvError, Environment};
use mutation_model::capability::CapabilityPolicy;

pub const NEST_TRANSACTIONAL_MUTATIONS: &str = "NEST_TRANSACTIONAL_MUTATIONS";
pub const NEST_CAPABILITY_POLICY: &str = "NEST_CAPABILITY_POLICY";

/// Settings for [`crate::mutation_executor::MutationExecutor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationConfig {
    /// Wrap each root mutation in a store transaction
    pub transactional: bool,
    /// How capability flags a type leaves unset are read
    pub capability_policy: CapabilityPolicy,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            transactional: true,
            capability_policy: CapabilityPolicy::DenyByDefault,
        }
    }
}

impl MutationConfig {
    pub fn from_env(env: &dyn Environment) -> Result<Self, EnvError> {
        let transactional = env.enabled(NEST_TRANSACTIONAL_MUTATIONS, true)?;

        let capability_policy = match env.get(NEST_CAPABILITY_POLICY) {
            None => CapabilityPolicy::default(),
            Some(value) => match value.as_str() {
                "deny-by-default" => CapabilityPolicy::DenyByDefault,
                "allow-by-default" => CapabilityPolicy::AllowByDefault,
                _ => {
                    return Err(EnvError::InvalidChoice {
                        key: NEST_CAPABILITY_POLICY,
                        value,
                        expected: "'deny-by-default' or 'allow-by-default'",
                    });
                }
            },
        };

        Ok(Self {
            transactional,
            capability_policy,
        })
    }
}
