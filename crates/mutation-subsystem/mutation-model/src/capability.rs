// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// An operation that a nested mutation may perform on a related record
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Per-type capability descriptor: which operations nested mutations may perform on records of
/// this type. Each flag is either explicitly set or absent; how an absent flag is read depends
/// on the [`CapabilityPolicy`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    #[serde(default)]
    pub create: Option<bool>,
    #[serde(default)]
    pub update: Option<bool>,
    #[serde(default)]
    pub delete: Option<bool>,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            create: Some(true),
            update: Some(true),
            delete: Some(true),
        }
    }

    fn flag(&self, operation: Operation) -> Option<bool> {
        match operation {
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }

    pub fn allows(&self, operation: Operation, policy: CapabilityPolicy) -> bool {
        match (self.flag(operation), policy) {
            (Some(flag), _) => flag,
            (None, CapabilityPolicy::DenyByDefault) => false,
            (None, CapabilityPolicy::AllowByDefault) => true,
        }
    }
}

/// How to read a capability flag that a type leaves unset
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityPolicy {
    /// Only an explicit `true` grants the operation
    #[default]
    DenyByDefault,
    /// Only an explicit `false` withholds the operation
    AllowByDefault,
}

/// The effective permissions for one relation target, after applying the policy.
///
/// A type without any capability descriptor permits nothing, whatever the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Availability {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Availability {
    pub fn resolve(capabilities: Option<&Capabilities>, policy: CapabilityPolicy) -> Self {
        match capabilities {
            Some(capabilities) => Self {
                create: capabilities.allows(Operation::Create, policy),
                update: capabilities.allows(Operation::Update, policy),
                delete: capabilities.allows(Operation::Delete, policy),
            },
            None => Self::default(),
        }
    }

    pub fn allows(&self, operation: Operation) -> bool {
        match operation {
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}
