// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Typed tree of a mutation's input payload.
//!
//! A mutation argument such as
//! `{title: "Opening night", venue: {id: 3}, performers: [{name: "A"}, {id: 4}]}`
//! becomes an [`ArgumentSet`] whose `title` is a scalar, whose `venue` is a nested set and whose
//! `performers` is a list of nested sets. One set exists per record the engine touches: the root,
//! and one per item of each nested relation.

use common::value::Val;
use indexmap::IndexMap;
use thiserror::Error;

use crate::record::RecordId;

pub const ID_ARGUMENT: &str = "id";

#[derive(Error, Debug, PartialEq)]
pub enum ArgumentError {
    #[error("Expected an object, got {0}")]
    NotAnObject(Val),
}

/// A single argument value: a scalar, a nested set or a list of arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Scalar(Val),
    Nested(ArgumentSet),
    List(Vec<Argument>),
}

impl Argument {
    pub fn from_val(val: Val) -> Self {
        match val {
            Val::Object(object) => Argument::Nested(ArgumentSet::from_object(object)),
            Val::List(items) => Argument::List(items.into_iter().map(Argument::from_val).collect()),
            scalar => Argument::Scalar(scalar),
        }
    }

    /// Recursively flatten back to plain values
    pub fn to_val(&self) -> Val {
        match self {
            Argument::Scalar(val) => val.clone(),
            Argument::Nested(set) => set.to_val(),
            Argument::List(items) => Val::List(items.iter().map(Argument::to_val).collect()),
        }
    }

    pub fn as_set(&self) -> Option<&ArgumentSet> {
        match self {
            Argument::Nested(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Val> {
        match self {
            Argument::Scalar(val) => Some(val),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Argument::Scalar(Val::Null))
    }

    /// The per-record sets of a many-valued argument.
    ///
    /// A list yields one set per item, a lone set yields itself and `null` yields nothing. Bare
    /// scalars (as in a list of ids) are read as `{id: <scalar>}`.
    pub fn item_sets(&self) -> Vec<ArgumentSet> {
        match self {
            Argument::Scalar(Val::Null) => vec![],
            Argument::Scalar(id) => vec![ArgumentSet::with_id(id.clone())],
            Argument::Nested(set) => vec![set.clone()],
            Argument::List(items) => items.iter().flat_map(Argument::item_sets).collect(),
        }
    }
}

/// Ordered mapping from field or relation name to [`Argument`]. Keys are unique.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArgumentSet {
    arguments: IndexMap<String, Argument>,
}

impl ArgumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: Val) -> Self {
        let mut set = Self::new();
        set.insert(ID_ARGUMENT, Argument::Scalar(id));
        set
    }

    fn from_object(object: IndexMap<String, Val>) -> Self {
        Self {
            arguments: object
                .into_iter()
                .map(|(key, value)| (key, Argument::from_val(value)))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, argument: Argument) {
        self.arguments.insert(name.into(), argument);
    }

    /// Whether the argument was supplied at all (a `null` value counts as supplied)
    pub fn has(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.arguments.get(name)
    }

    /// The supplied, non-null `id` argument
    pub fn id(&self) -> Option<RecordId> {
        self.get(ID_ARGUMENT)
            .and_then(Argument::as_scalar)
            .and_then(RecordId::from_val)
    }

    pub fn has_id(&self) -> bool {
        self.id().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Argument)> {
        self.arguments.iter()
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Split into the arguments matching `predicate` and the rest, keeping order within each part
    pub fn partition(&self, predicate: impl Fn(&str) -> bool) -> (ArgumentSet, ArgumentSet) {
        let (matching, rest): (IndexMap<_, _>, IndexMap<_, _>) = self
            .arguments
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .partition(|(name, _)| predicate(name));

        (
            ArgumentSet {
                arguments: matching,
            },
            ArgumentSet { arguments: rest },
        )
    }

    /// Recursively flatten to a plain object
    pub fn to_val(&self) -> Val {
        Val::Object(
            self.arguments
                .iter()
                .map(|(k, v)| (k.clone(), v.to_val()))
                .collect(),
        )
    }

    /// Shallow view with only the scalar arguments, for inspecting keys such as `id`
    pub fn to_plain(&self) -> IndexMap<String, Val> {
        self.arguments
            .iter()
            .filter_map(|(k, v)| v.as_scalar().map(|val| (k.clone(), val.clone())))
            .collect()
    }
}

impl TryFrom<Val> for ArgumentSet {
    type Error = ArgumentError;

    fn try_from(value: Val) -> Result<Self, Self::Error> {
        match value {
            Val::Object(object) => Ok(Self::from_object(object)),
            other => Err(ArgumentError::NotAnObject(other)),
        }
    }
}
