// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    /// The record holds the foreign key of exactly one related record
    BelongsTo,
    /// A single related record holds a foreign key to this record
    OneToOne,
    /// Any number of related records hold a foreign key to this record
    OneToMany,
    /// Records are linked through rows of a pivot (join) table
    ManyToMany,
}

/// An edge from one entity type to another.
///
/// Where the foreign key lives depends on the kind. For the `Concert.venue` field
/// (`[Concert] -> Venue`) and its inverse `Venue.concerts`, we will have:
/// - `Concert.venue`: kind `BelongsTo`, target `Venue`, foreign_key `venueId` (a field of `Concert`)
/// - `Venue.concerts`: kind `OneToMany`, target `Concert`, foreign_key `venueId` (a field of `Concert`)
///
/// For many-to-many relations, `pivot` names the join table, `foreign_key` is the pivot column
/// pointing at the owning record and `related_key` the pivot column pointing at the target.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub target: String,
    pub foreign_key: String,
    #[serde(default)]
    pub related_key: Option<String>,
    #[serde(default)]
    pub pivot: Option<String>,
    /// Whether cascade-deleting the owner also cascade-deletes the records behind this relation.
    /// Dependents of non-cascading relations get their foreign key cleared instead.
    #[serde(default)]
    pub cascade: bool,
}

impl Relation {
    pub fn new(
        name: impl Into<String>,
        kind: RelationKind,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            foreign_key: foreign_key.into(),
            related_key: None,
            pivot: None,
            cascade: false,
        }
    }

    pub fn many_to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        pivot: impl Into<String>,
        foreign_key: impl Into<String>,
        related_key: impl Into<String>,
    ) -> Self {
        Self {
            related_key: Some(related_key.into()),
            pivot: Some(pivot.into()),
            ..Self::new(name, RelationKind::ManyToMany, target, foreign_key)
        }
    }

    pub fn cascading(self) -> Self {
        Self {
            cascade: true,
            ..self
        }
    }

    /// Relations whose foreign key lives on the related side. These can only be resolved once
    /// the owning record has an id.
    pub fn is_dependent(&self) -> bool {
        matches!(
            self.kind,
            RelationKind::OneToOne | RelationKind::OneToMany | RelationKind::ManyToMany
        )
    }
}
