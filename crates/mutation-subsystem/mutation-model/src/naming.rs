// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use heck::{ToLowerCamelCase, ToSnakeCase};
use serde::{Deserialize, Serialize};

/// The naming convention of field and relation names in a schema
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FieldCase {
    /// `venueName`
    #[default]
    Camel,
    /// `venue_name`
    Snake,
}

impl FieldCase {
    pub fn apply(&self, name: &str) -> String {
        match self {
            FieldCase::Camel => name.to_lower_camel_case(),
            FieldCase::Snake => name.to_snake_case(),
        }
    }
}
