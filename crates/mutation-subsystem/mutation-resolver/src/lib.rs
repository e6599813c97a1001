// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Resolution of nested mutations.
//!
//! A mutation payload is a tree: the root record's fields plus, under each relation name, the
//! related records to create, update, connect, disconnect or delete. [`MutationExecutor`]
//! normalizes that tree, opens a transaction and hands the root to [`ResolveNested`], which
//! persists the record and dispatches each relation argument to the resolver for its
//! cardinality. Those resolvers recurse back into [`ResolveNested`] for every related record
//! they create or update.
//!
//! [`MutationExecutor`]: mutation_executor::MutationExecutor
//! [`ResolveNested`]: resolve_nested::ResolveNested

pub mod argument_transform;
pub mod config;
pub mod mutation_error;
pub mod mutation_executor;
pub mod nested_belongs_to;
pub mod nested_many_to_many;
pub mod nested_one_to_many;
pub mod nested_one_to_one;
pub mod relation_batch_loader;
pub mod resolution_context;
pub mod resolve_nested;
pub mod save_model;
pub mod store;
pub mod update_model;

#[cfg(test)]
mod test_utils;
