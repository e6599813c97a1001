// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use mutation_model::{
    argument::ArgumentError, capability::Operation, record::RecordId, schema::SchemaError,
};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum MutationError {
    #[error("Not allowed to {operation} {relation}")]
    PermissionDenied {
        operation: Operation,
        relation: String,
    },

    #[error("No {entity} with id {id}")]
    NotFound { entity: String, id: RecordId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid mutation: {0}")]
    Configuration(String),

    #[error("{0}")]
    Store(StoreError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0} {1}")]
    WithContext(String, #[source] Box<MutationError>),
}

/// The category an error reports to the caller as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationErrorKind {
    PermissionDenied,
    NotFound,
    ValidationFailure,
    ConfigurationError,
    Internal,
}

impl MutationError {
    pub fn with_context(self, context: String) -> MutationError {
        MutationError::WithContext(context, Box::new(self))
    }

    pub fn permission_denied(operation: Operation, relation: &str) -> Self {
        MutationError::PermissionDenied {
            operation,
            relation: relation.to_string(),
        }
    }

    pub fn kind(&self) -> MutationErrorKind {
        match self {
            MutationError::PermissionDenied { .. } => MutationErrorKind::PermissionDenied,
            MutationError::NotFound { .. } => MutationErrorKind::NotFound,
            MutationError::Validation(_) => MutationErrorKind::ValidationFailure,
            MutationError::Configuration(_) | MutationError::Schema(_) => {
                MutationErrorKind::ConfigurationError
            }
            MutationError::Store(_) => MutationErrorKind::Internal,
            MutationError::WithContext(_, e) => e.kind(),
        }
    }

    pub fn user_error_message(&self) -> String {
        match self {
            MutationError::PermissionDenied { .. }
            | MutationError::NotFound { .. }
            | MutationError::Validation(_)
            | MutationError::Configuration(_)
            | MutationError::Schema(_) => self.to_string(),
            MutationError::WithContext(context, e) => {
                format!("{}: {}", e.user_error_message(), context)
            }
            // Store failures other than constraint violations may carry backend details
            MutationError::Store(_) => {
                error!("Mutation failed in the record store: {:?}", self);
                "Operation failed".to_string()
            }
        }
    }
}

impl From<StoreError> for MutationError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Validation(message) => MutationError::Validation(message),
            StoreError::Schema(error) => MutationError::Schema(error),
            error if error.is_validation() => MutationError::Validation(error.to_string()),
            error => MutationError::Store(error),
        }
    }
}

impl From<ArgumentError> for MutationError {
    fn from(error: ArgumentError) -> Self {
        MutationError::Configuration(error.to_string())
    }
}

pub(crate) trait WithContext {
    fn with_context(self, context: String) -> Self;
}

impl<T> WithContext for Result<T, MutationError> {
    fn with_context(self, context: String) -> Result<T, MutationError> {
        self.map_err(|e| e.with_context(context))
    }
}
