// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::{env::MapEnvironment, value::Val};
use mutation_model::capability::CapabilityPolicy;
use mutation_resolver::{config::MutationConfig, mutation_error::MutationErrorKind};
use serde_json::json;
use test_log::test;

mod support;

use crate::support::TestSystem;

#[test(tokio::test)]
async fn union_member_fields_update_the_existing_member() {
    let mut system = TestSystem::new();
    system.seed("Attachment", json!({"name": "old"})).await;
    system
        .seed("Image", json!({"width": 100, "attachmentId": 1}))
        .await;

    let attachment = system
        .update(
            "Attachment",
            json!({"typename": "Image", "id": 1, "width": 800, "name": "cover"}),
        )
        .await
        .unwrap();

    assert_eq!(attachment.get("name"), Some(&Val::from("cover")));
    assert_eq!(system.ids("Image"), vec![1]);
    assert_eq!(system.field("Image", 1, "width"), Some(Val::from(800)));
}

#[test(tokio::test)]
async fn union_member_is_created_with_its_holder() {
    let mut system = TestSystem::new();

    system
        .create(
            "Attachment",
            json!({"typename": "Video", "seconds": 30, "name": "clip"}),
        )
        .await
        .unwrap();

    assert_eq!(system.ids("Attachment"), vec![1]);
    assert_eq!(system.field("Video", 1, "seconds"), Some(Val::from(30)));
    assert_eq!(system.field("Video", 1, "attachmentId"), Some(Val::from(1)));
}

#[test(tokio::test)]
async fn unknown_union_member_is_rejected() {
    let mut system = TestSystem::new();

    let error = system
        .create("Attachment", json!({"typename": "Audio", "name": "clip"}))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), MutationErrorKind::ConfigurationError);
    assert!(system.ids("Attachment").is_empty());
}

#[test(tokio::test)]
async fn snake_case_input_reaches_nested_payloads() {
    let mut system = TestSystem::new();

    let post = system
        .create(
            "Post",
            json!({
                "title": "Hello",
                "published_at": "2024-05-01",
                "comments": [{"body": "hi", "created_by": "ann"}]
            }),
        )
        .await
        .unwrap();

    assert_eq!(post.get("publishedAt"), Some(&Val::from("2024-05-01")));
    assert_eq!(system.field("Comment", 1, "createdBy"), Some(Val::from("ann")));
    assert_eq!(system.field("Comment", 1, "postId"), Some(Val::from(1)));
}

#[test(tokio::test)]
async fn unknown_field_is_rejected() {
    let mut system = TestSystem::new();

    let error = system
        .create("Post", json!({"title": "Hello", "rating": 5}))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), MutationErrorKind::ConfigurationError);
}

#[test(tokio::test)]
async fn config_from_environment_drives_policy_and_transactions() {
    let env = MapEnvironment::from([
        ("NEST_TRANSACTIONAL_MUTATIONS", "false"),
        ("NEST_CAPABILITY_POLICY", "allow-by-default"),
    ]);
    let config = MutationConfig::from_env(&env).unwrap();
    assert!(!config.transactional);
    assert_eq!(config.capability_policy, CapabilityPolicy::AllowByDefault);

    // Unset flags allow under the permissive policy
    let mut system = TestSystem::with(&[("Comment", json!({}))], config);
    system
        .create("Post", json!({"title": "Hello", "comments": [{"body": "hi"}]}))
        .await
        .unwrap();
    assert_eq!(system.ids("Comment"), vec![1]);

    // ... and deny under the restrictive one. Without a transaction the root stays.
    let config = MutationConfig {
        capability_policy: CapabilityPolicy::DenyByDefault,
        ..config
    };
    let mut system = TestSystem::with(&[("Comment", json!({}))], config);
    let error = system
        .create("Post", json!({"title": "Hello", "comments": [{"body": "hi"}]}))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), MutationErrorKind::PermissionDenied);
    assert_eq!(system.ids("Post"), vec![1]);
    assert!(system.ids("Comment").is_empty());
}
