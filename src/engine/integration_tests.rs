// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end runs of the provisioning engine against the stub provider.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::backends::stub::StubProvider;
use crate::engine::{EngineOptions, ProvisioningEngine, StackState};
use crate::errors::{DeclarationError, ProviderError, ProvisioningError};
use crate::model::{Declarations, Reference, ResourceKind, ResourceNode, Stack};
use crate::topology::RealWorldTopology;

fn options(max_concurrency: usize) -> EngineOptions {
    EngineOptions {
        max_concurrency,
        call_timeout: Duration::from_secs(5),
        retry_attempts: 0,
        retry_backoff: Duration::ZERO,
    }
}

fn engine(provider: &Arc<StubProvider>, options: EngineOptions) -> ProvisioningEngine {
    ProvisioningEngine::new(provider.clone(), options)
}

fn stack(name: &str, nodes: &[&str]) -> Stack {
    nodes.iter().fold(Stack::new(name), |stack, node| {
        stack.with_node(ResourceNode::new(*node, ResourceKind::SecurityGroup))
    })
}

/// IAM exports the Lambda role ARN; Network's security group consumes it.
fn iam_and_network() -> Declarations {
    let iam = Stack::new("IAM")
        .with_node(
            ResourceNode::new("LambdaExecutionRole", ResourceKind::IamRole)
                .with_property("assumed_by", "lambda.amazonaws.com"),
        )
        .with_output(
            "roleArn",
            Reference::new("IAM", "LambdaExecutionRole", "arn"),
            "ARN of the Lambda execution role",
        );
    let network = Stack::new("Network")
        .with_node(ResourceNode::new("Vpc", ResourceKind::Network).with_property("cidr", "10.0.0.0/16"))
        .with_node(
            ResourceNode::new("LambdaSecurityGroup", ResourceKind::SecurityGroup)
                .with_property("vpc_id", Reference::id_of("Network", "Vpc"))
                .with_property("role_arn", Reference::new("IAM", "LambdaExecutionRole", "arn")),
        )
        .with_output(
            "LambdaSecurityGroupId",
            Reference::id_of("Network", "LambdaSecurityGroup"),
            "ID of the Lambda security group",
        );
    Declarations::new()
        .with_stack(network)
        .with_stack(iam)
        .with_tag("Project", "RealWorldServerless")
}

#[tokio::test]
async fn test_cross_stack_output_resolved_before_dependent() {
    let provider = Arc::new(StubProvider::new());
    let result = engine(&provider, options(4))
        .run(&iam_and_network(), CancellationToken::new())
        .await
        .unwrap();

    assert!(result.is_success(), "failures: {:?}", result.failures);
    assert_eq!(result.order, ["IAM", "Network"]);
    assert_eq!(provider.stack_order().await, ["IAM", "Network"]);

    let role_arn = result.output("IAM", "roleArn").unwrap().clone();
    assert_eq!(role_arn, json!("arn:aws:iam::000000000000:role/LambdaExecutionRole"));

    let calls = provider.calls().await;
    let sg = calls
        .iter()
        .find(|c| c.node_id == "LambdaSecurityGroup")
        .unwrap();
    assert_eq!(sg.properties["role_arn"], role_arn);
    assert_eq!(sg.properties["vpc_id"], json!("vpc-00000000000000001"));
}

#[tokio::test]
async fn test_dependent_outputs_absent_when_export_source_fails() {
    let provider = Arc::new(StubProvider::new().failing("IAM", "LambdaExecutionRole"));
    let result = engine(&provider, options(4))
        .run(&iam_and_network(), CancellationToken::new())
        .await
        .unwrap();

    assert!(!result.outputs.contains_key("IAM"));
    assert!(!result.outputs.contains_key("Network"));
    assert_eq!(result.state_of("Network"), Some(StackState::Failed));
    assert_eq!(
        result.failure_for("Network"),
        Some(&ProvisioningError::DependencyFailed {
            stack: "Network".into(),
            dependency: "IAM".into(),
        })
    );
    assert_eq!(provider.stack_order().await, ["IAM"]);
}

#[tokio::test]
async fn test_failure_propagates_transitively_but_not_sideways() {
    let declarations = Declarations::new()
        .with_stack(stack("Base", &["a1", "a2"]))
        .with_stack(stack("Middle", &["b1"]).depends_on("Base"))
        .with_stack(stack("Top", &["c1"]).depends_on("Middle"))
        .with_stack(stack("Independent", &["d1"]));
    let provider = Arc::new(StubProvider::new().failing("Base", "a1"));

    let result = engine(&provider, options(4))
        .run(&declarations, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.provisioned(), vec!["Independent"]);
    assert_eq!(result.state_of("Base"), Some(StackState::Failed));
    assert_eq!(result.state_of("Middle"), Some(StackState::Failed));
    assert_eq!(result.state_of("Top"), Some(StackState::Failed));

    match result.failure_for("Base") {
        Some(ProvisioningError::ProvisioningFailed { node, source, .. }) => {
            assert_eq!(node, "a1");
            assert!(matches!(source, ProviderError::Rejected { .. }));
        }
        other => panic!("unexpected failure for Base: {:?}", other),
    }
    assert!(matches!(
        result.failure_for("Top"),
        Some(ProvisioningError::DependencyFailed { .. })
    ));

    let attempted: Vec<(String, String)> = provider.call_order().await;
    assert!(attempted.contains(&("Base".to_string(), "a1".to_string())));
    assert!(attempted.contains(&("Independent".to_string(), "d1".to_string())));
    assert!(!attempted.iter().any(|(s, _)| s == "Middle" || s == "Top"));
    assert!(!attempted.iter().any(|(_, n)| n == "a2"));
    assert_eq!(result.failures.len(), 3);
}

#[tokio::test]
async fn test_single_slot_follows_plan_order() {
    let declarations = Declarations::new()
        .with_stack(stack("Zeta", &["z1"]))
        .with_stack(stack("Alpha", &["a1"]).depends_on("Zeta"))
        .with_stack(stack("Mid", &["m1"]));
    let provider = Arc::new(StubProvider::new());

    let result = engine(&provider, options(1))
        .run(&declarations, CancellationToken::new())
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.order, ["Mid", "Zeta", "Alpha"]);
    assert_eq!(provider.stack_order().await, result.order);
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let delay = Duration::from_millis(50);
    let mut provider = StubProvider::new();
    let mut declarations = Declarations::new();
    for name in ["A", "B", "C", "D"] {
        provider = provider.slow(name, "sg", delay);
        declarations = declarations.with_stack(stack(name, &["sg"]));
    }
    let provider = Arc::new(provider);

    let result = engine(&provider, options(2))
        .run(&declarations, CancellationToken::new())
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(provider.max_in_flight(), 2);
}

#[tokio::test]
async fn test_slow_call_times_out() {
    let provider = Arc::new(StubProvider::new().slow("A", "sg", Duration::from_millis(500)));
    let options = EngineOptions {
        call_timeout: Duration::from_millis(20),
        retry_attempts: 3,
        ..options(2)
    };

    let result = engine(&provider, options)
        .run(
            &Declarations::new().with_stack(stack("A", &["sg"])),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        result.failure_for("A"),
        Some(&ProvisioningError::Timeout {
            stack: "A".into(),
            node: "sg".into(),
            timeout: Duration::from_millis(20),
        })
    );
    // Timeouts are not retried
    assert_eq!(provider.calls().await.len(), 1);
}

#[tokio::test]
async fn test_throttled_call_is_retried() {
    let provider = Arc::new(StubProvider::new().throttled("A", "sg", 2));
    let options = EngineOptions {
        retry_attempts: 2,
        ..options(1)
    };

    let result = engine(&provider, options)
        .run(
            &Declarations::new().with_stack(stack("A", &["sg"])),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(result.is_success(), "failures: {:?}", result.failures);
    assert_eq!(provider.calls().await.len(), 3);
    assert_eq!(provider.inner().len().await, 1);
}

#[tokio::test]
async fn test_throttled_call_without_retries_fails() {
    let provider = Arc::new(StubProvider::new().throttled("A", "sg", 1));

    let result = engine(&provider, options(1))
        .run(
            &Declarations::new().with_stack(stack("A", &["sg"])),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    match result.failure_for("A") {
        Some(ProvisioningError::ProvisioningFailed { source, .. }) => {
            assert!(matches!(source, ProviderError::Throttled(_)));
        }
        other => panic!("unexpected failure: {:?}", other),
    }
}

#[tokio::test]
async fn test_cancelled_before_start_leaves_everything_pending() {
    let provider = Arc::new(StubProvider::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = engine(&provider, options(4))
        .run(&iam_and_network(), cancel)
        .await
        .unwrap();

    assert!(!result.is_success());
    assert_eq!(result.not_attempted(), vec!["IAM", "Network"]);
    assert!(result.failures.is_empty());
    assert!(provider.calls().await.is_empty());
}

#[tokio::test]
async fn test_cancel_mid_stack_keeps_completed_nodes() {
    let declarations = Declarations::new()
        .with_stack(stack("A", &["first", "second"]))
        .with_stack(stack("B", &["b1"]));
    let provider = Arc::new(StubProvider::new().slow("A", "first", Duration::from_millis(100)));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = engine(&provider, options(1))
        .run(&declarations, cancel)
        .await
        .unwrap();

    assert_eq!(
        result.failure_for("A"),
        Some(&ProvisioningError::Cancelled { stack: "A".into() })
    );
    assert_eq!(result.state_of("B"), Some(StackState::Pending));
    assert_eq!(
        provider.call_order().await,
        vec![("A".to_string(), "first".to_string())]
    );
    // The in-flight create finished and is never rolled back
    assert!(result.resources["A"].contains_key("first"));
    assert_eq!(provider.inner().len().await, 1);
}

#[tokio::test]
async fn test_dependents_of_cancelled_stack_stay_pending() {
    let declarations = Declarations::new()
        .with_stack(stack("A", &["first", "second"]))
        .with_stack(stack("B", &["b1"]).depends_on("A"))
        .with_stack(stack("C", &["c1"]).depends_on("B"));
    let provider = Arc::new(StubProvider::new().slow("A", "first", Duration::from_millis(100)));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = engine(&provider, options(1))
        .run(&declarations, cancel)
        .await
        .unwrap();

    assert_eq!(result.state_of("A"), Some(StackState::Failed));
    assert_eq!(result.state_of("B"), Some(StackState::Pending));
    assert_eq!(result.state_of("C"), Some(StackState::Pending));
    assert_eq!(result.failure_for("B"), None);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.not_attempted(), vec!["B", "C"]);
}

#[tokio::test]
async fn test_run_with_timeout_overrides_engine_options() {
    let provider = Arc::new(StubProvider::new().slow("A", "sg", Duration::from_millis(500)));

    let result = engine(&provider, options(1))
        .run_with_timeout(
            &Declarations::new().with_stack(stack("A", &["sg"])),
            Duration::from_millis(20),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        result.failure_for("A"),
        Some(&ProvisioningError::Timeout {
            stack: "A".into(),
            node: "sg".into(),
            timeout: Duration::from_millis(20),
        })
    );
}

#[tokio::test]
async fn test_tags_reach_every_request() {
    let provider = Arc::new(StubProvider::new());
    engine(&provider, options(2))
        .run(&iam_and_network(), CancellationToken::new())
        .await
        .unwrap();

    let calls = provider.calls().await;
    assert_eq!(calls.len(), 3);
    assert!(calls
        .iter()
        .all(|c| c.tags.get("Project").map(String::as_str) == Some("RealWorldServerless")));
}

#[tokio::test]
async fn test_structural_errors_make_no_provider_calls() {
    let declarations = Declarations::new().with_stack(
        Stack::new("Network").with_node(
            ResourceNode::new("LambdaSecurityGroup", ResourceKind::SecurityGroup)
                .with_property("role_arn", Reference::new("IAM", "LambdaExecutionRole", "arn")),
        ),
    );
    let provider = Arc::new(StubProvider::new());

    let errors = engine(&provider, options(2))
        .run(&declarations, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        errors[0],
        DeclarationError::UnresolvedReference { .. }
    ));
    assert!(provider.calls().await.is_empty());
}

#[tokio::test]
async fn test_realworld_topology_end_to_end() {
    let declarations = RealWorldTopology::default().build().unwrap();
    let provider = Arc::new(StubProvider::new());

    let result = engine(&provider, options(4))
        .run(&declarations, CancellationToken::new())
        .await
        .unwrap();

    assert!(result.is_success(), "failures: {:?}", result.failures);
    assert_eq!(
        provider.stack_order().await,
        ["RealWorldServerless-IAM", "RealWorldServerless-Infrastructure"]
    );

    let iam = &result.outputs["RealWorldServerless-IAM"];
    let names: Vec<&str> = iam.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        [
            "ApiGatewayRoleArn",
            "DevelopersGroupName",
            "DynamoDbAccessRoleArn",
            "LambdaExecutionRoleArn"
        ]
    );

    let infra = &result.outputs["RealWorldServerless-Infrastructure"];
    let lambda_sg = infra["LambdaSecurityGroupId"].clone();
    let database_sg = infra["DatabaseSecurityGroupId"].clone();

    let rules: Vec<_> = provider
        .calls()
        .await
        .into_iter()
        .filter(|c| c.kind == ResourceKind::SecurityRule)
        .collect();
    assert_eq!(rules.len(), 2);
    for rule in &rules {
        assert_eq!(rule.properties["direction"], json!("ingress"));
        assert_eq!(rule.properties["protocol"], json!("tcp"));
        assert_eq!(rule.properties["group_id"], database_sg);
        assert_eq!(rule.properties["source_group_id"], lambda_sg);
    }
    let mut ports: Vec<i64> = rules
        .iter()
        .filter_map(|r| r.properties["from_port"].as_i64())
        .collect();
    ports.sort();
    assert_eq!(ports, [5432, 27017]);

    // DeveloperPolicy is attached to the group by its resolved name
    let policy = provider
        .calls()
        .await
        .into_iter()
        .find(|c| c.node_id == "DeveloperPolicy")
        .unwrap();
    assert_eq!(policy.properties["groups"], json!(["RealWorldDevelopers"]));
}
