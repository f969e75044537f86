// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio_util::sync::CancellationToken;

use crate::config::{load_and_validate_declarations, RuntimeBuilder};
use crate::graph::DependencyGraphBuilder;
use crate::topology::RealWorldTopology;

const REALWORLD: &str = "configs/realworld-serverless.yaml";

/// The shipped YAML declares exactly the built-in topology
#[test]
fn test_realworld_yaml_matches_builtin_topology() {
    let file = load_and_validate_declarations(REALWORLD).unwrap();
    let builtin = RealWorldTopology::default().build().unwrap();

    assert_eq!(file.declarations, builtin);

    let from_file = DependencyGraphBuilder::build(&file.declarations).unwrap();
    let from_code = DependencyGraphBuilder::build(&builtin).unwrap();
    assert_eq!(from_file.order, from_code.order);
    assert_eq!(from_file.node_count(), from_code.node_count());
}

#[test]
fn test_realworld_yaml_engine_section() {
    let file = load_and_validate_declarations(REALWORLD).unwrap();
    assert_eq!(file.engine.max_concurrency, Some(2));
    assert_eq!(file.engine.retry_attempts, Some(2));
    assert_eq!(file.provider.region.as_deref(), Some("ap-northeast-1"));
    assert_eq!(file.provider.account_id, None);
}

/// Building a runtime from YAML and provisioning it end to end
#[tokio::test]
async fn test_runtime_from_yaml_provisions_realworld() {
    let file = load_and_validate_declarations(REALWORLD).unwrap();
    let (engine, provider) = RuntimeBuilder::from_config(&file);
    assert_eq!(engine.options().max_concurrency, 2);

    let result = engine
        .run(&file.declarations, CancellationToken::new())
        .await
        .unwrap();

    assert!(result.is_success(), "failures: {:?}", result.failures);
    assert_eq!(
        result.order,
        ["RealWorldServerless-IAM", "RealWorldServerless-Infrastructure"]
    );

    let iam = &result.outputs["RealWorldServerless-IAM"];
    assert_eq!(iam["DevelopersGroupName"], "RealWorldDevelopers");
    assert_eq!(
        iam["LambdaExecutionRoleArn"],
        "arn:aws:iam::000000000000:role/LambdaExecutionRole"
    );

    let infra = &result.outputs["RealWorldServerless-Infrastructure"];
    assert_eq!(infra["VpcId"], "vpc-00000000000000001");
    assert_eq!(
        infra["PublicSubnets"],
        "subnet-00000000000000001,subnet-00000000000000002"
    );
    assert_eq!(
        infra["PrivateSubnets"],
        "subnet-00000000000000003,subnet-00000000000000004"
    );

    // 5 IAM resources, 1 VPC, 4 subnets, 2 groups, 2 composed rules
    assert_eq!(provider.len().await, 14);
}
