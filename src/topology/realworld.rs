// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The RealWorld serverless backend: an IAM stack and a network stack.
//!
//! ```
//! use stackwood::graph::DependencyGraphBuilder;
//! use stackwood::topology::RealWorldTopology;
//!
//! let declarations = RealWorldTopology::default().build().unwrap();
//! let plan = DependencyGraphBuilder::build(&declarations).unwrap();
//! assert_eq!(
//!     plan.order,
//!     ["RealWorldServerless-IAM", "RealWorldServerless-Infrastructure"]
//! );
//! ```

use serde_json::json;

use crate::errors::SubnetError;
use crate::model::{
    Declarations, OutputSource, PropertyValue, Reference, ResourceKind, ResourceNode,
    SecurityIntent, Selector, Stack,
};

use super::subnets::{plan_subnets, Ipv4Network, PlannedSubnet, SubnetGroup, SubnetType};

pub const STACK_PREFIX: &str = "RealWorldServerless";

/// Knobs for the RealWorld topology. The defaults reproduce the reference
/// deployment: `10.0.0.0/16` over two zones with a single NAT gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealWorldTopology {
    pub stack_prefix: String,
    pub vpc_cidr: String,
    pub max_azs: usize,
    pub nat_gateways: u32,
    pub environment: String,
}

impl Default for RealWorldTopology {
    fn default() -> Self {
        Self {
            stack_prefix: STACK_PREFIX.to_string(),
            vpc_cidr: "10.0.0.0/16".to_string(),
            max_azs: 2,
            nat_gateways: 1,
            environment: "Development".to_string(),
        }
    }
}

impl RealWorldTopology {
    pub fn iam_stack_name(&self) -> String {
        format!("{}-IAM", self.stack_prefix)
    }

    pub fn infrastructure_stack_name(&self) -> String {
        format!("{}-Infrastructure", self.stack_prefix)
    }

    pub fn build(&self) -> Result<Declarations, SubnetError> {
        Ok(Declarations::new()
            .with_stack(self.iam_stack())
            .with_stack(self.infrastructure_stack()?)
            .with_intent(self.database_ingress(5432, "Allow access from Lambda functions to PostgreSQL"))
            .with_intent(self.database_ingress(27017, "Allow access from Lambda functions to MongoDB"))
            .with_tag("Project", STACK_PREFIX)
            .with_tag("Environment", self.environment.clone())
            .with_tag("ManagedBy", "stackwood"))
    }

    fn iam_stack(&self) -> Stack {
        let name = self.iam_stack_name();

        let developers_group = ResourceNode::new("DevelopersGroup", ResourceKind::IamGroup)
            .with_property("name", "RealWorldDevelopers")
            .with_property(
                "managed_policies",
                strings(&[
                    "arn:aws:iam::aws:policy/ReadOnlyAccess",
                    "arn:aws:iam::aws:policy/AmazonDynamoDBFullAccess",
                    "arn:aws:iam::aws:policy/AWSLambda_FullAccess",
                    "arn:aws:iam::aws:policy/AmazonAPIGatewayAdministrator",
                ]),
            );

        let developer_policy = ResourceNode::new("DeveloperPolicy", ResourceKind::IamPolicy)
            .with_property(
                "statements",
                vec![
                    allow(
                        &[
                            "cloudformation:Describe*",
                            "cloudformation:List*",
                            "cloudformation:Get*",
                            "cloudformation:ValidateTemplate",
                        ],
                        &["*"],
                    ),
                    allow(
                        &[
                            "logs:DescribeLogGroups",
                            "logs:DescribeLogStreams",
                            "logs:GetLogEvents",
                            "logs:FilterLogEvents",
                        ],
                        &["*"],
                    ),
                ],
            )
            .with_property(
                "groups",
                vec![PropertyValue::from(Reference::new(&name, "DevelopersGroup", "name"))],
            );

        let lambda_execution_role = ResourceNode::new("LambdaExecutionRole", ResourceKind::IamRole)
            .with_property("assumed_by", "lambda.amazonaws.com")
            .with_property("description", "Role for RealWorld Serverless Lambda functions execution")
            .with_property(
                "managed_policies",
                strings(&["arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"]),
            )
            .with_property(
                "statements",
                vec![allow(
                    &["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
                    &["arn:aws:logs:*:*:*"],
                )],
            );

        let dynamo_db_access_role = ResourceNode::new("DynamoDbAccessRole", ResourceKind::IamRole)
            .with_property("assumed_by", "lambda.amazonaws.com")
            .with_property(
                "description",
                "Role for accessing DynamoDB tables in RealWorld Serverless application",
            )
            .with_property(
                "statements",
                vec![allow(
                    &[
                        "dynamodb:GetItem",
                        "dynamodb:PutItem",
                        "dynamodb:UpdateItem",
                        "dynamodb:DeleteItem",
                        "dynamodb:Query",
                        "dynamodb:Scan",
                        "dynamodb:BatchGetItem",
                        "dynamodb:BatchWriteItem",
                    ],
                    &["arn:aws:dynamodb:*:*:table/RealWorld*"],
                )],
            );

        let api_gateway_role = ResourceNode::new("ApiGatewayRole", ResourceKind::IamRole)
            .with_property("assumed_by", "apigateway.amazonaws.com")
            .with_property(
                "description",
                "Role for API Gateway to invoke Lambda functions in RealWorld Serverless application",
            )
            .with_property(
                "statements",
                vec![
                    allow(
                        &[
                            "logs:CreateLogGroup",
                            "logs:CreateLogStream",
                            "logs:DescribeLogGroups",
                            "logs:DescribeLogStreams",
                            "logs:PutLogEvents",
                        ],
                        &["arn:aws:logs:*:*:*"],
                    ),
                    allow(
                        &["lambda:InvokeFunction"],
                        &["arn:aws:lambda:*:*:function:RealWorld*"],
                    ),
                ],
            );

        Stack::new(&name)
            .with_description("IAM resources for RealWorld Serverless Backend Application")
            .with_node(developers_group)
            .with_node(developer_policy)
            .with_node(lambda_execution_role)
            .with_node(dynamo_db_access_role)
            .with_node(api_gateway_role)
            .with_output(
                "DevelopersGroupName",
                Reference::new(&name, "DevelopersGroup", "name"),
                "Name of the developers IAM group",
            )
            .with_output(
                "LambdaExecutionRoleArn",
                Reference::new(&name, "LambdaExecutionRole", "arn"),
                "ARN of the Lambda execution role",
            )
            .with_output(
                "DynamoDbAccessRoleArn",
                Reference::new(&name, "DynamoDbAccessRole", "arn"),
                "ARN of the DynamoDB access role",
            )
            .with_output(
                "ApiGatewayRoleArn",
                Reference::new(&name, "ApiGatewayRole", "arn"),
                "ARN of the API Gateway role",
            )
    }

    fn infrastructure_stack(&self) -> Result<Stack, SubnetError> {
        let name = self.infrastructure_stack_name();
        let vpc_cidr: Ipv4Network = self.vpc_cidr.parse()?;
        let subnets = plan_subnets(
            vpc_cidr,
            &[
                SubnetGroup::new("public", SubnetType::Public, 24),
                SubnetGroup::new("private", SubnetType::PrivateWithEgress, 24),
            ],
            self.max_azs,
        )?;
        let vpc_id = Reference::id_of(&name, "RealWorldVpc");

        let mut stack = Stack::new(&name)
            .with_description("Network infrastructure for RealWorld Serverless Backend Application")
            .depends_on(self.iam_stack_name())
            .with_node(
                ResourceNode::new("RealWorldVpc", ResourceKind::Network)
                    .with_property("cidr", vpc_cidr.to_string())
                    .with_property("max_azs", self.max_azs as i64)
                    .with_property("nat_gateways", i64::from(self.nat_gateways)),
            );

        for subnet in &subnets {
            stack.push_node(subnet_node(subnet, &vpc_id));
        }

        let stack = stack
            .with_node(
                ResourceNode::new("LambdaSecurityGroup", ResourceKind::SecurityGroup)
                    .with_property("vpc_id", vpc_id.clone())
                    .with_property("description", "Security group for Lambda functions")
                    .with_property("allow_all_outbound", true)
                    .with_label("tier", "compute"),
            )
            .with_node(
                ResourceNode::new("DatabaseSecurityGroup", ResourceKind::SecurityGroup)
                    .with_property("vpc_id", vpc_id.clone())
                    .with_property("description", "Security group for databases")
                    .with_property("allow_all_outbound", false)
                    .with_label("tier", "data"),
            )
            .with_output("VpcId", vpc_id, "ID of the VPC")
            .with_output(
                "PublicSubnets",
                joined_ids(&name, &subnets, SubnetType::Public),
                "IDs of public subnets",
            )
            .with_output(
                "PrivateSubnets",
                joined_ids(&name, &subnets, SubnetType::PrivateWithEgress),
                "IDs of private subnets",
            )
            .with_output(
                "LambdaSecurityGroupId",
                Reference::id_of(&name, "LambdaSecurityGroup"),
                "ID of the Lambda security group",
            )
            .with_output(
                "DatabaseSecurityGroupId",
                Reference::id_of(&name, "DatabaseSecurityGroup"),
                "ID of the database security group",
            );

        Ok(stack)
    }

    fn database_ingress(&self, port: u16, description: &str) -> SecurityIntent {
        let stack = self.infrastructure_stack_name();
        SecurityIntent::allow(
            Selector::id("LambdaSecurityGroup").in_stack(&stack),
            Selector::id("DatabaseSecurityGroup").in_stack(&stack),
            port,
        )
        .described(description)
    }
}

fn subnet_node(subnet: &PlannedSubnet, vpc_id: &Reference) -> ResourceNode {
    ResourceNode::new(subnet.node_id(), ResourceKind::Subnet)
        .with_property("vpc_id", vpc_id.clone())
        .with_property("cidr_block", subnet.cidr.to_string())
        .with_property("zone_index", subnet.zone as i64)
        .with_property("subnet_type", subnet.subnet_type.as_str())
        .with_property("map_public_ip_on_launch", subnet.subnet_type == SubnetType::Public)
}

fn joined_ids(stack: &str, subnets: &[PlannedSubnet], subnet_type: SubnetType) -> OutputSource {
    OutputSource::join(
        subnets
            .iter()
            .filter(|s| s.subnet_type == subnet_type)
            .map(|s| Reference::id_of(stack, s.node_id()))
            .collect(),
        ",",
    )
}

fn strings(values: &[&str]) -> PropertyValue {
    PropertyValue::List(values.iter().map(|v| PropertyValue::from(*v)).collect())
}

fn allow(actions: &[&str], resources: &[&str]) -> PropertyValue {
    PropertyValue::Map(
        [
            ("effect".to_string(), PropertyValue::literal(json!("Allow"))),
            ("actions".to_string(), strings(actions)),
            ("resources".to_string(), strings(resources)),
        ]
        .into_iter()
        .collect(),
    )
}
