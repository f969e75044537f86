// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::ConfigError;
use crate::graph::DependencyGraphBuilder;
use crate::model::Declarations;

/// A declaration file: stacks, intents and tags plus run settings.
///
/// # Fields
/// * `engine` - Provisioning engine options (optional)
/// * `provider` - Settings for the built-in provider (optional)
/// * `declarations` - Stacks, security intents and tags, at the top level
///
/// # Example
/// ```yaml
/// engine:
///   max_concurrency: 2
///   call_timeout_seconds: 60
/// tags:
///   Project: RealWorldServerless
/// stacks:
///   - name: RealWorldServerless-IAM
///     nodes:
///       - id: LambdaExecutionRole
///         kind: iam_role
///         properties:
///           assumed_by: lambda.amazonaws.com
///     outputs:
///       LambdaExecutionRoleArn:
///         ref: RealWorldServerless-IAM.LambdaExecutionRole.arn
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeclarationFile {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(flatten)]
    pub declarations: Declarations,
}

/// Engine options as written in a declaration file.
///
/// All fields are optional; unset fields take the defaults in
/// [`consts`](crate::config::consts).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub max_concurrency: Option<usize>,
    pub call_timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
}

/// Account and region used by the in-memory provider when minting ARNs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub account_id: Option<String>,
    pub region: Option<String>,
}

/// Declaration file syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationFormat {
    Yaml,
    Toml,
}

impl DeclarationFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(DeclarationFormat::Yaml),
            Some("toml") => Ok(DeclarationFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Parse declarations from a string.
pub fn parse_declarations(
    content: &str,
    format: DeclarationFormat,
) -> Result<DeclarationFile, ConfigError> {
    let mut file: DeclarationFile = match format {
        DeclarationFormat::Yaml => serde_yaml::from_str(content)?,
        DeclarationFormat::Toml => toml::from_str(content)?,
    };
    file.declarations.adopt_nodes();
    Ok(file)
}

/// Load declarations from a YAML or TOML file
pub fn load_declarations<P: AsRef<Path>>(path: P) -> Result<DeclarationFile, ConfigError> {
    let path = path.as_ref();
    let format = DeclarationFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_declarations(&content, format)
}

/// Load declarations and check that they form a valid provisioning plan.
///
/// Every structural error is reported, not just the first.
pub fn load_and_validate_declarations<P: AsRef<Path>>(
    path: P,
) -> Result<DeclarationFile, ConfigError> {
    let file = load_declarations(path)?;
    DependencyGraphBuilder::build(&file.declarations).map_err(ConfigError::Invalid)?;
    Ok(file)
}
