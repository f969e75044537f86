// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::DeclarationError;

/// Errors raised while loading a declaration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read declarations from '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML declarations: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML declarations: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported declaration file '{0}': expected a .yaml, .yml or .toml extension")]
    UnsupportedFormat(String),

    #[error("Declaration validation failed:\n{}", join_errors(.0))]
    Invalid(Vec<DeclarationError>),
}

fn join_errors(errors: &[DeclarationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
