// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("API server address is required")]
    MissingApiServerAddress,

    #[error("Invalid validity period for {field}: {reason}")]
    InvalidDays { field: &'static str, reason: String },

    #[error("Certificate generation failed: {0}")]
    CertGen(#[from] rcgen::Error),

    #[error("Invalid subject alternative name '{value}': {reason}")]
    InvalidSan { value: String, reason: String },

    #[error("Failed to serialize kubeconfig: {0}")]
    Kubeconfig(#[from] serde_yaml::Error),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0} already exists. Use --force to overwrite.")]
    OutputExists(PathBuf),

    #[error("Refusing to write artifact outside the output directory: {0}")]
    InvalidArtifactPath(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse certificate: {0}")]
    CertParse(String),
}

impl Error {
    /// True for input problems detected before any key material is generated.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::MissingApiServerAddress | Error::InvalidDays { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
