// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingest configuration
//!
//! Built once at start-up and passed by reference to every stage.
//! Connection parameters come from environment variables; the input layout
//! comes from per-sink defaults, a YAML file, or both.

use crate::layout::Layout;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Destination database flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// MobilityDB: one row of temporal sequences per trajectory file.
    #[value(name = "mobilitydb", alias = "temporal")]
    Temporal,
    /// QuestDB: one row per sample.
    #[value(name = "questdb", alias = "columnar")]
    Columnar,
}

impl SinkKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Temporal => "mobilitydb",
            Self::Columnar => "questdb",
        }
    }

    /// Environment variable names for the connection parameters.
    pub fn env_keys(self) -> EnvKeys {
        match self {
            Self::Temporal => EnvKeys {
                host: "DB_HOST",
                port: "DB_PORT",
                database: "DB_NAME",
                user: "DB_USER",
                password: "DB_PASSWORD",
            },
            Self::Columnar => EnvKeys {
                host: "QUESTDB_HOST",
                port: "QUESTDB_PORT",
                database: "QUESTDB_DB",
                user: "QUESTDB_USER",
                password: "QUESTDB_PASSWORD",
            },
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Environment variable names for one sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvKeys {
    pub host: &'static str,
    pub port: &'static str,
    pub database: &'static str,
    pub user: &'static str,
    pub password: &'static str,
}

/// Configuration errors (fatal, reported before any work starts).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port in {var}: {value:?}")]
    InvalidPort { var: &'static str, value: String },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database connection parameters.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl DbConfig {
    /// Documented defaults for each sink.
    pub fn defaults(sink: SinkKind) -> Self {
        match sink {
            SinkKind::Temporal => Self {
                host: "localhost".to_string(),
                port: 5432,
                database: "mobilitydb".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
            },
            SinkKind::Columnar => Self {
                host: "localhost".to_string(),
                port: 8812,
                database: "qdb".to_string(),
                user: "admin".to_string(),
                password: "quest".to_string(),
            },
        }
    }

    /// Read the sink's environment variables, falling back to defaults.
    pub fn from_env(sink: SinkKind) -> Result<Self, ConfigError> {
        Self::from_lookup(sink, |key| std::env::var(key).ok())
    }

    /// Like [`DbConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup<F>(sink: SinkKind, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let keys = sink.env_keys();
        let defaults = Self::defaults(sink);

        let port = match lookup(keys.port) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort {
                    var: keys.port,
                    value,
                })?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup(keys.host).unwrap_or(defaults.host),
            port,
            database: lookup(keys.database).unwrap_or(defaults.database),
            user: lookup(keys.user).unwrap_or(defaults.user),
            password: lookup(keys.password).unwrap_or(defaults.password),
        })
    }
}

/// Ingest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Destination flavour
    pub sink: SinkKind,

    /// Connection parameters
    pub db: DbConfig,

    /// Input files and their labels
    pub layout: Layout,

    /// Parse and encode without writing to the database
    pub dry_run: bool,
}

impl Config {
    /// Create a new config builder
    pub fn builder(sink: SinkKind) -> ConfigBuilder {
        ConfigBuilder {
            sink,
            db: None,
            layout: None,
            root: None,
            dry_run: None,
        }
    }
}

/// Config builder for fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    sink: SinkKind,
    db: Option<DbConfig>,
    layout: Option<Layout>,
    root: Option<PathBuf>,
    dry_run: Option<bool>,
}

impl ConfigBuilder {
    /// Set connection parameters (default: [`DbConfig::defaults`])
    pub fn db(mut self, db: DbConfig) -> Self {
        self.db = Some(db);
        self
    }

    /// Set input layout (default: [`Layout::default_for`])
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Override the layout's root directory
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Skip database writes
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        let mut layout = self
            .layout
            .unwrap_or_else(|| Layout::default_for(self.sink));
        if let Some(root) = self.root {
            layout.root = root;
        }

        Config {
            sink: self.sink,
            db: self.db.unwrap_or_else(|| DbConfig::defaults(self.sink)),
            layout,
            dry_run: self.dry_run.unwrap_or(false),
        }
    }
}
