//! Configuration management for schema compilation
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (objects.toml)
//! - Environment variables (OBJECTS__*)
//!
//! ## Example config file (objects.toml):
//! ```toml
//! [build]
//! strict = true
//! named_only = false
//! standardize_names = true
//! any_of = "use-first"
//!
//! [validation]
//! meta_validate = true
//! formats = true
//! default_draft = "draft7"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for the object compiler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectsConfig {
    /// Options applied to every build session
    #[serde(default)]
    pub build: BuildConfig,

    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Build options recognized by the type graph builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Validate required fields at construction time
    #[serde(default)]
    pub strict: bool,

    /// Export only titled schemas
    #[serde(default)]
    pub named_only: bool,

    /// Apply parameterize-then-camelize to exported names
    #[serde(default = "default_true")]
    pub standardize_names: bool,

    /// Relaxation for `anyOf`
    #[serde(default)]
    pub any_of: AnyOfPolicy,
}

/// How `anyOf` nodes are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AnyOfPolicy {
    /// `anyOf` is rejected as unsupported
    #[default]
    Unset,
    /// Always select the first candidate
    UseFirst,
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Validate the root document against the JSON Schema meta-schema
    #[serde(default = "default_true")]
    pub meta_validate: bool,

    /// Install the built-in `format` checkers
    #[serde(default = "default_true")]
    pub formats: bool,

    /// Draft used when `$schema` is absent or unrecognized
    #[serde(default)]
    pub default_draft: DraftVersion,
}

/// Meta-schema drafts understood by the meta-validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DraftVersion {
    Draft4,
    Draft6,
    #[default]
    Draft7,
}

impl DraftVersion {
    /// Map a `$schema` URI to a draft
    pub fn from_schema_uri(uri: &str) -> Option<Self> {
        if uri.contains("draft-04") {
            Some(Self::Draft4)
        } else if uri.contains("draft-06") {
            Some(Self::Draft6)
        } else if uri.contains("draft-07") {
            Some(Self::Draft7)
        } else {
            None
        }
    }

    pub(crate) fn as_jsonschema(self) -> jsonschema::Draft {
        match self {
            Self::Draft4 => jsonschema::Draft::Draft4,
            Self::Draft6 => jsonschema::Draft::Draft6,
            Self::Draft7 => jsonschema::Draft::Draft7,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            strict: false,
            named_only: false,
            standardize_names: true,
            any_of: AnyOfPolicy::Unset,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            meta_validate: true,
            formats: true,
            default_draft: DraftVersion::Draft7,
        }
    }
}

impl BuildConfig {
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn named_only(mut self, named_only: bool) -> Self {
        self.named_only = named_only;
        self
    }

    pub fn standardize_names(mut self, standardize: bool) -> Self {
        self.standardize_names = standardize;
        self
    }

    pub fn any_of(mut self, policy: AnyOfPolicy) -> Self {
        self.any_of = policy;
        self
    }
}

impl ObjectsConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["objects.toml", ".objects.toml", "config/objects.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "objects") {
            let xdg_config = config_dir.config_dir().join("objects.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (OBJECTS__BUILD__STRICT=true)
        builder = builder.add_source(
            Environment::with_prefix("OBJECTS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
