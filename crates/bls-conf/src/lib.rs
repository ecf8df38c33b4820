use std::fs;
use std::path::Path;

use config::{Config, ConfigError as ExternalConfigError, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
    #[error("Failed to read package.json")]
    PackageJsonIo(#[from] std::io::Error),
    #[error("Failed to parse package.json")]
    PackageJsonParse(#[from] serde_json::Error),
}

/// A block type contributed by the user's project configuration.
///
/// Custom blocks participate in matching, diagnostics, completion, and
/// semantic highlighting alongside the built-ins. `properties` optionally
/// names the completion items offered inside the block body.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CustomBlock {
    pub name: String,
    #[serde(default)]
    pub properties: Option<Vec<String>>,
    /// Whether a missing `{{/name}}` is reported as a diagnostic.
    #[serde(default)]
    pub requires_close: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Block types diagnosed when their closing tag is missing.
    pub block_types: Vec<String>,
    pub custom_blocks: Vec<CustomBlock>,
    /// Color hint forwarded to the editor for closing-tag decorations.
    pub closing_tag_decoration_color: Option<String>,
    pub auto_insert_close: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            block_types: vec![
                "if".to_string(),
                "unless".to_string(),
                "with".to_string(),
                "each".to_string(),
            ],
            custom_blocks: Vec::new(),
            closing_tag_decoration_color: None,
            auto_insert_close: true,
        }
    }
}

impl Settings {
    pub fn new(project_root: &Path) -> Result<Self, ConfigError> {
        let user_config_file = ProjectDirs::from("dev", "blazels", "bls")
            .map(|proj_dirs| proj_dirs.config_dir().join("bls.toml"));

        Self::load_from_paths(project_root, user_config_file.as_deref())
    }

    fn load_from_paths(
        project_root: &Path,
        user_config_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        // Meteor projects keep tool configuration in package.json, so a
        // "blazels" key there is the analogue of a project config file.
        let package_json_path = project_root.join("package.json");
        if package_json_path.exists() {
            let content = fs::read_to_string(&package_json_path)?;
            let full_value: serde_json::Value = serde_json::from_str(&content)?;

            if let Some(section) = full_value.get("blazels").filter(|v| v.is_object()) {
                let section_string = serde_json::to_string(section)?;
                builder =
                    builder.add_source(File::from_str(&section_string, FileFormat::Json));
            }
        }

        builder = builder.add_source(
            File::from(project_root.join(".bls.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        builder = builder.add_source(
            File::from(project_root.join("bls.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        let config = builder.build()?;
        let settings = config.try_deserialize()?;
        Ok(settings)
    }
}
