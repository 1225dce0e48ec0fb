//! CLI configuration
//!
//! Layers, later wins:
//! 1. Built-in defaults (passed in by the application)
//! 2. Global file: `<config dir>/<name>/config.toml`
//! 3. Project file: `./.<name>/config.toml`
//! 4. Environment: `<NAME>_PROMPT`, `<NAME>_MESSAGE`, `<NAME>_DIRECTORY`,
//!    `<NAME>_PACKAGE`, `<NAME>_EXTENSION`, `<NAME>_CHANGE_DIR`

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    discovery::Discovery,
    error::{Error, Result},
};

/// Settings for one CLI instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Program name used in usage lines and config paths
    pub name: String,
    /// Banner printed when the interactive shell starts
    pub message: String,
    pub prompt: String,
    /// Root for directory discovery; catalog discovery when unset
    pub directory: Option<PathBuf>,
    pub package: String,
    /// Source extension of module files, without the dot
    pub extension: String,
    /// Change into `directory` before each dispatch
    pub change_dir: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            name: "reticle".to_string(),
            message: "Welcome!".to_string(),
            prompt: ">> ".to_string(),
            directory: None,
            package: "commands".to_string(),
            extension: "rs".to_string(),
            change_dir: false,
        }
    }
}

impl CliConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    #[must_use]
    pub const fn with_change_dir(mut self, change_dir: bool) -> Self {
        self.change_dir = change_dir;
        self
    }

    /// How modules are found under this configuration.
    pub fn discovery(&self) -> Discovery {
        match &self.directory {
            Some(root) => Discovery::Directory {
                root: root.clone(),
                package: self.package.clone(),
                extension: self.extension.trim_start_matches('.').to_string(),
            },
            None => Discovery::Catalog {
                package: self.package.clone(),
            },
        }
    }

    /// Check values that would otherwise fail later, at discovery or dispatch.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig("name cannot be empty".to_string()));
        }
        if self.prompt.is_empty() {
            return Err(Error::InvalidConfig("prompt cannot be empty".to_string()));
        }
        if self.package.is_empty()
            || self.package.starts_with('.')
            || self.package.ends_with('.')
            || self.package.contains(['/', '\\'])
        {
            return Err(Error::InvalidConfig(format!(
                "package '{}' must be a dotted module path",
                self.package
            )));
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(Error::InvalidConfig("extension cannot be empty".to_string()));
        }
        if self.change_dir && self.directory.is_none() {
            return Err(Error::InvalidConfig(
                "change_dir requires a directory".to_string(),
            ));
        }
        Ok(())
    }

    fn merge(&mut self, file: ConfigFile) {
        if let Some(message) = file.message {
            self.message = message;
        }
        if let Some(prompt) = file.prompt {
            self.prompt = prompt;
        }
        if let Some(directory) = file.directory {
            self.directory = Some(directory);
        }
        if let Some(package) = file.package {
            self.package = package;
        }
        if let Some(extension) = file.extension {
            self.extension = extension;
        }
        if let Some(change_dir) = file.change_dir {
            self.change_dir = change_dir;
        }
    }

    /// Apply `<NAME>_*` environment overrides.
    fn apply_env_vars(&mut self) -> Result<()> {
        let prefix = env_prefix(&self.name);
        let var = |key: &str| std::env::var(format!("{prefix}_{key}")).ok();

        if let Some(value) = var("MESSAGE") {
            self.message = value;
        }
        if let Some(value) = var("PROMPT") {
            self.prompt = value;
        }
        if let Some(value) = var("DIRECTORY") {
            self.directory = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        if let Some(value) = var("PACKAGE") {
            self.package = value;
        }
        if let Some(value) = var("EXTENSION") {
            self.extension = value;
        }
        if let Some(value) = var("CHANGE_DIR") {
            self.change_dir = value.parse().map_err(|e| {
                Error::InvalidConfig(format!("Invalid {prefix}_CHANGE_DIR value: {e}"))
            })?;
        }

        Ok(())
    }
}

/// On-disk form; every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    message: Option<String>,
    prompt: Option<String>,
    directory: Option<PathBuf>,
    package: Option<String>,
    extension: Option<String>,
    change_dir: Option<bool>,
}

/// Load configuration from all sources on top of `defaults`.
pub async fn load_config(defaults: CliConfig) -> Result<CliConfig> {
    let global = global_config_path(&defaults.name);
    let project = project_config_path(&defaults.name)?;
    load_config_from(defaults, global.as_deref(), Some(&project)).await
}

/// [`load_config`] with explicit file locations; missing files are skipped.
pub async fn load_config_from(
    defaults: CliConfig,
    global: Option<&Path>,
    project: Option<&Path>,
) -> Result<CliConfig> {
    let mut config = defaults;

    for path in [global, project].into_iter().flatten() {
        if path.exists() {
            tracing::debug!(path = %path.display(), "Loading config file");
            config.merge(load_toml_file(path).await?);
        }
    }

    config.apply_env_vars()?;
    config.validate()?;
    Ok(config)
}

fn env_prefix(name: &str) -> String {
    name.to_uppercase().replace(['-', ' ', '.'], "_")
}

fn global_config_path(name: &str) -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", name)
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path(name: &str) -> Result<PathBuf> {
    std::env::current_dir()
        .map(|dir| dir.join(format!(".{name}")).join("config.toml"))
        .map_err(|e| Error::InvalidConfig(format!("Failed to get current directory: {e}")))
}

async fn load_toml_file(path: &Path) -> Result<ConfigFile> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::InvalidConfig(format!("Failed to read config file {}: {e}", path.display()))
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::InvalidConfig(format!("Failed to parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write config");
        path
    }

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.prompt, ">> ");
        assert_eq!(config.package, "commands");
        assert!(config.validate().is_ok());
        assert_eq!(
            config.discovery(),
            Discovery::Catalog {
                package: "commands".to_string()
            }
        );
    }

    #[test]
    fn test_discovery_strips_leading_dot_from_extension() {
        let config = CliConfig::new("app")
            .with_directory("/tmp/app")
            .with_extension(".rs");
        assert_eq!(
            config.discovery(),
            Discovery::Directory {
                root: PathBuf::from("/tmp/app"),
                package: "commands".to_string(),
                extension: "rs".to_string(),
            }
        );
    }

    #[test]
    fn test_validation_failures() {
        assert!(CliConfig::new("").validate().is_err());
        assert!(CliConfig::new("app").with_package("").validate().is_err());
        assert!(CliConfig::new("app").with_prompt("").validate().is_err());
        assert!(CliConfig::new("app").with_package("a/b").validate().is_err());
        assert!(CliConfig::new("app").with_extension(".").validate().is_err());
        assert!(CliConfig::new("app").with_change_dir(true).validate().is_err());
        assert!(CliConfig::new("app").with_package("cli.commands").validate().is_ok());
    }

    #[tokio::test]
    #[serial]
    async fn test_project_overrides_global() {
        let dir = TempDir::new().expect("tempdir");
        let global = write(&dir, "global.toml", "prompt = \"g> \"\nmessage = \"hi\"\n");
        let project = write(&dir, "project.toml", "prompt = \"p> \"\n");

        let config = load_config_from(CliConfig::new("cfgtest"), Some(&global), Some(&project))
            .await
            .expect("load");

        assert_eq!(config.prompt, "p> ");
        assert_eq!(config.message, "hi");
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_files_keep_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("nope.toml");

        let config = load_config_from(CliConfig::new("cfgtest"), Some(&missing), None)
            .await
            .expect("load");

        assert_eq!(config, CliConfig::new("cfgtest"));
    }

    #[tokio::test]
    #[serial]
    async fn test_malformed_toml_is_config_error() {
        let dir = TempDir::new().expect("tempdir");
        let bad = write(&dir, "bad.toml", "prompt = \n");

        let err = load_config_from(CliConfig::new("cfgtest"), None, Some(&bad))
            .await
            .expect_err("parse error");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    #[serial]
    async fn test_unknown_key_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let bad = write(&dir, "bad.toml", "colour = \"red\"\n");

        let result = load_config_from(CliConfig::new("cfgtest"), None, Some(&bad)).await;
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("ENVTEST_APP_PROMPT", "$ ");
        std::env::set_var("ENVTEST_APP_CHANGE_DIR", "true");
        std::env::set_var("ENVTEST_APP_DIRECTORY", "/srv/app");

        let mut config = CliConfig::new("envtest-app");
        let result = config.apply_env_vars();

        std::env::remove_var("ENVTEST_APP_PROMPT");
        std::env::remove_var("ENVTEST_APP_CHANGE_DIR");
        std::env::remove_var("ENVTEST_APP_DIRECTORY");

        assert!(result.is_ok());
        assert_eq!(config.prompt, "$ ");
        assert!(config.change_dir);
        assert_eq!(config.directory, Some(PathBuf::from("/srv/app")));
    }

    #[test]
    #[serial]
    fn test_invalid_env_bool() {
        std::env::set_var("BADENV_CHANGE_DIR", "sometimes");
        let mut config = CliConfig::new("badenv");
        let result = config.apply_env_vars();
        std::env::remove_var("BADENV_CHANGE_DIR");

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
