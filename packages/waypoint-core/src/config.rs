use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable name for workspace override
pub const ENV_WORKSPACE: &str = "WAYPOINT_WORKSPACE";

/// Workspace directory name under the platform data directory
const DEFAULT_WORKSPACE_DIR: &str = "workspace";

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
}

#[derive(Debug, Deserialize, Default)]
struct WorkspaceSection {
    /// Workspace directory (e.g., "~/engagements/acme")
    path: Option<String>,
}

/// Runtime workspace configuration
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Directory holding the workspace database and key files
    pub path: PathBuf,
    /// Source of the configuration (for logging)
    pub source: ConfigSource,
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Using default location
    Default,
    /// Loaded from environment variable
    Environment,
    /// Loaded from config file
    ConfigFile,
    /// Given on the command line
    CommandLine,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::ConfigFile => write!(f, "config file"),
            ConfigSource::CommandLine => write!(f, "command line"),
        }
    }
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("waypoint").join("config.toml"))
}

/// Load configuration from a config file
fn load_config_file(path: &Path) -> Option<ConfigFile> {
    if !path.exists() {
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            None
        }
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn default_workspace_path() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("waypoint")
        .join(DEFAULT_WORKSPACE_DIR)
}

/// Load workspace configuration with priority:
/// 1. Environment variable (WAYPOINT_WORKSPACE)
/// 2. Config file (~/.config/waypoint/config.toml)
/// 3. Default location under the platform data directory
pub fn load_workspace_config() -> WorkspaceConfig {
    resolve_workspace_config(
        std::env::var(ENV_WORKSPACE).ok(),
        get_config_file_path().as_deref(),
    )
}

fn resolve_workspace_config(env_value: Option<String>, config_path: Option<&Path>) -> WorkspaceConfig {
    // Priority 1: Environment variable
    if let Some(value) = env_value {
        let value = value.trim();
        if !value.is_empty() {
            tracing::info!("Using workspace from environment variable: {}", value);
            return WorkspaceConfig {
                path: expand_home(value),
                source: ConfigSource::Environment,
            };
        }
    }

    // Priority 2: Config file
    let from_file = config_path
        .and_then(load_config_file)
        .and_then(|config| config.workspace)
        .and_then(|section| section.path)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    if let Some(path) = from_file {
        tracing::info!("Using workspace from config file: {}", path);
        return WorkspaceConfig {
            path: expand_home(&path),
            source: ConfigSource::ConfigFile,
        };
    }

    // Priority 3: Default location
    let path = default_workspace_path();
    tracing::debug!("Using default workspace: {:?}", path);
    WorkspaceConfig {
        path,
        source: ConfigSource::Default,
    }
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/waypoint/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# Waypoint Configuration
# Place this file at: ~/.config/waypoint/config.toml

[workspace]
# Directory holding the workspace database and key files
# Default: <local data dir>/waypoint/workspace
# path = "~/engagements/acme"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_environment_wins() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "[workspace]\npath = \"/from/file\"\n");

        let resolved = resolve_workspace_config(Some("/from/env".to_string()), Some(&config));
        assert_eq!(resolved.path, PathBuf::from("/from/env"));
        assert_eq!(resolved.source, ConfigSource::Environment);
    }

    #[test]
    fn test_config_file_used_when_env_blank() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "[workspace]\npath = \"/from/file\"\n");

        let resolved = resolve_workspace_config(Some("  ".to_string()), Some(&config));
        assert_eq!(resolved.path, PathBuf::from("/from/file"));
        assert_eq!(resolved.source, ConfigSource::ConfigFile);
    }

    #[test]
    fn test_default_on_missing_or_broken_file() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_workspace_config(None, Some(&dir.path().join("absent.toml")));
        assert_eq!(resolved.source, ConfigSource::Default);
        assert!(resolved.path.ends_with("waypoint/workspace"));

        let broken = write_config(&dir, "[workspace\npath = ");
        let resolved = resolve_workspace_config(None, Some(&broken));
        assert_eq!(resolved.source, ConfigSource::Default);
    }

    #[test]
    fn test_example_config_parses() {
        let parsed: ConfigFile = toml::from_str(&generate_example_config()).unwrap();
        assert!(parsed.workspace.unwrap().path.is_none());
    }
}
