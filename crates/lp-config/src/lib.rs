//! Configuration management for livepatch.
//!
//! Parses `livepatch.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `preview.build_dir`
//!
//! ## Example
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//! open_browser = true
//!
//! [preview]
//! build_dir = "book"
//!
//! [live_patch]
//! enabled = true
//! close_policy = "reload"
//! watch_patterns = ["**/*.html", "**/*.css"]
//! ```

mod expand;

use lp_protocol::{ClientOptions, ClosePolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override build directory.
    pub build_dir: Option<PathBuf>,
    /// Override live patch enabled flag.
    pub live_patch_enabled: Option<bool>,
    /// Override client close policy.
    pub close_policy: Option<ClosePolicy>,
    /// Override opening the browser once the server is up.
    pub open_browser: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "livepatch.toml";

/// Default build directory, relative to the config file.
const DEFAULT_BUILD_DIR: &str = "book";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Preview configuration (paths are relative strings from TOML).
    preview: PreviewConfigRaw,
    /// Live patch configuration.
    pub live_patch: LivePatchConfig,

    /// Resolved preview configuration (set after loading).
    #[serde(skip)]
    pub preview_resolved: PreviewConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Open the served book in a browser once the server is up.
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            open_browser: false,
        }
    }
}

/// Raw preview configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PreviewConfigRaw {
    build_dir: Option<String>,
}

/// Resolved preview configuration with absolute paths.
#[derive(Debug, Default)]
pub struct PreviewConfig {
    /// Directory of rendered HTML to serve.
    pub build_dir: PathBuf,
}

/// Live patch configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LivePatchConfig {
    /// Whether live patching is enabled.
    pub enabled: bool,
    /// File patterns to watch for changes, relative to the build directory.
    pub watch_patterns: Option<Vec<String>>,
    /// Debounce window for file events in milliseconds.
    pub debounce_ms: u64,
    /// Client behaviour on socket close.
    pub close_policy: ClosePolicy,
    /// Client sends its page path after connecting.
    pub send_path_on_open: bool,
    /// Client appends its page path to the socket endpoint.
    pub append_page_path: bool,
    /// Client closes the socket on page unload.
    pub close_on_unload: bool,
    /// CSS selector of the content anchor.
    pub content_selector: String,
}

impl Default for LivePatchConfig {
    fn default() -> Self {
        let client = ClientOptions::default();
        Self {
            enabled: true,
            watch_patterns: None,
            debounce_ms: 100,
            close_policy: client.close_policy,
            send_path_on_open: client.send_path_on_open,
            append_page_path: client.append_page_path,
            close_on_unload: client.close_on_unload,
            content_selector: client.content_selector,
        }
    }
}

impl LivePatchConfig {
    /// Options handed to every client.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            append_page_path: self.append_page_path,
            send_path_on_open: self.send_path_on_open,
            close_policy: self.close_policy,
            close_on_unload: self.close_on_unload,
            content_selector: self.content_selector.clone(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`PREVIEW_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `livepatch.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(build_dir) = &settings.build_dir {
            self.preview_resolved.build_dir.clone_from(build_dir);
        }
        if let Some(enabled) = settings.live_patch_enabled {
            self.live_patch.enabled = enabled;
        }
        if let Some(close_policy) = settings.close_policy {
            self.live_patch.close_policy = close_policy;
        }
        if let Some(open_browser) = settings.open_browser {
            self.server.open_browser = open_browser;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_config_from(&current)
    }

    /// Search for config file in `start` and its parents.
    fn discover_config_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.exists())
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            preview: PreviewConfigRaw::default(),
            live_patch: LivePatchConfig::default(),
            preview_resolved: PreviewConfig {
                build_dir: base.join(DEFAULT_BUILD_DIR),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_live_patch()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 is technically valid (OS assigns a random port), but the
        // browser needs a known address to open
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate live patch configuration.
    fn validate_live_patch(&self) -> Result<(), ConfigError> {
        const MAX_DEBOUNCE_MS: u64 = 10_000;

        require_non_empty(&self.live_patch.content_selector, "live_patch.content_selector")?;

        if self.live_patch.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "live_patch.debounce_ms cannot exceed {MAX_DEBOUNCE_MS}"
            )));
        }

        if let Some(patterns) = &self.live_patch.watch_patterns
            && patterns.is_empty()
        {
            return Err(ConfigError::Validation(
                "live_patch.watch_patterns cannot be empty; omit it to use the defaults".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref build_dir) = self.preview.build_dir {
            self.preview.build_dir = Some(expand::expand_env(build_dir, "preview.build_dir")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let build_dir = self.preview.build_dir.as_deref().unwrap_or(DEFAULT_BUILD_DIR);
        self.preview_resolved = PreviewConfig {
            build_dir: config_dir.join(build_dir),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.preview_resolved.build_dir, PathBuf::from("/test/book"));
        assert!(config.live_patch.enabled);
        assert_eq!(config.live_patch.debounce_ms, 100);
        assert_eq!(config.live_patch.client_options(), ClientOptions::default());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert!(!config.server.open_browser);
        assert!(config.live_patch.enabled);
    }

    #[test]
    fn test_parse_server_config() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 9000
open_browser = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert!(config.server.open_browser);
    }

    #[test]
    fn test_parse_live_patch_config() {
        let toml = r##"
[live_patch]
enabled = false
watch_patterns = ["**/*.html"]
debounce_ms = 250
close_policy = "reload"
send_path_on_open = false
content_selector = "#content"
"##;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.live_patch.enabled);
        assert_eq!(
            config.live_patch.watch_patterns,
            Some(vec!["**/*.html".to_owned()])
        );
        assert_eq!(config.live_patch.debounce_ms, 250);

        let options = config.live_patch.client_options();
        assert_eq!(options.close_policy, ClosePolicy::Reload);
        assert!(!options.send_path_on_open);
        assert!(options.append_page_path);
        assert_eq!(options.content_selector, "#content");
    }

    #[test]
    fn test_parse_invalid_close_policy() {
        let toml = r#"
[live_patch]
close_policy = "reconnect"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file_resolves_build_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[preview]\nbuild_dir = \"site/out\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(
            config.preview_resolved.build_dir,
            dir.path().join("site/out")
        );
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_default_build_dir_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.preview_resolved.build_dir, dir.path().join("book"));
    }

    #[test]
    fn test_load_expands_env_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            "[preview]\nbuild_dir = \"${LP_TEST_SURELY_UNSET_DIR:-out}\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.preview_resolved.build_dir, dir.path().join("out"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/nonexistent/livepatch.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(Config::discover_config_from(&nested), Some(path));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            host: Some("0.0.0.0".to_owned()),
            port: Some(8080),
            build_dir: Some(PathBuf::from("/elsewhere")),
            live_patch_enabled: Some(false),
            close_policy: Some(ClosePolicy::Reload),
            open_browser: Some(true),
        };

        config.apply_cli_settings(&settings);

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.preview_resolved.build_dir, PathBuf::from("/elsewhere"));
        assert!(!config.live_patch.enabled);
        assert_eq!(config.live_patch.close_policy, ClosePolicy::Reload);
        assert!(config.server.open_browser);
    }

    #[test]
    fn test_apply_empty_cli_settings_keeps_values() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.server.port, 3000);
        assert!(config.live_patch.enabled);
    }

    #[test]
    fn test_validate_rejects_port_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.host = " ".to_owned();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: server.host cannot be empty");
    }

    #[test]
    fn test_validate_rejects_empty_selector() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.live_patch.content_selector = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_large_debounce() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.live_patch.debounce_ms = 60_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_watch_patterns() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.live_patch.watch_patterns = Some(Vec::new());
        assert!(config.validate().is_err());
    }
}
