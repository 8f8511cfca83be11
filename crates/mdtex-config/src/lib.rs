//! Configuration management for mdtex.
//!
//! Parses `mdtex.toml` configuration files with serde and provides
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
//! - `latex.compiler`
//! - `latex.rasterizer`
//! - `latex.work_dir`
//! - `cache.path`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override cache file path.
    pub cache_path: Option<PathBuf>,
    /// Override LaTeX compiler command.
    pub compiler: Option<String>,
    /// Override rasterizer command.
    pub rasterizer: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdtex.toml";

/// Default cache filename, relative to the config directory.
const DEFAULT_CACHE_FILENAME: &str = "latex.cache";

/// Default dvipng magnification.
const DEFAULT_MAGNIFICATION: u32 = 1200;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LaTeX toolchain configuration (paths are relative strings from TOML).
    latex: LatexConfigRaw,
    /// Cache configuration (paths are relative strings from TOML).
    cache: CacheConfigRaw,

    /// Resolved LaTeX configuration (set after loading).
    #[serde(skip)]
    pub latex_resolved: LatexConfig,
    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw LaTeX configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LatexConfigRaw {
    compiler: Option<String>,
    rasterizer: Option<String>,
    magnification: Option<u32>,
    document_class: Option<String>,
    packages: Option<Vec<String>>,
    work_dir: Option<String>,
}

/// Resolved LaTeX toolchain configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatexConfig {
    /// Command that compiles a `.tex` file to DVI.
    pub compiler: String,
    /// Command that converts DVI to PNG.
    pub rasterizer: String,
    /// Rasterizer magnification (`dvipng -x`).
    pub magnification: u32,
    /// Document class of the synthesized render document.
    pub document_class: String,
    /// Packages loaded in addition to the core math packages.
    pub packages: Vec<String>,
    /// Directory for temporary render files and retained logs.
    pub work_dir: PathBuf,
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            compiler: "latex".to_owned(),
            rasterizer: "dvipng".to_owned(),
            magnification: DEFAULT_MAGNIFICATION,
            document_class: "article".to_owned(),
            packages: Vec::new(),
            work_dir: PathBuf::from("."),
        }
    }
}

/// Raw cache configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    path: Option<String>,
    key_includes_mode: Option<bool>,
}

/// Resolved cache configuration with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Whether rendered snippets are persisted between runs.
    pub enabled: bool,
    /// Cache file path.
    pub path: PathBuf,
    /// Whether cache keys distinguish math-mode from text-mode snippets.
    pub key_includes_mode: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_CACHE_FILENAME),
            key_includes_mode: false,
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
        /// Config field path (e.g., "`latex.compiler`").
        field: String,
        /// Error message (e.g., "${`TEXBIN`} not set").
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
    /// Otherwise, searches for `mdtex.toml` in current directory and parents.
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
        if let Some(enabled) = settings.cache_enabled {
            self.cache_resolved.enabled = enabled;
        }
        if let Some(path) = &settings.cache_path {
            self.cache_resolved.path.clone_from(path);
        }
        if let Some(compiler) = &settings.compiler {
            self.latex_resolved.compiler.clone_from(compiler);
        }
        if let Some(rasterizer) = &settings.rasterizer {
            self.latex_resolved.rasterizer.clone_from(rasterizer);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            latex_resolved: LatexConfig {
                work_dir: base.to_path_buf(),
                ..LatexConfig::default()
            },
            cache_resolved: CacheConfig {
                path: base.join(DEFAULT_CACHE_FILENAME),
                ..CacheConfig::default()
            },
            ..Self::default()
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

        // Validate configuration after loading and resolution
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Checks that all required fields are properly set and contain valid values.
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_latex()?;
        self.validate_cache()?;
        Ok(())
    }

    /// Validate LaTeX toolchain configuration.
    fn validate_latex(&self) -> Result<(), ConfigError> {
        const MAX_MAGNIFICATION: u32 = 10_000;

        let latex = &self.latex_resolved;
        require_non_empty(&latex.compiler, "latex.compiler")?;
        require_non_empty(&latex.rasterizer, "latex.rasterizer")?;
        require_non_empty(&latex.document_class, "latex.document_class")?;

        if latex.magnification == 0 {
            return Err(ConfigError::Validation(
                "latex.magnification must be greater than 0".to_owned(),
            ));
        }
        if latex.magnification > MAX_MAGNIFICATION {
            return Err(ConfigError::Validation(format!(
                "latex.magnification cannot exceed {MAX_MAGNIFICATION}"
            )));
        }

        for package in &latex.packages {
            require_non_empty(package, "latex.packages")?;
        }

        Ok(())
    }

    /// Validate cache configuration.
    fn validate_cache(&self) -> Result<(), ConfigError> {
        if self.cache_resolved.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "cache.path cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        expand::expand_opt(&mut self.latex.compiler, "latex.compiler")?;
        expand::expand_opt(&mut self.latex.rasterizer, "latex.rasterizer")?;
        expand::expand_opt(&mut self.latex.work_dir, "latex.work_dir")?;
        expand::expand_opt(&mut self.cache.path, "cache.path")?;
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let defaults = LatexConfig::default();

        self.latex_resolved = LatexConfig {
            compiler: self.latex.compiler.clone().unwrap_or(defaults.compiler),
            rasterizer: self.latex.rasterizer.clone().unwrap_or(defaults.rasterizer),
            magnification: self.latex.magnification.unwrap_or(defaults.magnification),
            document_class: self
                .latex
                .document_class
                .clone()
                .unwrap_or(defaults.document_class),
            packages: self.latex.packages.clone().unwrap_or_default(),
            work_dir: config_dir.join(self.latex.work_dir.as_deref().unwrap_or(".")),
        };

        self.cache_resolved = CacheConfig {
            enabled: self.cache.enabled.unwrap_or(true),
            path: config_dir.join(
                self.cache
                    .path
                    .as_deref()
                    .unwrap_or(DEFAULT_CACHE_FILENAME),
            ),
            key_includes_mode: self.cache.key_includes_mode.unwrap_or(false),
        };
    }
}
