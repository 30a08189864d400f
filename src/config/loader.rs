//! Configuration loader
//!
//! Pipeline:
//! 1. Size check and read (UTF-8 BOM stripped)
//! 2. Environment variable expansion on the raw text
//! 3. YAML parsing into [`GameConfig`]
//! 4. Validation
//! 5. Freeze with `Arc`

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::config::schema::GameConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_config_size: env_or("ROASTBOUT_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<GameConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Loads, validates and freezes a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - A required environment variable is missing
    /// - YAML parsing fails
    /// - Validation reports errors
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.options.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {} bytes", self.options.max_config_size),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_str(&raw, path)
    }

    /// Runs the pipeline on already-read text; `origin` is used in messages.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigLoader::load`] minus file access.
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let mut warnings = Vec::new();

        let expanded = expand_env(raw, origin, &mut warnings)?;

        let config: GameConfig = if expanded.trim().is_empty() {
            GameConfig::default()
        } else {
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: result.errors,
            });
        }

        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

/// Loads `path` if given, otherwise returns the defaults.
///
/// # Errors
///
/// Propagates [`ConfigLoader::load`] failures.
pub fn load_or_default(path: Option<&PathBuf>) -> Result<LoadResult, ConfigError> {
    path.map_or_else(
        || {
            Ok(LoadResult {
                config: Arc::new(GameConfig::default()),
                warnings: Vec::new(),
            })
        },
        |p| ConfigLoader::default().load(p),
    )
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// `$$`, `${VAR}`, `${VAR:-default}` and `${VAR:?message}`.
static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([-?])([^}]*))?\}")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// Expands environment references in raw YAML text.
///
/// Unset variables without a default expand to an empty string with a
/// warning; `${VAR:?message}` turns that into an error.
fn expand_env(
    raw: &str,
    origin: &Path,
    warnings: &mut Vec<LoadWarning>,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;

    for caps in ENV_REF.captures_iter(raw) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&raw[last..whole.start()]);
        last = whole.end();

        let Some(name) = caps.get(1).map(|m| m.as_str()) else {
            out.push('$');
            continue;
        };

        match (std::env::var(name), caps.get(2).map(|m| m.as_str())) {
            (Ok(value), _) => out.push_str(&value),
            (Err(_), Some("-")) => out.push_str(caps.get(3).map_or("", |m| m.as_str())),
            (Err(_), Some(_)) => {
                return Err(ConfigError::EnvVarNotSet {
                    var: name.to_string(),
                    location: caps.get(3).map_or_else(
                        || origin.display().to_string(),
                        |m| m.as_str().to_string(),
                    ),
                });
            }
            (Err(_), None) => warnings.push(LoadWarning {
                message: format!("Environment variable '{name}' is not set, using empty string"),
                location: Some(origin.display().to_string()),
            }),
        }
    }

    out.push_str(&raw[last..]);
    Ok(out)
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn origin() -> PathBuf {
        PathBuf::from("test.yaml")
    }

    #[test]
    fn empty_text_is_default_config() {
        let result = ConfigLoader::default().load_str("", &origin()).unwrap();
        assert_eq!(*result.config, GameConfig::default());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn expands_defaults_and_escapes() {
        let mut warnings = Vec::new();
        let out = expand_env(
            "cap: ${ROASTBOUT_TEST_SURELY_UNSET:-42} # costs $$5",
            &origin(),
            &mut warnings,
        )
        .unwrap();
        assert_eq!(out, "cap: 42 # costs $5");
        assert!(warnings.is_empty());
    }

    #[test]
    fn unset_without_default_warns() {
        let mut warnings = Vec::new();
        let out = expand_env("x: '${ROASTBOUT_TEST_SURELY_UNSET}'", &origin(), &mut warnings)
            .unwrap();
        assert_eq!(out, "x: ''");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn required_var_errors() {
        let mut warnings = Vec::new();
        let err = expand_env(
            "x: ${ROASTBOUT_TEST_SURELY_UNSET:?needed for cap}",
            &origin(),
            &mut warnings,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotSet { ref location, .. } if location == "needed for cap"));
    }

    #[test]
    fn validation_errors_block_loading() {
        let err = ConfigLoader::default()
            .load_str("damage:\n  cap: 0\n", &origin())
            .unwrap_err();
        let ConfigError::ValidationError { errors, .. } = err else {
            panic!("expected validation error");
        };
        assert!(errors.iter().any(|e| e.path == "damage.cap"));
    }

    #[test]
    fn parse_error_reports_line() {
        let err = ConfigLoader::default()
            .load_str("damage:\n  cap: [\n", &origin())
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rounds:\n  starting_hp: 120").unwrap();
        let result = ConfigLoader::default().load(file.path()).unwrap();
        assert_eq!(result.config.rounds.starting_hp, 120);
    }

    #[test]
    fn missing_file() {
        let err = ConfigLoader::default()
            .load(Path::new("/definitely/not/here.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn oversized_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rounds:\n  starting_hp: 120").unwrap();
        let loader = ConfigLoader::new(LoaderOptions { max_config_size: 4 });
        let err = loader.load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "file_size"));
    }
}
