//! Configuration loader
//!
//! Loading pipeline for scenario files:
//! 1. Size limit check
//! 2. UTF-8 BOM strip
//! 3. Environment variable expansion (pre-parse, on raw text)
//! 4. YAML parsing and empty-document check
//! 5. Deserialization to typed config
//! 6. Validation

use std::path::{Path, PathBuf};

use crate::config::schema::ScenarioConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

/// Source label used for configurations that do not come from a file.
const INLINE_SOURCE: &str = "<inline>";

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Limits for configuration size.
    pub config_limits: ConfigLimits,

    /// Whether the configuration is compiled into the binary. Embedded
    /// configurations skip environment substitution.
    pub embedded: bool,
}

/// Limits for configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("HEISTBENCH_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: ScenarioConfig,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
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

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - A required environment variable is unset
    /// - YAML parsing or deserialization fails
    /// - Validation fails
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|e| read_error(path, &e))?;

        let max = self.options.config_limits.max_config_size;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > max {
            return Err(size_error(file_size, max));
        }

        let raw_content = std::fs::read_to_string(path).map_err(|e| read_error(path, &e))?;

        self.load_with_source(&raw_content, path)
    }

    /// Loads and validates a configuration from a string.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus file access.
    pub fn load_from_str(&self, yaml: &str) -> Result<LoadResult, ConfigError> {
        let max = self.options.config_limits.max_config_size;
        if yaml.len() > max {
            return Err(size_error(yaml.len(), max));
        }
        self.load_with_source(yaml, Path::new(INLINE_SOURCE))
    }

    fn load_with_source(&self, raw: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let substituted = if self.options.embedded {
            raw.to_string()
        } else {
            let mut env_sub = EnvSubstitution::new();
            let text = env_sub.substitute(raw, path)?;
            warnings.extend(env_sub.warnings);
            text
        };

        let root: serde_yaml::Value =
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        if root.is_null() {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: "Configuration file is empty".to_string(),
            });
        }

        let config: ScenarioConfig =
            serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: format!("Failed to deserialize configuration: {e}"),
            })?;

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }

        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult { config, warnings })
    }
}

fn read_error(path: &Path, err: &std::io::Error) -> ConfigError {
    let message = match err.kind() {
        std::io::ErrorKind::NotFound => {
            return ConfigError::MissingFile {
                path: path.to_path_buf(),
            };
        }
        std::io::ErrorKind::InvalidData => "File is not valid UTF-8".to_string(),
        _ => format!("Failed to read file: {err}"),
    };
    ConfigError::ParseError {
        path: path.to_path_buf(),
        line: None,
        message,
    }
}

fn size_error(size: usize, max: usize) -> ConfigError {
    ConfigError::InvalidValue {
        field: "file_size".to_string(),
        value: format!("{size} bytes"),
        expected: format!("at most {max} bytes"),
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Pre-parse environment variable substitution.
///
/// Runs on raw YAML text before parsing so substituted numbers keep their
/// YAML type.
struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset, with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw_yaml: &str, source_path: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw_yaml.len());
        let mut chars = raw_yaml.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let (var_name, default, error_msg) = Self::parse_var_spec(&mut chars, source_path)?;
                    match std::env::var(&var_name) {
                        Ok(value) => result.push_str(&value),
                        Err(_) => {
                            if let Some(default_val) = default {
                                result.push_str(&default_val);
                            } else if let Some(message) = error_msg {
                                return Err(ConfigError::EnvVarNotSet {
                                    var: var_name,
                                    message,
                                });
                            } else {
                                self.warnings.push(LoadWarning {
                                    message: format!(
                                        "Environment variable '{var_name}' is not set, using empty string"
                                    ),
                                    location: Some(source_path.display().to_string()),
                                });
                            }
                        }
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }

    /// Parses `NAME}`, `NAME:-default}` or `NAME:?message}`.
    fn parse_var_spec(
        chars: &mut Chars<'_>,
        source_path: &Path,
    ) -> Result<(String, Option<String>, Option<String>), ConfigError> {
        let mut var_name = String::new();

        while let Some(c) = chars.next() {
            match c {
                '}' => return Ok((var_name, None, None)),
                ':' => match chars.peek() {
                    Some('-') => {
                        chars.next();
                        let default = Self::read_until_close(chars, source_path)?;
                        return Ok((var_name, Some(default), None));
                    }
                    Some('?') => {
                        chars.next();
                        let msg = Self::read_until_close(chars, source_path)?;
                        return Ok((var_name, None, Some(msg)));
                    }
                    _ => var_name.push(':'),
                },
                _ => var_name.push(c),
            }
        }

        Err(unclosed(source_path, &var_name))
    }

    /// Reads up to the matching `}`, allowing nested braces.
    fn read_until_close(chars: &mut Chars<'_>, source_path: &Path) -> Result<String, ConfigError> {
        let mut value = String::new();
        let mut depth = 1;

        for c in chars.by_ref() {
            match c {
                '{' => {
                    depth += 1;
                    value.push(c);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(value);
                    }
                    value.push(c);
                }
                _ => value.push(c),
            }
        }

        Err(unclosed(source_path, &value))
    }
}

fn unclosed(path: &Path, fragment: &str) -> ConfigError {
    ConfigError::ParseError {
        path: PathBuf::from(path),
        line: None,
        message: format!("Unclosed environment variable reference: ${{{fragment}"),
    }
}

/// Parses an environment variable, falling back to `default`.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
