use crate::extinction::{AbsorptionModel, CorrectionSettings};
use crate::selection::SelectionPolicy;
use crate::utils::enums::{DustExtinction, PixelOrdering, SchemaVersion};

use config::{Config, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

pub const TEST_CONFIG_FILE: &str = "tests/config.test.yaml";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config")]
    InvalidConfigError(#[from] config::ConfigError),
    #[error("could not find config file {0}")]
    ConfigFileNotFound(String),
    #[error("failed to read config file")]
    ReadConfigError(#[from] std::io::Error),
    #[error("environment variable expansion error")]
    EnvExpansionError(#[from] ExpandError),
    #[error("unknown dust extinction method '{0}'")]
    UnknownExtinctionMethod(String),
    #[error("zero-point table is calibrated for release {available}, not {requested}")]
    UnsupportedRelease { requested: String, available: String },
    #[error("zero-point correction requested without a zero-point table")]
    MissingZeropointTable,
    #[error("sky_map extinction requested without a dust map")]
    MissingDustMap,
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(thiserror::Error, Debug)]
pub enum ExpandError {
    #[error("Missing environment variable '{var_name}' for placeholder '{placeholder}'")]
    MissingVariable {
        var_name: String,
        placeholder: String,
    },
    #[error("invalid placeholder pattern")]
    Pattern(#[from] regex::Error),
}

/// Loads environment variables from a .env file if it exists.
///
/// Looks in the current directory, then its parent. A missing file is not an
/// error: the variables may come from the environment.
pub fn load_dotenv() {
    for candidate in [".env", "../.env"] {
        if Path::new(candidate).exists() {
            match dotenvy::from_path(candidate) {
                Ok(_) => info!("Loaded environment variables from {} file", candidate),
                Err(e) => warn!("Found {} file but failed to load it: {}", candidate, e),
            }
            return;
        }
    }
    debug!("No .env file found, using system environment variables only");
}

/// Expands environment variable placeholders in a string.
/// Supports both ${VAR_NAME} and ${VAR_NAME:-default_value} syntax.
///
/// Examples:
/// - "${PFS_DATA}/offsets.csv.gz" -> reads from PFS_DATA env var
/// - "${PFS_RELEASE:-pdr3}" -> reads from PFS_RELEASE, falls back to "pdr3"
pub fn expand_env_vars(input: &str) -> Result<String, ExpandError> {
    let re = Regex::new(r"\$\{([^}:]+)(?::-(.*?))?\}")?;
    let mut result = input.to_string();
    let mut replacements: HashMap<String, String> = HashMap::new();

    for capture in re.captures_iter(input) {
        let (Some(full_match), Some(var_name)) = (capture.get(0), capture.get(1)) else {
            continue;
        };
        let (full_match, var_name) = (full_match.as_str(), var_name.as_str());
        if replacements.contains_key(full_match) {
            continue;
        }
        let default_value = capture.get(2).map(|m| m.as_str());

        let env_value = match env::var(var_name) {
            Ok(value) => {
                debug!("Expanded environment variable: {} = [REDACTED]", var_name);
                value
            }
            Err(_) => match default_value {
                Some(default) => {
                    warn!(
                        "Environment variable {} not found, using default value",
                        var_name
                    );
                    default.to_string()
                }
                None => {
                    return Err(ExpandError::MissingVariable {
                        var_name: var_name.to_string(),
                        placeholder: full_match.to_string(),
                    })
                }
            },
        };

        result = result.replace(full_match, &env_value);
        replacements.insert(full_match.to_string(), env_value);
    }

    Ok(result)
}

/// Read a YAML config file, expand `${VAR}` placeholders and layer
/// `PFS_TARGET_*` environment overrides on top (`__` separates nested keys,
/// e.g. `PFS_TARGET_SELECTION__RELEASE=s23`).
#[instrument(skip_all, fields(path = %path.display()), err)]
pub fn load_raw_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigFileNotFound(path.display().to_string()));
    }
    let file_content = std::fs::read_to_string(path)?;
    let expanded_content = expand_env_vars(&file_content)?;

    let conf = Config::builder()
        .add_source(File::from_str(&expanded_content, FileFormat::Yaml))
        .add_source(
            Environment::with_prefix("PFS_TARGET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(conf)
}

#[derive(Deserialize, Debug, Clone)]
pub struct SelectionConfig {
    pub dust_extinction: DustExtinction,
    pub release: String,
    #[serde(default)]
    pub apply_zeropoint: bool,
    #[serde(default)]
    pub schema: SchemaVersion,
    #[serde(default)]
    pub policy: SelectionPolicy,
}

impl SelectionConfig {
    pub fn correction_settings(&self) -> CorrectionSettings {
        CorrectionSettings {
            method: self.dust_extinction,
            release: self.release.clone(),
            apply_zeropoint: self.apply_zeropoint,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ZeropointConfig {
    pub path: PathBuf,
    /// Processing release the offsets were measured on.
    pub release: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DustMapConfig {
    pub path: PathBuf,
    pub nside: u32,
    #[serde(default)]
    pub ordering: PixelOrdering,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub selection: SelectionConfig,
    pub zeropoint: Option<ZeropointConfig>,
    pub dustmap: Option<DustMapConfig>,
    #[serde(default)]
    pub absorption: AbsorptionModel,
}

impl AppConfig {
    pub fn from_default_path() -> Result<Self, ConfigError> {
        Self::from_path("config.yaml")
    }

    /// Load and validate a config file. Relative table paths are resolved
    /// against the directory holding the file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_dotenv();
        let path = path.as_ref();
        let mut app_config: AppConfig = load_raw_config(path)?.try_deserialize()?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        if let Some(zp) = app_config.zeropoint.as_mut() {
            zp.path = resolve(base, &zp.path);
        }
        if let Some(dm) = app_config.dustmap.as_mut() {
            dm.path = resolve(base, &dm.path);
        }

        app_config.validate()?;
        info!(
            method = %app_config.selection.dust_extinction,
            release = %app_config.selection.release,
            policy = %app_config.selection.policy.name,
            "Configuration loaded successfully"
        );
        Ok(app_config)
    }

    /// Find `tests/config.test.yaml` in the current directory or one of its
    /// ancestors.
    pub fn from_test_config() -> Result<Self, ConfigError> {
        let mut current_dir = env::current_dir()?;
        loop {
            let test_config = current_dir.join(TEST_CONFIG_FILE);
            if test_config.exists() {
                return Self::from_path(test_config);
            }
            if !current_dir.pop() {
                return Err(ConfigError::ConfigFileNotFound(TEST_CONFIG_FILE.to_string()));
            }
        }
    }

    /// Check that the tables the selection needs are configured and that the
    /// policy thresholds are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let selection = &self.selection;
        if selection.dust_extinction == DustExtinction::SkyMap && self.dustmap.is_none() {
            return Err(ConfigError::MissingDustMap);
        }
        if selection.apply_zeropoint {
            let zp = self
                .zeropoint
                .as_ref()
                .ok_or(ConfigError::MissingZeropointTable)?;
            if zp.release != selection.release {
                return Err(ConfigError::UnsupportedRelease {
                    requested: selection.release.clone(),
                    available: zp.release.clone(),
                });
            }
        }
        let policy = &selection.policy;
        if policy.magnitude_cut.is_nan()
            || policy.magnitude_ceiling.is_nan()
            || policy.magnitude_cut >= policy.magnitude_ceiling
        {
            return Err(ConfigError::InvalidValue {
                key: "selection.policy.magnitude_cut".to_string(),
                reason: format!(
                    "must be below magnitude_ceiling ({})",
                    policy.magnitude_ceiling
                ),
            });
        }
        Ok(())
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
