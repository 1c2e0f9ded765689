//! # PMOMusic Configuration Module
//!
//! Configuration YAML partagée par les crates du workspace :
//! - configuration par défaut embarquée, fusionnée avec `config.yaml`
//! - surcharges par variables d'environnement (`PMOMUSIC_CONFIG__A__B=valeur`)
//! - accès par chemin de clés (`&["accounts", "pandora", "host"]`)
//! - singleton global paresseux via [`get_config`]
//! - secrets chiffrés avec une clé liée à la machine ([`encryption`])
//!
//! Les crates clientes ajoutent leurs accesseurs typés par un trait
//! d'extension implémenté sur [`Config`].
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::get_config;
//! use serde_yaml::Value;
//!
//! let config = get_config();
//! config.set_value(&["accounts", "pandora", "host"], Value::String("10.0.0.5".into()))?;
//! let level = config.get_log_min_level()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{info, warn};

pub mod encryption;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmomusic.yaml");

const CONFIG_FILE: &str = "config.yaml";
const CONFIG_DIR_NAME: &str = ".pmomusic";
const ENV_CONFIG_DIR: &str = "PMOMUSIC_CONFIG";
const ENV_PREFIX: &str = "PMOMUSIC_CONFIG__";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";

lazy_static! {
    static ref CONFIG: Arc<Config> = Arc::new(Config::load_config("").unwrap_or_else(|e| {
        warn!("Failed to load configuration ({}), falling back to in-memory defaults", e);
        Config::in_memory()
    }));
}

/// Configuration manager
///
/// Every setter writes the whole tree back to `config.yaml`. A configuration
/// created with [`Config::in_memory`] has no backing file and never saves.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(self.data().clone()),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        if Path::new(CONFIG_DIR_NAME).exists() {
            return CONFIG_DIR_NAME.to_string();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        CONFIG_DIR_NAME.to_string()
    }

    /// Determines the configuration directory, creating it if needed
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `PMOMUSIC_CONFIG` environment variable
    /// 3. `.pmomusic` in the current directory
    /// 4. `.pmomusic` in the user's home directory
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        let path = Path::new(&dir_path);

        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        if !path.is_dir() {
            return Err(anyhow!("{} n'est pas un répertoire", dir_path));
        }

        Ok(dir_path)
    }

    /// Loads the configuration from `directory` (empty for the default lookup)
    ///
    /// The embedded defaults are merged with `config.yaml` if present, keys
    /// are lowercased, environment overrides are applied and the result is
    /// saved back.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir = %config_dir, "Using config directory");

        let path = Path::new(&config_dir)
            .join(CONFIG_FILE)
            .to_string_lossy()
            .to_string();

        let mut value = lower_keys(Self::defaults()?);
        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path, "Loaded config file");
                let external: Value = serde_yaml::from_slice(&data)?;
                merge_yaml(&mut value, &lower_keys(external));
            }
            Err(_) => info!(config_file = %path, "Config file not found, using defaults"),
        }

        Self::apply_env_overrides(&mut value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(value),
        };
        config.save()?;
        Ok(config)
    }

    /// Embedded defaults and environment overrides, without a backing file
    pub fn in_memory() -> Self {
        let mut value = Self::defaults()
            .map(lower_keys)
            .unwrap_or_else(|_| Value::Mapping(Mapping::new()));
        Self::apply_env_overrides(&mut value);

        Config {
            config_dir: String::new(),
            path: String::new(),
            data: Mutex::new(value),
        }
    }

    fn defaults() -> Result<Value> {
        Ok(serde_yaml::from_str(DEFAULT_CONFIG)?)
    }

    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Directory holding `config.yaml` (empty for an in-memory configuration)
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Writes the current tree to `config.yaml`
    pub fn save(&self) -> Result<()> {
        if self.path.is_empty() {
            return Ok(());
        }
        let yaml = serde_yaml::to_string(&*self.data())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets the value at `path` (e.g. `&["host", "logger", "min_level"]`) and saves
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        set_at(&mut self.data(), path, value)?;
        self.save()
    }

    /// Gets the value at `path`, or an error if the path doesn't exist
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data();
        let mut current = &*data;
        for (i, key) in path.iter().enumerate() {
            let Value::Mapping(map) = current else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            };
            current = map
                .get(Value::String(key.to_lowercase()))
                .ok_or_else(|| anyhow!("Path {} does not exist", path[..=i].join(".")))?;
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let path: Vec<&str> = rest.split("__").collect();
            let value = serde_yaml::from_str::<Value>(&value).unwrap_or(Value::String(value));
            if let Err(e) = set_at(config, &path, value) {
                warn!(env_var = %key, "Ignoring config override: {}", e);
            }
        }
    }

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) if !s.is_empty() => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    /// Définit le niveau de log minimum dans la configuration
    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Returns the global configuration instance, loaded on first access
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

fn set_at(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((first, rest)) = path.split_first() else {
        *data = value;
        return Ok(());
    };
    let Value::Mapping(map) = data else {
        return Err(anyhow!("Current node is not a map"));
    };

    let key = Value::String(first.to_lowercase());
    if rest.is_empty() {
        map.insert(key, value);
        return Ok(());
    }
    let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
    set_at(entry, rest, value)
}

fn lower_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lower_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys).collect()),
        other => other,
    }
}

/// Merges `external` into `default`: mappings recursively, scalars and
/// sequences by replacement
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
