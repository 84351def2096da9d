//! Locally persisted settings.
//!
//! Credentials live in a small JSON key-value file under two fixed keys. A
//! `.env` file and `TIMEGIST_*` environment variables override the file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use dotenv::dotenv;
use indexmap::IndexMap;
use tracing::debug;

use crate::gist::{GistConfig, DEFAULT_API_URL};
use crate::sync::SyncPolicy;

pub const TOKEN_KEY: &str = "gh_token";
pub const GIST_KEY: &str = "gh_gist_id";
const API_URL_KEY: &str = "api_url";
const POLICY_KEY: &str = "sync_policy";
const CONDITIONAL_KEY: &str = "conditional_writes";

const CONFIG_ENV: &str = "TIMEGIST_CONFIG";
const TOKEN_ENV: &str = "TIMEGIST_TOKEN";
const GIST_ENV: &str = "TIMEGIST_GIST_ID";
const API_URL_ENV: &str = "TIMEGIST_API_URL";
const POLICY_ENV: &str = "TIMEGIST_POLICY";

/// String keys to string values, kept in insertion order on disk.
#[derive(Debug, Clone)]
pub struct KeyValueFile {
    path: PathBuf,
    values: IndexMap<String, String>,
}

impl KeyValueFile {
    /// A missing file reads as empty.
    pub fn open(path: &Path) -> Result<Self> {
        let values = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<IndexMap<String, String>>(&raw)
                .with_context(|| format!("Settings file {} is not valid", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexMap::new(),
            Err(e) => return Err(e).context(format!("Failed to read {}", path.display())),
        };
        Ok(KeyValueFile {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

pub fn default_settings_path() -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let mut path = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            env::var("HOME").map(|home| {
                let mut path = PathBuf::from(home);
                path.push(".config");
                path
            })
        })
        .map_err(|_| anyhow!("Neither XDG_CONFIG_HOME nor HOME is set; use {}", CONFIG_ENV))?;
    path.push("timegist");
    path.push("settings.json");
    Ok(path)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub token: Option<String>,
    pub gist_id: Option<String>,
    pub api_url: String,
    pub policy: SyncPolicy,
    pub conditional_writes: bool,
}

impl Settings {
    /// Reads `.env`, the settings file and the environment.
    pub fn load() -> Result<(Settings, KeyValueFile)> {
        dotenv().ok();
        let file = KeyValueFile::open(&default_settings_path()?)?;
        let settings = Settings::resolve(&file, |key| env::var(key).ok())?;
        Ok((settings, file))
    }

    /// Environment values win over file values.
    pub fn resolve<F>(file: &KeyValueFile, env: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |env_key: &str, file_key: &str| {
            env(env_key)
                .or_else(|| file.get(file_key).map(String::from))
                .filter(|v| !v.trim().is_empty())
        };

        let policy = match pick(POLICY_ENV, POLICY_KEY) {
            Some(raw) => raw.parse::<SyncPolicy>().map_err(|e| anyhow!(e))?,
            None => SyncPolicy::default(),
        };
        let conditional_writes = match file.get(CONDITIONAL_KEY) {
            Some(raw) => raw
                .parse::<bool>()
                .with_context(|| format!("{} must be true or false", CONDITIONAL_KEY))?,
            None => true,
        };

        Ok(Settings {
            token: pick(TOKEN_ENV, TOKEN_KEY),
            gist_id: pick(GIST_ENV, GIST_KEY),
            api_url: pick(API_URL_ENV, API_URL_KEY).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            policy,
            conditional_writes,
        })
    }

    pub fn gist_config(&self) -> Result<GistConfig> {
        let (token, gist_id) = match (&self.token, &self.gist_id) {
            (Some(token), Some(gist_id)) => (token.clone(), gist_id.clone()),
            _ => bail!("No credentials saved. Run: timegist --config \"TOKEN|GIST_ID\""),
        };
        Ok(GistConfig {
            api_url: self.api_url.clone(),
            token,
            gist_id,
            conditional_writes: self.conditional_writes,
            ..GistConfig::default()
        })
    }
}

/// Both values are required; nothing is written otherwise.
pub fn save_credentials(file: &mut KeyValueFile, token: &str, gist_id: &str) -> Result<()> {
    let (token, gist_id) = (token.trim(), gist_id.trim());
    if token.is_empty() || gist_id.is_empty() {
        bail!("Both a token and a gist id are required.");
    }
    file.set(TOKEN_KEY, token);
    file.set(GIST_KEY, gist_id);
    file.save()
}

/// Last four characters only.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_save_and_reopen_credentials() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("settings.json");

        let mut file = KeyValueFile::open(&path)?;
        save_credentials(&mut file, " ghp_secret ", "abc123")?;

        let reopened = KeyValueFile::open(&path)?;
        assert_eq!(reopened.get(TOKEN_KEY), Some("ghp_secret"));
        assert_eq!(reopened.get(GIST_KEY), Some("abc123"));

        let settings = Settings::resolve(&reopened, no_env)?;
        let config = settings.gist_config()?;
        assert_eq!(config.token, "ghp_secret");
        assert_eq!(config.gist_id, "abc123");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.conditional_writes);

        Ok(())
    }

    #[test]
    fn test_partial_credentials_are_not_saved() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("settings.json");
        let mut file = KeyValueFile::open(&path)?;

        assert!(save_credentials(&mut file, "token", "").is_err());
        assert!(!path.exists());

        Ok(())
    }

    #[test]
    fn test_missing_credentials() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = KeyValueFile::open(&dir.path().join("settings.json"))?;

        let settings = Settings::resolve(&file, no_env)?;

        assert_eq!(settings.token, None);
        assert_eq!(settings.policy, SyncPolicy::ReadBeforeWrite);
        assert!(settings.gist_config().is_err());

        Ok(())
    }

    #[test]
    fn test_environment_overrides_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut file = KeyValueFile::open(&dir.path().join("settings.json"))?;
        file.set(TOKEN_KEY, "from-file");
        file.set(GIST_KEY, "gist-file");
        file.set(POLICY_KEY, "read-before-write");
        file.set(CONDITIONAL_KEY, "false");

        let env: HashMap<&str, &str> = vec![
            (TOKEN_ENV, "from-env"),
            (POLICY_ENV, "trust-local"),
            (API_URL_ENV, "http://localhost:9000"),
        ]
        .into_iter()
        .collect();
        let settings = Settings::resolve(&file, |k| env.get(k).map(|v| v.to_string()))?;

        assert_eq!(settings.token.as_deref(), Some("from-env"));
        assert_eq!(settings.gist_id.as_deref(), Some("gist-file"));
        assert_eq!(settings.policy, SyncPolicy::TrustLocal);
        assert_eq!(settings.api_url, "http://localhost:9000");
        assert!(!settings.conditional_writes);

        Ok(())
    }

    #[test]
    fn test_bad_policy_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut file = KeyValueFile::open(&dir.path().join("settings.json"))?;
        file.set(POLICY_KEY, "sometimes");

        assert!(Settings::resolve(&file, no_env).is_err());

        Ok(())
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("ghp_abcdef1234"), "****1234");
        assert_eq!(mask_token("abc"), "****");
    }
}
