use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::{debug, warn};

use wellnoosh_core::remote::RemoteBackend;
use wellnoosh_core::service::WellnooshService;

use crate::supabase::SupabaseClient;

pub const SUPABASE_URL_VAR: &str = "WELLNOOSH_SUPABASE_URL";
pub const SUPABASE_KEY_VAR: &str = "WELLNOOSH_SUPABASE_ANON_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseSettings {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseSettings {
    /// Both values must be present and non-blank for the backend to count as configured.
    pub fn from_values(url: Option<String>, anon_key: Option<String>) -> Option<Self> {
        let url = url.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let anon_key = anon_key
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        match (url, anon_key) {
            (Some(url), Some(anon_key)) => Some(Self { url, anon_key }),
            (Some(_), None) | (None, Some(_)) => {
                warn!("only one of {SUPABASE_URL_VAR}/{SUPABASE_KEY_VAR} is set, running offline");
                None
            }
            (None, None) => None,
        }
    }
}

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub supabase: Option<SupabaseSettings>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "wellnoosh").context("Could not determine home directory")?;
        let supabase = SupabaseSettings::from_values(
            std::env::var(SUPABASE_URL_VAR).ok(),
            std::env::var(SUPABASE_KEY_VAR).ok(),
        );
        Self::in_dir(proj_dirs.data_dir(), supabase)
    }

    pub fn in_dir(data_dir: &Path, supabase: Option<SupabaseSettings>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        Ok(Config {
            db_path: data_dir.join("wellnoosh.db"),
            data_dir: data_dir.to_path_buf(),
            supabase,
        })
    }

    /// Open the local store and attach the backend when one is configured.
    pub fn open_service(&self) -> Result<WellnooshService> {
        let remote: Option<Arc<dyn RemoteBackend>> = match &self.supabase {
            Some(settings) => {
                debug!(url = %settings.url, "using Supabase backend");
                Some(Arc::new(SupabaseClient::new(
                    &settings.url,
                    &settings.anon_key,
                )?))
            }
            None => None,
        };
        WellnooshService::open(&self.db_path, remote)
    }

    /// Load the API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)`.
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");
        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        Ok((key, true))
    }
}
