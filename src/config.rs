use crate::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "taskers.toml";
pub const ENV_PREFIX: &str = "TASKERS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api_base: String,
    /// Where the OAuth provider sends the browser back to.
    pub redirect_uri: String,
    pub request_timeout_secs: u64,
    pub session_file: PathBuf,
    pub notice_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080".to_string(),
            redirect_uri: "http://127.0.0.1:5500".to_string(),
            request_timeout_secs: 30,
            session_file: PathBuf::from(".taskers_session.json"),
            notice_ttl_secs: 5,
        }
    }
}

impl Settings {
    /// Defaults, then `taskers.toml` in the working directory if present,
    /// then `TASKERS_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(file: &Path) -> Result<Self> {
        let defaults = Settings::default();
        let settings = config::Config::builder()
            .set_default("api_base", defaults.api_base)?
            .set_default("redirect_uri", defaults.redirect_uri)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default(
                "session_file",
                defaults.session_file.to_string_lossy().into_owned(),
            )?
            .set_default("notice_ttl_secs", defaults.notice_ttl_secs)?
            .add_source(config::File::from(file).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_secs)
    }
}
