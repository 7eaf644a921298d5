//! Bearer credential handling: the saved session file and the OAuth2
//! redirect hand-off.

use crate::error::{Error, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::PathBuf,
    str::FromStr,
};
use tracing::debug;

/// Opaque bearer token. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    token: Credential,
}

/// Keeps the credential between invocations in a single JSON file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The saved credential, or `None` when there is no usable session file.
    pub fn load(&self) -> Option<Credential> {
        let data = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<SessionFile>(&data) {
            Ok(file) => Some(file.token),
            Err(err) => {
                debug!(path = %self.path.display(), %err, "ignoring unreadable session file");
                None
            }
        }
    }

    pub fn save(&self, credential: &Credential) -> Result<()> {
        let file = SessionFile {
            token: credential.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    GitHub,
}

impl OAuthProvider {
    pub fn slug(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::GitHub => "github",
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::GitHub),
            other => Err(Error::Validation(format!("unknown OAuth provider: {other}"))),
        }
    }
}

/// URL that starts the provider's login; the API redirects back to
/// `redirect_uri` with `?token=` or `?error=`.
pub fn authorize_url(api_base: &str, provider: OAuthProvider, redirect_uri: &str) -> Result<Url> {
    let mut url = Url::parse(&format!(
        "{}/api/auth/oauth2/authorize/{}",
        api_base.trim_end_matches('/'),
        provider.slug()
    ))
    .map_err(|err| Error::Validation(format!("invalid API base URL {api_base:?}: {err}")))?;
    url.query_pairs_mut().append_pair("redirect_uri", redirect_uri);
    Ok(url)
}

/// Reads the credential out of the URL the browser landed on after the
/// OAuth redirect. A bare query string (`?token=...`) is accepted too.
pub fn parse_callback(callback: &str) -> Result<Credential> {
    let callback = callback.trim();
    let url = if callback.starts_with('?') {
        Url::parse(&format!("http://localhost/{callback}"))
    } else {
        Url::parse(callback)
    }
    .map_err(|err| Error::Validation(format!("invalid callback URL: {err}")))?;

    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "token" if !value.is_empty() => return Ok(Credential::new(value.into_owned())),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }
    match error {
        Some(reason) => Err(Error::Auth(reason)),
        None => Err(Error::Validation(
            "callback URL carries neither a token nor an error".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn debug_hides_the_token() {
        let credential = Credential::new("secret-jwt");
        assert!(!format!("{credential:?}").contains("secret"));
    }

    #[test]
    fn session_round_trip_and_clear() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        assert_eq!(store.load(), None);
        store.save(&Credential::new("abc")).unwrap();
        assert_eq!(store.load(), Some(Credential::new("abc")));

        store.clear().unwrap();
        assert_eq!(store.load(), None);
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_session_file_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(SessionStore::new(path).load(), None);
    }

    #[test]
    fn builds_authorize_url() {
        let url = authorize_url(
            "http://localhost:8080/",
            OAuthProvider::GitHub,
            "http://127.0.0.1:5500",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/auth/oauth2/authorize/github?redirect_uri=http%3A%2F%2F127.0.0.1%3A5500"
        );
    }

    #[test]
    fn callback_with_token() {
        let credential = parse_callback("http://127.0.0.1:5500/?token=eyJ.abc").unwrap();
        assert_eq!(credential.token(), "eyJ.abc");
        assert_eq!(parse_callback("?token=t1").unwrap().token(), "t1");
    }

    #[test]
    fn callback_with_error_is_an_auth_failure() {
        let err = parse_callback("http://127.0.0.1:5500/?error=access%20denied").unwrap_err();
        assert!(matches!(err, Error::Auth(ref m) if m == "access denied"));
    }

    #[test]
    fn callback_without_either_is_invalid() {
        assert!(matches!(
            parse_callback("http://127.0.0.1:5500/"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn provider_names() {
        assert_eq!("GitHub".parse::<OAuthProvider>().unwrap(), OAuthProvider::GitHub);
        assert!("facebook".parse::<OAuthProvider>().is_err());
    }
}
