use crate::core::{GokiError, Result};
use crate::storage::{DEFAULT_ACCESS_TIMEOUT, HttpMedium};
use reqwest::{Client, Url};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

pub const USER_DB_ENV: &str = "GOKI_USER_DB";
pub const ACTIVITY_DB_ENV: &str = "GOKI_ACTIVITY_DB";
pub const TIMEOUT_ENV: &str = "GOKI_STORE_TIMEOUT_SECS";
pub const TOKEN_ENV: &str = "GOKI_STORE_TOKEN";

const DEFAULT_USER_DB: &str = "./userDB.json";
const DEFAULT_ACTIVITY_DB: &str = "./activityDB.json";

/// Where one store document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    /// Object `object` inside the bucket at `base_url`.
    Remote { base_url: String, object: String },
}

impl StoreLocation {
    /// Parses `http(s)://host/bucket/object`, `file:///path`, or a bare path.
    pub fn parse(location: &str) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(GokiError::Config("store location cannot be empty".to_string()));
        }

        if location.starts_with("http://") || location.starts_with("https://") {
            let url = Url::parse(location).map_err(|err| {
                GokiError::Config(format!("invalid store URL '{}': {}", location, err))
            })?;
            if url.host_str().is_none() {
                return Err(GokiError::Config(format!("store URL '{}' has no host", location)));
            }
            // `base_url` must be longer than the bare `scheme://` prefix.
            let min_base_len = url.scheme().len() + 2;
            return match location.rsplit_once('/') {
                Some((base_url, object)) if !object.is_empty() && base_url.len() > min_base_len => {
                    Ok(Self::Remote {
                        base_url: base_url.to_string(),
                        object: object.to_string(),
                    })
                }
                _ => Err(GokiError::Config(format!(
                    "store URL '{}' must name an object",
                    location
                ))),
            };
        }

        let path = location.strip_prefix("file://").unwrap_or(location);
        Ok(Self::File(PathBuf::from(path)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// True when both locations name the same document. File paths are
    /// compared lexically after making them absolute; symlinks are not
    /// followed.
    pub fn same_document(&self, other: &StoreLocation) -> bool {
        match (self, other) {
            (Self::File(left), Self::File(right)) => normalized(left) == normalized(right),
            (Self::Remote { .. }, Self::Remote { .. }) => self.to_string() == other.to_string(),
            _ => false,
        }
    }
}

fn normalized(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Remote { base_url, object } => write!(f, "{}/{}", base_url, object),
        }
    }
}

/// Locations and access settings for the user and activity stores.
#[derive(Clone)]
pub struct StoreConfig {
    pub users: StoreLocation,
    pub activities: StoreLocation,

    /// Bound for every remote read, write, or probe.
    pub timeout: Duration,

    /// Sent as `Authorization: Bearer` to remote media.
    pub bearer_token: Option<String>,
}

impl StoreConfig {
    pub fn new(users: StoreLocation, activities: StoreLocation) -> Self {
        Self {
            users,
            activities,
            timeout: DEFAULT_ACCESS_TIMEOUT,
            bearer_token: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Defaults overridden by `GOKI_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(users) = lookup(USER_DB_ENV) {
            config.users = StoreLocation::parse(&users)?;
        }
        if let Some(activities) = lookup(ACTIVITY_DB_ENV) {
            config.activities = StoreLocation::parse(&activities)?;
        }
        if let Some(secs) = lookup(TIMEOUT_ENV) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| {
                    GokiError::Config(format!(
                        "{} must be whole seconds, got '{}'",
                        TIMEOUT_ENV, secs
                    ))
                })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|token| !token.is_empty()) {
            config.bearer_token = Some(token);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(GokiError::Config("timeout must be > 0".to_string()));
        }
        if self.users.same_document(&self.activities) {
            return Err(GokiError::Config(format!(
                "user and activity stores cannot share '{}'",
                self.users
            )));
        }
        Ok(())
    }

    /// Client shared by every remote medium, or `None` when all stores are
    /// local files.
    pub fn http_client(&self) -> Result<Option<Client>> {
        if !self.users.is_remote() && !self.activities.is_remote() {
            return Ok(None);
        }
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map(Some)
            .map_err(|err| GokiError::Config(format!("could not build HTTP client: {}", err)))
    }

    pub(crate) fn http_medium(&self, client: &Client, base_url: &str, object: &str) -> HttpMedium {
        let medium = HttpMedium::new(client.clone(), base_url, object).with_timeout(self.timeout);
        match &self.bearer_token {
            Some(token) => medium.with_bearer_token(token.clone()),
            None => medium,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(
            StoreLocation::File(PathBuf::from(DEFAULT_USER_DB)),
            StoreLocation::File(PathBuf::from(DEFAULT_ACTIVITY_DB)),
        )
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("users", &self.users)
            .field("activities", &self.activities)
            .field("timeout", &self.timeout)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.users, StoreLocation::File(PathBuf::from("./userDB.json")));
        assert_eq!(config.activities, StoreLocation::File(PathBuf::from("./activityDB.json")));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.http_client().unwrap().is_none());
    }

    #[test]
    fn test_parse_locations() {
        assert_eq!(
            StoreLocation::parse("file:///var/lib/goki/userDB.json").unwrap(),
            StoreLocation::File(PathBuf::from("/var/lib/goki/userDB.json"))
        );
        assert_eq!(
            StoreLocation::parse("data/activityDB.json").unwrap(),
            StoreLocation::File(PathBuf::from("data/activityDB.json"))
        );
        assert_eq!(
            StoreLocation::parse("https://storage.googleapis.com/goki-db/userDB.json").unwrap(),
            StoreLocation::Remote {
                base_url: "https://storage.googleapis.com/goki-db".to_string(),
                object: "userDB.json".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_locations() {
        assert!(StoreLocation::parse("").is_err());
        assert!(StoreLocation::parse("https://storage.googleapis.com/goki-db/").is_err());
        assert!(StoreLocation::parse("http://").is_err());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (USER_DB_ENV, "http://127.0.0.1:9000/bucket/userDB.json"),
            (TIMEOUT_ENV, "3"),
            (TOKEN_ENV, "secret-token"),
        ]);
        let config = StoreConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert!(config.users.is_remote());
        assert_eq!(config.activities, StoreLocation::File(PathBuf::from("./activityDB.json")));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(config.http_client().unwrap().is_some());
        assert!(!format!("{:?}", config).contains("secret-token"));
    }

    #[test]
    fn test_from_lookup_rejects_bad_timeout() {
        let err = StoreConfig::from_lookup(|key| (key == TIMEOUT_ENV).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(TIMEOUT_ENV));

        let err = StoreConfig::from_lookup(|key| (key == TIMEOUT_ENV).then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, GokiError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_shared_location() {
        let location = StoreLocation::File(PathBuf::from("db.json"));
        let config = StoreConfig::new(location.clone(), location);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_equivalent_paths() {
        let same = [
            ("./userDB.json", "userDB.json"),
            ("data/../userDB.json", "userDB.json"),
            ("file://./db/userDB.json", "db/./userDB.json"),
        ];
        for (users, activities) in same {
            let config = StoreConfig::new(
                StoreLocation::parse(users).unwrap(),
                StoreLocation::parse(activities).unwrap(),
            );
            assert!(config.validate().is_err(), "{} vs {}", users, activities);
        }

        let config = StoreConfig::new(
            StoreLocation::parse("./goki.users").unwrap(),
            StoreLocation::parse("./goki.activities").unwrap(),
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_remote_and_file_never_share_a_document() {
        let remote = StoreLocation::parse("http://127.0.0.1:9000/bucket/userDB.json").unwrap();
        let file = StoreLocation::parse("userDB.json").unwrap();
        assert!(!remote.same_document(&file));
        assert!(remote.same_document(&remote.clone()));
    }
}
