//! Configuration for the remote mirror.

use crate::error::{MirrorError, MirrorResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt;
use std::time::Duration;

/// Default API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default path of the mirrored guestbook in the remote repository.
pub const DEFAULT_REMOTE_PATH: &str = "guestbook.json";

/// Environment variable holding the bearer token.
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
/// Environment variable holding the `owner/repo` identifier.
pub const ENV_REPO: &str = "GITHUB_REPO";
/// Environment variable holding an optional target branch.
pub const ENV_BRANCH: &str = "GITHUB_BRANCH";
/// Environment variable overriding the API endpoint.
pub const ENV_API_URL: &str = "GITHUB_API_URL";
/// Environment variable overriding the remote path.
pub const ENV_REMOTE_PATH: &str = "GUESTBOOK_MIRROR_PATH";

/// Characters escaped inside one URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped inside a query value.
const QUERY_VALUE: &AsciiSet = &SEGMENT.add(b'&').add(b'=').add(b'+');

/// Configuration for the remote mirror.
///
/// Built once at startup and handed to [`crate::MirrorClient`]; nothing in
/// this crate reads the environment behind the caller's back.
#[derive(Clone)]
pub struct MirrorConfig {
    /// Bearer token.
    pub token: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Target branch (the repository default when `None`).
    pub branch: Option<String>,
    /// API endpoint, without a trailing slash.
    pub api_base: String,
    /// Path of the mirrored document inside the repository.
    pub remote_path: String,
    /// Timeout applied to each request.
    pub timeout: Duration,
    /// `User-Agent` sent with each request.
    pub user_agent: String,
}

impl MirrorConfig {
    /// Creates a configuration for `repository` (`owner/repo`).
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Config`] if `repository` is not of the form
    /// `owner/repo`.
    pub fn new(token: impl Into<String>, repository: &str) -> MirrorResult<Self> {
        let (owner, repo) = parse_repository(repository)?;
        Ok(Self {
            token: token.into(),
            owner,
            repo,
            branch: None,
            api_base: DEFAULT_API_BASE.to_string(),
            remote_path: DEFAULT_REMOTE_PATH.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: format!("devhost/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Reads the configuration from the process environment.
    ///
    /// Returns `Ok(None)` when the token or the repository is unset or
    /// empty: mirroring is simply disabled in that case.
    pub fn from_env() -> MirrorResult<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps variable names
    /// to values.
    pub fn from_lookup<F>(lookup: F) -> MirrorResult<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (Some(token), Some(repository)) = (present(ENV_TOKEN), present(ENV_REPO)) else {
            return Ok(None);
        };

        let mut config = Self::new(token, &repository)?;
        if let Some(branch) = present(ENV_BRANCH) {
            config = config.with_branch(branch);
        }
        if let Some(api_base) = present(ENV_API_URL) {
            config = config.with_api_base(api_base);
        }
        if let Some(path) = present(ENV_REMOTE_PATH) {
            config = config.with_remote_path(path);
        }
        Ok(Some(config))
    }

    /// Sets the target branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Sets the API endpoint.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the path of the mirrored document.
    pub fn with_remote_path(mut self, path: impl Into<String>) -> Self {
        self.remote_path = path.into().trim_matches('/').to_string();
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the `owner/repo` identifier.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Returns the contents URL of `path` in the repository.
    pub fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect();
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            utf8_percent_encode(&self.owner, SEGMENT),
            utf8_percent_encode(&self.repo, SEGMENT),
            encoded.join("/")
        )
    }

    /// Returns the URL used to look up the current version of `path`.
    pub fn lookup_url(&self, path: &str) -> String {
        let url = self.contents_url(path);
        match &self.branch {
            Some(branch) => format!("{url}?ref={}", utf8_percent_encode(branch, QUERY_VALUE)),
            None => url,
        }
    }
}

impl fmt::Debug for MirrorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorConfig")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_base", &self.api_base)
            .field("remote_path", &self.remote_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_repository(repository: &str) -> MirrorResult<(String, String)> {
    let mut parts = repository.trim().split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(MirrorError::Config(format!(
            "repository must look like owner/repo, got {repository:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn config_builder() {
        let config = MirrorConfig::new("secret", "octo/site")
            .unwrap()
            .with_branch("main")
            .with_api_base("http://127.0.0.1:9000/")
            .with_remote_path("/data/guestbook.json")
            .with_timeout(Duration::from_secs(3));

        assert_eq!(config.repository(), "octo/site");
        assert_eq!(config.api_base, "http://127.0.0.1:9000");
        assert_eq!(config.remote_path, "data/guestbook.json");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn repository_must_have_one_slash() {
        for bad in ["octo", "octo/site/extra", "/site", "octo/", ""] {
            assert!(matches!(MirrorConfig::new("t", bad), Err(MirrorError::Config(_))), "{bad}");
        }
    }

    #[test]
    fn urls() {
        let config = MirrorConfig::new("t", "octo/site").unwrap();
        assert_eq!(
            config.contents_url("data/guest book.json"),
            "https://api.github.com/repos/octo/site/contents/data/guest%20book.json"
        );
        assert_eq!(config.lookup_url("a.json"), config.contents_url("a.json"));

        let config = config.with_branch("feature/x");
        assert_eq!(
            config.lookup_url("a.json"),
            "https://api.github.com/repos/octo/site/contents/a.json?ref=feature%2Fx"
        );
    }

    #[test]
    fn env_disabled_without_token_or_repo() {
        assert!(MirrorConfig::from_lookup(lookup(&[])).unwrap().is_none());
        assert!(MirrorConfig::from_lookup(lookup(&[(ENV_TOKEN, "t")])).unwrap().is_none());
        assert!(MirrorConfig::from_lookup(lookup(&[(ENV_REPO, "o/r")])).unwrap().is_none());
        assert!(MirrorConfig::from_lookup(lookup(&[(ENV_TOKEN, " "), (ENV_REPO, "o/r")]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn env_full_configuration() {
        let config = MirrorConfig::from_lookup(lookup(&[
            (ENV_TOKEN, "t"),
            (ENV_REPO, "o/r"),
            (ENV_BRANCH, "pages"),
            (ENV_API_URL, "http://localhost:1234"),
            (ENV_REMOTE_PATH, "gb.json"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(config.branch.as_deref(), Some("pages"));
        assert_eq!(config.api_base, "http://localhost:1234");
        assert_eq!(config.remote_path, "gb.json");
    }

    #[test]
    fn env_rejects_malformed_repo() {
        let result = MirrorConfig::from_lookup(lookup(&[(ENV_TOKEN, "t"), (ENV_REPO, "nope")]));
        assert!(matches!(result, Err(MirrorError::Config(_))));
    }

    #[test]
    fn debug_hides_token() {
        let config = MirrorConfig::new("super-secret", "o/r").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("redacted"));
    }
}
