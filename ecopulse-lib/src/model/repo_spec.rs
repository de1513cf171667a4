use crate::Result;
use core::fmt::{Display, Formatter};
use ohno::{IntoAppError, bail};
use std::sync::Arc;
use url::Url;

/// A repository location parsed from a manifest URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSpec {
    url: Arc<Url>,
    host: Arc<str>,
    owner: Arc<str>,
    name: Arc<str>,
}

impl RepoSpec {
    /// Parse a manifest URL, keeping only the owner and repository segments.
    ///
    /// Trailing path segments such as `/tree/main/src` and a `.git` suffix are dropped so
    /// every path inside one repository maps to the same spec.
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url.trim()).into_app_err_with(|| format!("invalid repository URL '{url}'"))?;
        let Some(host) = parsed.host_str() else {
            bail!("repository URL has no host: {parsed}");
        };

        let mut segments = parsed.path_segments().into_iter().flatten();
        let owner = segments.next().unwrap_or_default();
        let name = segments.next().unwrap_or_default().trim_end_matches(".git");
        if owner.is_empty() || name.is_empty() {
            bail!("repository URL needs both an owner and a name: {parsed}");
        }

        let canonical = Url::parse(&format!("{}://{host}/{owner}/{name}", parsed.scheme()))
            .into_app_err_with(|| format!("rebuilding repository URL from '{parsed}'"))?;

        Ok(Self {
            host: Arc::from(host),
            owner: Arc::from(owner),
            name: Arc::from(name),
            url: Arc::new(canonical),
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store key, `owner#name`.
    #[must_use]
    pub fn key(&self) -> String {
        repository_key(&self.owner, &self.name)
    }
}

impl Display for RepoSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Store key for a repository.
#[must_use]
pub fn repository_key(owner: &str, name: &str) -> String {
    format!("{owner}#{name}")
}
