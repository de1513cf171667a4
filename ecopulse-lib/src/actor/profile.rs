use core::time::Duration;
use strum::{Display, EnumIter};

/// The upstream providers the pipeline talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ProviderKind {
    #[strum(serialize = "GitHub REST")]
    GithubRest,
    #[strum(serialize = "GitHub GraphQL")]
    GithubGraphql,
    #[strum(serialize = "forum")]
    Forum,
    #[strum(serialize = "governance")]
    Governance,
    #[strum(serialize = "asset data")]
    AssetData,
    #[strum(serialize = "developer report")]
    DeveloperReport,
    #[strum(serialize = "manifest")]
    Manifest,
}

/// How credentials are attached to requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: token <credential>`
    Token,
    /// `Authorization: Bearer <credential>`
    Bearer,
    /// `<header>: <credential>`
    Header(&'static str),
}

/// Retry and backoff limits applied by an [`Actor`](super::Actor).
///
/// Every loop is bounded: not-ready and rate-limited responses have attempt caps in
/// addition to the server-error retry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub not_ready_delay: Duration,
    pub max_not_ready_attempts: u32,
    pub rate_limit_delay: Duration,
    pub max_rate_limit_attempts: u32,
    pub max_rate_limit_wait: Duration,
    pub max_server_retries: u32,
    pub server_retry_base_delay: Duration,
    pub request_timeout: Duration,
}

impl RetryPolicy {
    const DEFAULT: Self = Self {
        not_ready_delay: Duration::from_millis(1100),
        max_not_ready_attempts: 30,
        rate_limit_delay: Duration::from_secs(10),
        max_rate_limit_attempts: 10,
        max_rate_limit_wait: Duration::from_secs(3600),
        max_server_retries: 3,
        server_retry_base_delay: Duration::from_secs(1),
        request_timeout: Duration::from_secs(60),
    };

    /// Policy for slower providers that ask for long cool-downs.
    #[must_use]
    pub const fn slow() -> Self {
        Self::DEFAULT
    }

    /// Policy for providers with short rate windows.
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            rate_limit_delay: Duration::from_millis(1100),
            ..Self::DEFAULT
        }
    }

    /// Same attempt caps, every delay replaced by `delay`. Used to keep tests quick.
    #[must_use]
    pub const fn with_delays(self, delay: Duration) -> Self {
        Self {
            not_ready_delay: delay,
            rate_limit_delay: delay,
            server_retry_base_delay: delay,
            ..self
        }
    }

    /// Delay before the `retry`-th server-error retry (1-based), doubling each time.
    #[must_use]
    pub fn server_backoff(&self, retry: u32) -> Duration {
        self.server_retry_base_delay
            .saturating_mul(1u32 << retry.saturating_sub(1).min(10))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Static description of an upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderProfile {
    pub kind: ProviderKind,
    pub base_url: &'static str,
    pub auth: AuthScheme,
    pub policy: RetryPolicy,
    pub max_concurrent: usize,
}

impl ProviderProfile {
    #[must_use]
    pub const fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::GithubRest => Self {
                kind,
                base_url: "https://api.github.com",
                auth: AuthScheme::Token,
                policy: RetryPolicy {
                    not_ready_delay: Duration::from_millis(1500),
                    ..RetryPolicy::slow()
                },
                max_concurrent: 5,
            },
            ProviderKind::GithubGraphql => Self {
                kind,
                base_url: "https://api.github.com/graphql",
                auth: AuthScheme::Bearer,
                policy: RetryPolicy::slow(),
                max_concurrent: 2,
            },
            ProviderKind::Forum => Self {
                kind,
                base_url: "https://forum.example.org",
                auth: AuthScheme::Header("api-key"),
                policy: RetryPolicy::slow(),
                max_concurrent: 2,
            },
            ProviderKind::Governance => Self {
                kind,
                base_url: "https://api.tally.xyz/query",
                auth: AuthScheme::Header("api-key"),
                policy: RetryPolicy::fast(),
                max_concurrent: 1,
            },
            ProviderKind::AssetData => Self {
                kind,
                base_url: "https://data.messari.io",
                auth: AuthScheme::Header("x-messari-api-key"),
                policy: RetryPolicy::fast(),
                max_concurrent: 2,
            },
            ProviderKind::DeveloperReport => Self {
                kind,
                base_url: "https://api.developerreport.com",
                auth: AuthScheme::Bearer,
                policy: RetryPolicy::slow(),
                max_concurrent: 2,
            },
            ProviderKind::Manifest => Self {
                kind,
                base_url: "https://raw.githubusercontent.com/electric-capital/crypto-ecosystems/master/data/ecosystems",
                auth: AuthScheme::Token,
                policy: RetryPolicy::fast(),
                max_concurrent: 8,
            },
        }
    }
}
