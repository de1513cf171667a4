use super::Progress;
use crate::Result;
use crate::actor::{Actor, ProviderKind, ProviderProfile};
use crate::config::{ProtocolConfig, Settings};
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicBool, Ordering};
use ohno::EnrichableExt;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared flag that asks a running pipeline to stop.
///
/// Checked between repositories and between steps; work already in flight finishes.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// API credentials, one per provider that takes them.
#[derive(Clone, Default)]
pub struct Credentials {
    pub github_token: Option<String>,
    pub forum_api_key: Option<String>,
    pub governance_api_key: Option<String>,
    pub asset_api_key: Option<String>,
    pub developer_report_api_key: Option<String>,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let redact = |c: &Option<String>| if c.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("github_token", &redact(&self.github_token))
            .field("forum_api_key", &redact(&self.forum_api_key))
            .field("governance_api_key", &redact(&self.governance_api_key))
            .field("asset_api_key", &redact(&self.asset_api_key))
            .field("developer_report_api_key", &redact(&self.developer_report_api_key))
            .finish()
    }
}

/// One actor per provider, built once per run so every protocol shares its rate budget.
#[derive(Debug, Clone)]
pub struct Actors {
    pub github_rest: Actor,
    pub github_graphql: Actor,
    pub manifests: Actor,
    pub governance: Actor,
    pub asset_data: Actor,
    pub developer_report: Actor,

    /// Forum actors by protocol name; every protocol has its own forum host.
    pub forums: HashMap<String, Actor>,
}

impl Actors {
    /// Build every actor, applying the configured endpoint overrides and retry bounds.
    pub fn new(settings: &Settings, protocols: &[ProtocolConfig], credentials: &Credentials) -> Result<Self> {
        let endpoints = &settings.endpoints;
        let build = |kind: ProviderKind, credential: Option<&String>, base_url: Option<&str>| -> Result<Actor> {
            let profile = ProviderProfile::for_kind(kind);
            let actor = Actor::new(&profile, credential.map(String::as_str), base_url)
                .map_err(|e| e.enrich_with(|| format!("creating the {kind} client")))?;
            Ok(actor.with_policy(settings.rate_limit.apply(profile.policy)))
        };

        let github_token = credentials.github_token.as_ref();

        let mut forums = HashMap::new();
        for protocol in protocols {
            if let Some(forum) = &protocol.forum {
                let actor = build(ProviderKind::Forum, credentials.forum_api_key.as_ref(), Some(&forum.url))?;
                let _ = forums.insert(protocol.name.clone(), actor);
            }
        }

        Ok(Self {
            github_rest: build(ProviderKind::GithubRest, github_token, endpoints.github_rest.as_deref())?,
            github_graphql: build(ProviderKind::GithubGraphql, github_token, endpoints.github_graphql.as_deref())?,
            // raw manifest files are public, the token only raises the rate limit
            manifests: build(ProviderKind::Manifest, github_token, Some(&settings.manifest_base_url))?,
            governance: build(
                ProviderKind::Governance,
                credentials.governance_api_key.as_ref(),
                endpoints.governance.as_deref(),
            )?,
            asset_data: build(ProviderKind::AssetData, credentials.asset_api_key.as_ref(), endpoints.asset_data.as_deref())?,
            developer_report: build(
                ProviderKind::DeveloperReport,
                credentials.developer_report_api_key.as_ref(),
                endpoints.developer_report.as_deref(),
            )?,
            forums,
        })
    }
}

/// Everything a pipeline run shares across protocols.
pub struct RunContext {
    pub actors: Actors,
    pub store: Arc<dyn DocumentStore>,
    pub settings: Settings,
    pub now: DateTime<Utc>,
    pub cancel: CancellationFlag,
    pub progress: Arc<dyn Progress>,
}

impl RunContext {
    pub fn new(
        settings: Settings,
        protocols: &[ProtocolConfig],
        credentials: &Credentials,
        store: Arc<dyn DocumentStore>,
        progress: Arc<dyn Progress>,
    ) -> Result<Self> {
        Ok(Self {
            actors: Actors::new(&settings, protocols, credentials)?,
            store,
            settings,
            now: Utc::now(),
            cancel: CancellationFlag::new(),
            progress,
        })
    }
}

impl Debug for RunContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunContext")
            .field("actors", &self.actors)
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("now", &self.now)
            .field("cancel", &self.cancel)
            .field("progress", &"<progress>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointOverrides, ForumConfig};
    use crate::pipeline::NoProgress;
    use crate::store::MemoryStore;

    fn protocol(name: &str, forum: Option<&str>) -> ProtocolConfig {
        ProtocolConfig {
            name: name.to_string(),
            manifests: vec![name.to_string()],
            include_sub_ecosystems: false,
            forum: forum.map(|url| ForumConfig { url: url.to_string() }),
            governance: None,
            asset: None,
            developer_report: None,
            adapter: None,
        }
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn credentials_are_redacted() {
        let credentials = Credentials {
            github_token: Some("ghp_secret".to_string()),
            ..Credentials::default()
        };
        let text = format!("{credentials:?}");
        assert!(!text.contains("ghp_secret"));
        assert!(text.contains("<set>"));
    }

    #[test]
    fn actors_follow_overrides_and_forums() {
        let settings = Settings {
            endpoints: EndpointOverrides {
                github_rest: Some("http://localhost:1234/".to_string()),
                ..EndpointOverrides::default()
            },
            ..Settings::default()
        };
        let protocols = [protocol("a", Some("https://forum.a.org")), protocol("b", None)];

        let ctx = RunContext::new(
            settings,
            &protocols,
            &Credentials::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(NoProgress),
        )
        .unwrap();

        assert_eq!(ctx.actors.github_rest.base_url(), "http://localhost:1234");
        assert_eq!(ctx.actors.forums["a"].base_url(), "https://forum.a.org");
        assert!(!ctx.actors.forums.contains_key("b"));
        assert_eq!(ctx.actors.github_rest.policy().max_rate_limit_attempts, 10);
    }
}
