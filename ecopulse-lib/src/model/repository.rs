use super::repo_spec::{RepoSpec, repository_key};
use crate::actor::RepositoryDescription;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A tracked repository, as persisted in `{protocol}-projects`.
///
/// Records are written with merge semantics: optional fields that are `None` are not
/// serialized, so whatever an earlier crawl stored for them survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub url: String,
    pub owner: String,
    pub name: String,
    pub valid: bool,
    pub closed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CompactString>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<CompactString>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_kb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fork: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_empty: Option<bool>,
}

impl RepositoryRecord {
    /// Record for a repository that could not be reached or parsed.
    #[must_use]
    pub fn inaccessible(url: &str, owner: &str, name: &str) -> Self {
        Self {
            url: url.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
            valid: false,
            closed: true,
            categories: Vec::new(),
            description: None,
            topics: None,
            stars: None,
            forks: None,
            watchers: None,
            size_kb: None,
            created_at: None,
            updated_at: None,
            pushed_at: None,
            language: None,
            is_fork: None,
            is_archived: None,
            is_empty: None,
        }
    }

    /// Record for a manifest entry that is not a repository URL at all.
    ///
    /// The raw entry stands in for the name, so each such entry keeps its own key.
    #[must_use]
    pub fn unparsable(url: &str) -> Self {
        Self::inaccessible(url, "", url.trim())
    }

    /// Record built from the hosting provider's description of the repository.
    ///
    /// The URL is the canonical manifest URL rather than the provider's `html_url`, so
    /// curated lists written against manifest URLs keep matching.
    #[must_use]
    pub fn from_description(spec: &RepoSpec, description: RepositoryDescription) -> Self {
        let is_empty = description.is_empty();
        Self {
            url: spec.url().to_string(),
            owner: spec.owner().to_string(),
            name: spec.name().to_string(),
            valid: !(is_empty || description.archived || description.fork),
            closed: description.archived,
            categories: Vec::new(),
            description: description.description,
            topics: Some(description.topics),
            stars: Some(description.stargazers_count),
            forks: Some(description.forks_count),
            watchers: Some(description.subscribers_count),
            size_kb: Some(description.size),
            created_at: description.created_at,
            updated_at: description.updated_at,
            pushed_at: description.pushed_at,
            language: description.language,
            is_fork: Some(description.fork),
            is_archived: Some(description.archived),
            is_empty: Some(is_empty),
        }
    }

    /// Store key, `owner#name`.
    #[must_use]
    pub fn key(&self) -> String {
        repository_key(&self.owner, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn description(archived: bool, fork: bool, size: u64) -> RepositoryDescription {
        serde_json::from_value(json!({
            "html_url": "https://github.com/acme/widget",
            "topics": ["defi"],
            "stargazers_count": 10,
            "forks_count": 2,
            "subscribers_count": 1,
            "size": size,
            "created_at": "2022-01-01T00:00:00Z",
            "updated_at": null,
            "pushed_at": null,
            "archived": archived,
            "fork": fork
        }))
        .unwrap()
    }

    #[test]
    fn validity_follows_description_flags() {
        let spec = RepoSpec::parse("https://github.com/acme/widget").unwrap();

        assert!(RepositoryRecord::from_description(&spec, description(false, false, 10)).valid);

        let archived = RepositoryRecord::from_description(&spec, description(true, false, 10));
        assert!(!archived.valid);
        assert!(archived.closed);

        assert!(!RepositoryRecord::from_description(&spec, description(false, true, 10)).valid);

        let empty = RepositoryRecord::from_description(&spec, description(false, false, 0));
        assert!(!empty.valid);
        assert_eq!(empty.is_empty, Some(true));
    }

    #[test]
    fn inaccessible_record_omits_unknown_fields() {
        let record = RepositoryRecord::inaccessible("https://github.com/gone/away", "gone", "away");
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(
            value,
            json!({
                "url": "https://github.com/gone/away",
                "owner": "gone",
                "name": "away",
                "valid": false,
                "closed": true
            })
        );
        assert_eq!(record.key(), "gone#away");
    }

    #[test]
    fn untagged_record_keeps_stored_categories_on_merge() {
        let mut stored = serde_json::to_value(RepositoryRecord {
            categories: vec!["grantee".into()],
            ..RepositoryRecord::inaccessible("https://github.com/acme/widget", "acme", "widget")
        })
        .unwrap();

        let patch = serde_json::to_value(RepositoryRecord::inaccessible("https://github.com/acme/widget", "acme", "widget")).unwrap();
        crate::store::merge_into(&mut stored, &patch);

        let merged: RepositoryRecord = serde_json::from_value(stored).unwrap();
        assert_eq!(merged.categories, vec!["grantee"]);
    }

    #[test]
    fn record_url_is_the_canonical_manifest_url() {
        let spec = RepoSpec::parse("https://github.com/acme/widget/tree/main").unwrap();
        let record = RepositoryRecord::from_description(&spec, description(false, false, 10));
        assert_eq!(record.url, "https://github.com/acme/widget");
    }

    #[test]
    fn unparsable_entries_get_distinct_keys() {
        let a = RepositoryRecord::unparsable("not a url");
        let b = RepositoryRecord::unparsable("gitlab:acme");
        assert!(!a.valid);
        assert_ne!(a.key(), b.key());
    }
}
