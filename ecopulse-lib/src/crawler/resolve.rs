use super::manifest::{Manifest, ManifestSource, manifest_path, normalize_manifest_name};
use futures_util::future::{BoxFuture, join_all};
use std::collections::BTreeSet;

const LOG_TARGET: &str = "   crawler";

/// Deepest sub-ecosystem nesting followed.
pub const MAX_MANIFEST_DEPTH: usize = 16;

/// Resolve the repository URLs listed by an ecosystem manifest.
///
/// With `include_sub_ecosystems`, every named sub-ecosystem is resolved the same way and
/// the branches' sets are unioned here. Each branch only sees its own chain of
/// ancestors, which stops cycles without sharing any state between branches.
pub fn resolve_manifest<'a>(
    source: &'a dyn ManifestSource,
    name: String,
    include_sub_ecosystems: bool,
    ancestors: Vec<String>,
) -> BoxFuture<'a, BTreeSet<String>> {
    Box::pin(async move {
        let normalized = normalize_manifest_name(&name);

        if ancestors.contains(&normalized) {
            log::debug!(target: LOG_TARGET, "Skipping '{normalized}', it is its own ancestor");
            return BTreeSet::new();
        }

        if ancestors.len() >= MAX_MANIFEST_DEPTH {
            log::warn!(target: LOG_TARGET, "Not descending into '{normalized}', nesting exceeds {MAX_MANIFEST_DEPTH} levels");
            return BTreeSet::new();
        }

        let Some(path) = manifest_path(&normalized) else {
            log::warn!(target: LOG_TARGET, "Ecosystem name '{name}' does not map to a manifest");
            return BTreeSet::new();
        };

        let Some(text) = source.fetch(&path).await else {
            return BTreeSet::new();
        };

        let manifest = match Manifest::parse(&text) {
            Ok(manifest) => manifest,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not parse manifest '{path}': {e:#}");
                return BTreeSet::new();
            }
        };

        let mut urls: BTreeSet<String> = manifest.repo.into_iter().map(|repo| repo.url.trim().to_string()).collect();
        log::debug!(target: LOG_TARGET, "Manifest '{path}' lists {} repositories", urls.len());

        if include_sub_ecosystems && !manifest.sub_ecosystems.is_empty() {
            let mut chain = ancestors;
            chain.push(normalized);

            let branches = manifest
                .sub_ecosystems
                .iter()
                .map(|sub| resolve_manifest(source, sub.clone(), true, chain.clone()));

            for branch in join_all(branches).await {
                urls.extend(branch);
            }
        }

        urls
    })
}

/// Resolve and union several top-level manifests.
pub async fn resolve_all(source: &dyn ManifestSource, names: &[String], include_sub_ecosystems: bool) -> BTreeSet<String> {
    let resolved = join_all(
        names
            .iter()
            .map(|name| resolve_manifest(source, name.clone(), include_sub_ecosystems, Vec::new())),
    )
    .await;

    resolved.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn source(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(path, text)| ((*path).to_string(), (*text).to_string()))
            .collect()
    }

    #[tokio::test]
    async fn shared_url_across_sub_ecosystems_appears_once() {
        let manifests = source(&[
            (
                "r/root.toml",
                r#"
                sub_ecosystems = ["Left", "Right"]
                [[repo]]
                url = "https://github.com/root/core"
                "#,
            ),
            (
                "l/left.toml",
                r#"
                [[repo]]
                url = "https://github.com/shared/lib"
                [[repo]]
                url = "https://github.com/left/app"
                "#,
            ),
            (
                "r/right.toml",
                r#"
                [[repo]]
                url = "https://github.com/shared/lib"
                "#,
            ),
        ]);

        let urls = resolve_manifest(&manifests, "Root".to_string(), true, Vec::new()).await;
        assert_eq!(
            urls.into_iter().collect::<Vec<_>>(),
            vec![
                "https://github.com/left/app",
                "https://github.com/root/core",
                "https://github.com/shared/lib"
            ]
        );
    }

    #[tokio::test]
    async fn sub_ecosystems_are_ignored_unless_requested() {
        let manifests = source(&[
            ("r/root.toml", "sub_ecosystems = [\"Child\"]\n[[repo]]\nurl = \"https://github.com/root/core\"\n"),
            ("c/child.toml", "[[repo]]\nurl = \"https://github.com/child/app\"\n"),
        ]);

        let urls = resolve_manifest(&manifests, "root".to_string(), false, Vec::new()).await;
        assert_eq!(urls.len(), 1);
    }

    #[tokio::test]
    async fn cycles_terminate() {
        let manifests = source(&[
            ("a/a.toml", "sub_ecosystems = [\"B\"]\n[[repo]]\nurl = \"https://github.com/a/a\"\n"),
            ("b/b.toml", "sub_ecosystems = [\"A\"]\n[[repo]]\nurl = \"https://github.com/b/b\"\n"),
        ]);

        let urls = resolve_manifest(&manifests, "A".to_string(), true, Vec::new()).await;
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn missing_or_broken_manifests_contribute_nothing() {
        let manifests = source(&[
            ("r/root.toml", "sub_ecosystems = [\"Gone\", \"Broken\"]\n[[repo]]\nurl = \"https://github.com/root/core\"\n"),
            ("b/broken.toml", "this is not toml ["),
        ]);

        let urls = resolve_manifest(&manifests, "root".to_string(), true, Vec::new()).await;
        assert_eq!(urls.len(), 1);
    }

    #[tokio::test]
    async fn resolve_all_unions_top_level_manifests() {
        let manifests = source(&[
            ("a/a.toml", "[[repo]]\nurl = \"https://github.com/x/one\"\n"),
            ("b/b.toml", "[[repo]]\nurl = \"https://github.com/x/one\"\n[[repo]]\nurl = \"https://github.com/x/two\"\n"),
        ]);

        let urls = resolve_all(&manifests, &["a".to_string(), "b".to_string()], false).await;
        assert_eq!(urls.len(), 2);
    }
}
