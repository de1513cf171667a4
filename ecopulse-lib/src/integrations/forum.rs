use super::IntegrationMetric;

/// Discourse forum activity.
#[must_use]
pub fn forum_metrics() -> Vec<IntegrationMetric> {
    vec![
        IntegrationMetric::rest("latest_topics", "latest.json")
            .param("order", "created")
            .select("/topic_list/topics"),
        IntegrationMetric::rest("top_users", "directory_items.json")
            .param("period", "monthly")
            .param("order", "post_count")
            .select("/directory_items"),
        IntegrationMetric::rest("categories", "categories.json").select("/category_list/categories"),
        IntegrationMetric::rest("tags", "tags.json").select("/tags"),
        IntegrationMetric::rest("about", "about.json").select("/about/stats"),
    ]
}
