use super::IntegrationMetric;

/// Asset-data profile, market metrics and a daily price series.
#[must_use]
pub fn asset_metrics(key: &str) -> Vec<IntegrationMetric> {
    vec![
        IntegrationMetric::rest("profile", format!("api/v2/assets/{key}/profile")).select("/data"),
        IntegrationMetric::rest("metrics", format!("api/v1/assets/{key}/metrics")).select("/data"),
        IntegrationMetric::rest("price_time_series", format!("api/v1/assets/{key}/metrics/price/time-series"))
            .param("interval", "1d")
            .select("/data/values"),
    ]
}
