use super::IntegrationMetric;

/// Developer-report series for one ecosystem.
#[must_use]
pub fn developer_metrics(ecosystem: &str) -> Vec<IntegrationMetric> {
    let base = format!("ecosystems/{ecosystem}");
    vec![
        IntegrationMetric::rest("developer_counts", format!("{base}/developers/counts")),
        IntegrationMetric::rest("developer_chart", format!("{base}/developers/chart")).param("period", "monthly"),
        IntegrationMetric::rest("commit_chart", format!("{base}/commits/chart")).param("period", "monthly"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::Request;

    #[test]
    fn endpoints_are_scoped_to_the_ecosystem() {
        for metric in developer_metrics("uniswap") {
            let Request::Rest { endpoint, .. } = metric.request else {
                panic!("{} should be a REST metric", metric.name);
            };
            assert!(endpoint.starts_with("ecosystems/uniswap/"), "{endpoint}");
        }
    }
}
