use super::IntegrationMetric;
use crate::config::GovernanceConfig;
use serde_json::json;

const GOVERNORS_QUERY: &str = r"
query($input: GovernorsInput!) {
  governors(input: $input) {
    nodes {
      ... on Governor {
        id
        name
        chainId
        delegatesCount
        tokenOwnersCount
        proposalStats { total active failed passed }
        token { symbol supply }
      }
    }
  }
}";

const PROPOSALS_QUERY: &str = r"
query($input: ProposalsInput!, $cursor: String) {
  proposals(input: $input, first: 20, after: $cursor) {
    nodes {
      ... on Proposal {
        id
        status
        createdAt
        metadata { title }
        voteStats { type votesCount votersCount percent }
      }
    }
    pageInfo { endCursor hasNextPage }
  }
}";

const DELEGATES_QUERY: &str = r"
query($input: DelegatesInput!) {
  delegates(input: $input) {
    nodes {
      ... on Delegate {
        id
        votesCount
        delegatorsCount
        account { address name }
      }
    }
  }
}";

/// On-chain governance for one organization.
///
/// Proposals are paginated; the other queries return a single page.
#[must_use]
pub fn governance_metrics(config: &GovernanceConfig) -> Vec<IntegrationMetric> {
    let governor_ids: Vec<String> = config
        .governor_ids
        .iter()
        .map(|id| format!("{}:{id}", config.chain_id))
        .collect();

    let mut metrics = vec![
        IntegrationMetric::graph(
            "governors",
            GOVERNORS_QUERY,
            json!({ "input": { "filters": { "organizationSlug": config.organization } } }),
        )
        .select("/governors/nodes"),
        IntegrationMetric::graph(
            "proposals",
            PROPOSALS_QUERY,
            json!({ "input": { "organizationSlug": config.organization, "governorIds": governor_ids } }),
        )
        .connection("/proposals")
        .pages(5),
        IntegrationMetric::graph(
            "delegates",
            DELEGATES_QUERY,
            json!({
                "input": {
                    "filters": { "organizationSlug": config.organization },
                    "sort": { "sortBy": "votes", "isDescending": true },
                    "page": { "limit": 20 }
                }
            }),
        )
        .select("/delegates/nodes"),
    ];

    if !config.safes.is_empty() {
        let safes = config.safes.join(",");
        metrics.push(IntegrationMetric::rest("treasury_safes", "safes").param("addresses", safes));
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::Request;

    fn config(safes: &[&str]) -> GovernanceConfig {
        GovernanceConfig {
            chain_id: "eip155:1".to_string(),
            organization: "uniswap".to_string(),
            governor_ids: vec!["0xabc".to_string()],
            safes: safes.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn governor_ids_carry_the_chain() {
        let metrics = governance_metrics(&config(&[]));
        let Request::Graph { variables, .. } = &metrics[1].request else {
            panic!("proposals should be a GraphQL metric");
        };
        assert_eq!(variables["input"]["governorIds"][0], "eip155:1:0xabc");
    }

    #[test]
    fn treasury_only_with_safes() {
        assert!(governance_metrics(&config(&[])).iter().all(|m| m.name != "treasury_safes"));
        assert!(governance_metrics(&config(&["0x1"])).iter().any(|m| m.name == "treasury_safes"));
    }
}
