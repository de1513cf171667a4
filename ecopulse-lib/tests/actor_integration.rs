//! Integration tests for the resilient API client against wiremock

use core::time::Duration;
use ecopulse_lib::actor::{Actor, ApiResult, Fetched, ProviderKind, ProviderProfile, RetryPolicy};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn actor(kind: ProviderKind, base_url: &str) -> Actor {
    Actor::new(&ProviderProfile::for_kind(kind), Some("test-token"), Some(base_url))
        .expect("actor should build")
        .with_policy(RetryPolicy::fast().with_delays(Duration::from_millis(1)))
}

#[tokio::test]
async fn not_ready_statistics_are_retried_until_ready() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/core/stats/commit_activity"))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/core/stats/commit_activity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"days": [0, 1, 0, 0, 0, 0, 0], "total": 1, "week": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let result = actor(ProviderKind::GithubRest, &server.uri())
        .fetch_all("repos/acme/core/stats/commit_activity", &[], 1)
        .await;

    match result {
        ApiResult::Found(Fetched::Single(body)) => assert_eq!(body[0]["total"], 1),
        other => panic!("expected the statistics, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_resource_is_absent_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = actor(ProviderKind::GithubRest, &server.uri()).fetch_page("repos/acme/gone", &[]).await;
    assert!(matches!(result, ApiResult::Absent(_)), "got {result:?}");
}

#[tokio::test]
async fn server_errors_are_retried_a_bounded_number_of_times() {
    let server = MockServer::start().await;

    // one attempt plus three retries
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let result = actor(ProviderKind::GithubRest, &server.uri()).fetch_page("flaky", &[]).await;
    assert!(matches!(result, ApiResult::Error(_)), "got {result:?}");
}

#[tokio::test]
async fn rate_limited_request_succeeds_after_waiting() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let result = actor(ProviderKind::AssetData, &server.uri()).fetch_page("busy", &[]).await;
    assert!(result.is_found(), "got {result:?}");
}

#[tokio::test]
async fn no_content_is_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = actor(ProviderKind::Forum, &server.uri()).fetch_page("empty", &[]).await;
    assert!(matches!(result, ApiResult::Absent(_)), "got {result:?}");
}

#[tokio::test]
async fn follows_link_headers_up_to_the_page_limit() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([5])))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([3, 4]))
                .insert_header("link", format!("<{uri}/items?page=3>; rel=\"next\"").as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([1, 2]))
                .insert_header("link", format!("<{uri}/items?page=2>; rel=\"next\", <{uri}/items?page=3>; rel=\"last\"").as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = actor(ProviderKind::GithubRest, &uri).fetch_all("items", &[], 2).await;

    match result {
        ApiResult::Found(Fetched::Many(items)) => assert_eq!(items, vec![json!(1), json!(2), json!(3), json!(4)]),
        other => panic!("expected two pages of items, got {other:?}"),
    }
}

#[tokio::test]
async fn graphql_connections_are_paged_by_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({"variables": {"cursor": "c1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"org": {"items": {
                "nodes": [{"id": 2}],
                "pageInfo": {"endCursor": "c2", "hasNextPage": false}
            }}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"org": {"items": {
                "nodes": [{"id": 1}],
                "pageInfo": {"endCursor": "c1", "hasNextPage": true}
            }}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let graphql = actor(ProviderKind::Governance, &format!("{}/graphql", server.uri()));
    let result = graphql
        .query_all("query($cursor: String) { org { items(after: $cursor) { nodes { id } } } }", &json!({}), "/org/items", 5)
        .await;

    match result {
        ApiResult::Found(nodes) => assert_eq!(nodes, vec![json!({"id": 1}), json!({"id": 2})]),
        other => panic!("expected both pages, got {other:?}"),
    }
}

#[tokio::test]
async fn graphql_without_data_is_absent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"type": "NOT_FOUND", "message": "Could not resolve to a Repository"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = actor(ProviderKind::GithubGraphql, &server.uri()).query("query { viewer { login } }", &json!({})).await;
    assert!(matches!(result, ApiResult::Absent(reason) if reason.contains("Could not resolve")));
}

#[tokio::test]
async fn validity_check_gives_up_on_a_failing_repository_after_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let description = actor(ProviderKind::GithubRest, &server.uri()).check_repository_validity("acme", "broken").await;
    assert!(description.is_none());
}

#[tokio::test]
async fn validity_check_waits_out_transient_responses() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/core"))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/core"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/core"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "html_url": "https://github.com/acme/core",
            "stargazers_count": 3,
            "size": 10
        })))
        .expect(1)
        .mount(&server)
        .await;

    let description = actor(ProviderKind::GithubRest, &server.uri()).check_repository_validity("acme", "core").await.unwrap();
    assert_eq!(description.stargazers_count, 3);
}

#[tokio::test]
async fn validity_check_is_bounded_while_statistics_stay_pending() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/slow"))
        .respond_with(ResponseTemplate::new(202))
        .expect(5)
        .mount(&server)
        .await;

    let hosting = actor(ProviderKind::GithubRest, &server.uri());
    assert!(!hosting.is_repository_accessible("acme", "slow").await);
}

#[tokio::test]
async fn every_provider_sends_its_credential() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(7)
        .mount(&server)
        .await;

    for kind in [
        ProviderKind::GithubRest,
        ProviderKind::GithubGraphql,
        ProviderKind::Forum,
        ProviderKind::Governance,
        ProviderKind::AssetData,
        ProviderKind::DeveloperReport,
        ProviderKind::Manifest,
    ] {
        let result = actor(kind, &server.uri()).fetch_page("ping", &[]).await;
        assert!(result.is_found(), "{kind}: {result:?}");
    }

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.iter().any(|r| r.headers.get("api-key").is_some_and(|v| v == "test-token")));
}
