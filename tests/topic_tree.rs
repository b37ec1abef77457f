//! Topic tree walks against an in-memory topic API.

mod helpers;

use helpers::{FakeTopicApi, census_api, ids, set_of, topic};
use search_controller::topics::{FetchError, RootSelector, TopicTreeFetcher};
use search_controller::upstream::UpstreamHeaders;
use std::sync::Arc;

fn fetcher(api: Arc<FakeTopicApi>) -> TopicTreeFetcher {
    TopicTreeFetcher::new(api, UpstreamHeaders::default())
}

#[tokio::test]
async fn census_subtree_by_title() {
    let api = Arc::new(census_api());
    let census = fetcher(api.clone())
        .fetch_root_subtree(&RootSelector::Title("Census".into()))
        .await
        .unwrap();

    assert_eq!(census.id, "1234");
    assert_eq!(census.localise_key_name, "Census");
    assert_eq!(
        ids(census.subtopics.ids()),
        set_of(&["1234", "5678", "1235", "8901"])
    );
    assert_eq!(
        ids(census.query.split(',').map(String::from)),
        set_of(&["1234", "5678", "1235", "8901"])
    );
    assert_eq!(census.subtopics.get("1234").unwrap().parent_id, "");
    assert_eq!(census.subtopics.get("5678").unwrap().parent_id, "1234");
    assert_eq!(census.subtopics.get("1235").unwrap().parent_id, "1234");
    assert_eq!(census.subtopics.get("8901").unwrap().parent_id, "5678");
    assert!(!census.subtopics.check_id_exists("1458"));
}

#[tokio::test]
async fn census_subtree_by_id_matches_by_title() {
    let by_id = fetcher(Arc::new(census_api()))
        .fetch_root_subtree(&RootSelector::Id("1234".into()))
        .await
        .unwrap();
    let by_title = fetcher(Arc::new(census_api()))
        .fetch_root_subtree(&RootSelector::Title("Census".into()))
        .await
        .unwrap();
    assert_eq!(ids(by_id.subtopics.ids()), ids(by_title.subtopics.ids()));
}

#[tokio::test]
async fn cycles_terminate() {
    let api = FakeTopicApi::with_roots(vec![topic("A", "Alpha", &["B"])])
        .child("A", topic("B", "Beta", &["A"]))
        .child("B", topic("A", "Alpha", &["B"]));
    let api = Arc::new(api);

    let tree = fetcher(api.clone())
        .fetch_root_subtree(&RootSelector::Id("A".into()))
        .await
        .unwrap();
    assert_eq!(ids(tree.subtopics.ids()), set_of(&["A", "B"]));

    let merged = fetcher(api.clone()).fetch_data_topics().await.unwrap();
    assert_eq!(ids(merged.subtopics.ids()), set_of(&["A", "B"]));

    // Each node's children are requested at most once per walk.
    let requests = api.subtopic_requests();
    assert_eq!(requests.iter().filter(|id| *id == "A").count(), 2);
    assert_eq!(requests.iter().filter(|id| *id == "B").count(), 2);
}

#[tokio::test]
async fn shared_subtopic_recorded_once_under_first_parent() {
    let api = FakeTopicApi::with_roots(vec![
        topic("X", "Xray", &["Y"]),
        topic("Z", "Zulu", &["Y"]),
    ])
    .child("X", topic("Y", "Yankee", &[]))
    .child("Z", topic("Y", "Yankee", &[]));

    let merged = fetcher(Arc::new(api)).fetch_data_topics().await.unwrap();
    assert_eq!(ids(merged.subtopics.ids()), set_of(&["X", "Y", "Z"]));
    assert_eq!(merged.subtopics.get("Y").unwrap().parent_id, "X");

    let parts: Vec<&str> = merged.query.split(',').collect();
    assert_eq!(parts.len(), 3, "no duplicate IDs in {}", merged.query);
}

#[tokio::test]
async fn duplicate_roots_merged_once() {
    let api = FakeTopicApi::with_roots(vec![
        topic("X", "Xray", &["Y"]),
        topic("X", "Xray", &["Y"]),
    ])
    .child("X", topic("Y", "Yankee", &[]));
    let api = Arc::new(api);

    let list = fetcher(api.clone()).fetch_data_topic_list().await.unwrap();
    let listed: Vec<&str> = list.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(listed.len(), 2);
    assert_eq!(ids(listed.iter().map(|s| s.to_string())), set_of(&["X", "Y"]));
    assert_eq!(api.subtopic_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn data_topic_list_entries_query_themselves() {
    let list = fetcher(Arc::new(census_api()))
        .fetch_data_topic_list()
        .await
        .unwrap();
    assert_eq!(list.len(), 5);
    for entry in &list {
        assert_eq!(entry.query, entry.id);
    }
    let ethnicity = list.iter().find(|t| t.id == "8901").unwrap();
    assert_eq!(ethnicity.parent_id, "5678");
}

#[tokio::test]
async fn unavailable_api_fails_the_walk() {
    let api = Arc::new(census_api());
    api.set_unavailable(true);

    let err = fetcher(api)
        .fetch_root_subtree(&RootSelector::Title("Census".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::RootTopics(_)));
}

#[tokio::test]
async fn unknown_root_is_reported() {
    let err = fetcher(Arc::new(census_api()))
        .fetch_root_subtree(&RootSelector::Title("Agriculture".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::RootNotFound(_)));
}
