//! `GET /search`: the rendered search results page.

use crate::cache::{
    CENSUS_TOPIC_KEY, CacheList, DATA_TOPIC_LIST_KEY, DATA_TOPIC_ROOT_KEY, navigation_or_empty,
    topic_or_empty,
};
use crate::state::AppState;
use crate::topics::model::Topic;
use crate::topics::registry::Subtopic;
use crate::upstream::UpstreamHeaders;
use crate::utils::log_if_slow;
use crate::web::error::{ApiError, ApiErrorCode, upstream_error};
use crate::web::model::{PageInputs, build_search_page};
use crate::web::query::{SearchParams, validate};
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::Query;
use cookie::Cookie;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_LANGUAGE: &str = "en";
const LANGUAGE_COOKIE: &str = "lang";
const USER_TOKEN_HEADER: &str = "x-florence-token";
const SEARCH_TEMPLATE: &str = "search";
const SLOW_SEARCH_THRESHOLD: Duration = Duration::from_millis(750);

/// Language from the `lang` cookie, if it names a supported language.
pub fn language(headers: &HeaderMap, supported: &[String]) -> String {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == LANGUAGE_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|lang| supported.iter().any(|s| s == lang))
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_owned())
}

fn user_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

enum DataTopics {
    /// Publishing: every data topic merged under one synthetic root.
    Tree(Arc<Topic>),
    /// Public: one flat entry per data topic.
    List(Arc<Vec<Topic>>),
}

/// Snapshot of the topic caches a single request validates against.
pub struct TopicScope {
    census: Option<Arc<Topic>>,
    data: DataTopics,
}

impl TopicScope {
    pub fn from_caches(caches: &CacheList, census_enabled: bool, publishing: bool) -> Self {
        let census = census_enabled.then(|| topic_or_empty(&caches.topic, CENSUS_TOPIC_KEY));
        let data = if publishing {
            DataTopics::Tree(topic_or_empty(&caches.topic, DATA_TOPIC_ROOT_KEY))
        } else {
            DataTopics::List(caches.topic_list.get(DATA_TOPIC_LIST_KEY).unwrap_or_default())
        };
        Self { census, data }
    }

    /// With the census filter enabled only census topics may be selected.
    pub fn exists(&self, id: &str) -> bool {
        if let Some(census) = &self.census {
            return census.subtopics.check_id_exists(id);
        }
        match &self.data {
            DataTopics::Tree(root) => root.subtopics.check_id_exists(id),
            DataTopics::List(list) => list.iter().any(|t| t.id == id),
        }
    }

    /// Selecting the census root searches across its whole subtree.
    pub fn expand(&self, id: &str) -> String {
        match &self.census {
            Some(census) if census.id == id && !census.query.is_empty() => census.query.clone(),
            _ => id.to_owned(),
        }
    }

    /// Topics offered in the filter panel: the census root's direct children,
    /// otherwise the top-level data topics.
    pub fn filter_topics(&self) -> Vec<Subtopic> {
        if let Some(census) = &self.census {
            return census
                .subtopics
                .subtopics()
                .into_iter()
                .filter(|s| s.parent_id == census.id)
                .collect();
        }
        match &self.data {
            DataTopics::Tree(root) => root
                .subtopics
                .subtopics()
                .into_iter()
                .filter(|s| s.parent_id.is_empty())
                .collect(),
            DataTopics::List(list) => list
                .iter()
                .filter(|t| t.parent_id.is_empty())
                .map(Topic::as_subtopic)
                .collect(),
        }
    }
}

pub(super) async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    let config = &state.config;

    let language = language(&headers, &config.supported_languages);
    let scope = TopicScope::from_caches(
        &state.caches,
        config.enable_census_topic_filter_option,
        config.is_publishing,
    );

    let search = validate(params, config.default_limit, &config.default_sort, |id| {
        scope.exists(id)
    })?;
    let query = search.to_search_query(|id| scope.expand(id));
    let counts_query = query.counts_only();

    let upstream = UpstreamHeaders::service(config.service_auth_token.clone()).with_user_token(
        config
            .is_publishing
            .then(|| user_token(&headers))
            .flatten(),
    );

    let (results, counts) = tokio::try_join!(
        state.search_api.search(&upstream, &query),
        state.search_api.search(&upstream, &counts_query),
    )
    .map_err(|e| upstream_error(ApiErrorCode::SearchUnavailable, "Search", e))?;

    debug!(
        q = %search.q,
        page = search.page,
        count = results.count,
        took = results.took,
        "search completed"
    );

    let navigation = state
        .caches
        .navigation
        .as_ref()
        .map(|cache| navigation_or_empty(cache, &language))
        .unwrap_or_default();

    let page = build_search_page(PageInputs {
        language: &language,
        search: &search,
        results,
        counts: &counts,
        topics: scope.filter_topics(),
        enable_census_topic_filter: config.enable_census_topic_filter_option,
        navigation,
    });

    let model = serde_json::to_value(&page)
        .map_err(|e| upstream_error(ApiErrorCode::RenderFailed, "Page model serialization", e))?;
    let html = state
        .renderer
        .render(SEARCH_TEMPLATE, &model)
        .await
        .map_err(|e| upstream_error(ApiErrorCode::RenderFailed, "Render", e))?;

    log_if_slow(start, SLOW_SEARCH_THRESHOLD, "search page");
    Ok(Html(html).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::registry::SubtopicRegistry;
    use axum::http::HeaderValue;

    fn subtopic(id: &str, parent: &str) -> Subtopic {
        Subtopic {
            id: id.into(),
            localise_key_name: format!("Topic {id}"),
            parent_id: parent.into(),
            ..Default::default()
        }
    }

    fn census_topic() -> Arc<Topic> {
        let registry = SubtopicRegistry::new();
        for (id, parent) in [("4445", ""), ("5678", "4445"), ("1235", "5678")] {
            registry.append_subtopic_id(id, subtopic(id, parent));
        }
        let mut topic = Topic {
            id: "4445".into(),
            subtopics: registry,
            ..Default::default()
        };
        topic.refresh_query();
        Arc::new(topic)
    }

    #[test]
    fn language_from_cookie() {
        let supported = vec!["en".to_owned(), "cy".to_owned()];
        let mut headers = HeaderMap::new();
        assert_eq!(language(&headers, &supported), "en");

        headers.insert(header::COOKIE, HeaderValue::from_static("session=abc; lang=cy"));
        assert_eq!(language(&headers, &supported), "cy");

        headers.insert(header::COOKIE, HeaderValue::from_static("lang=fr"));
        assert_eq!(language(&headers, &supported), "en");
    }

    #[test]
    fn census_scope_limits_and_expands() {
        let scope = TopicScope {
            census: Some(census_topic()),
            data: DataTopics::List(Arc::default()),
        };
        assert!(scope.exists("1235"));
        assert!(!scope.exists("9999"));
        assert_eq!(scope.expand("5678"), "5678");

        let mut expanded: Vec<&str> = Vec::new();
        let query = scope.expand("4445");
        expanded.extend(query.split(','));
        expanded.sort();
        assert_eq!(expanded, vec!["1235", "4445", "5678"]);

        let offered: Vec<String> = scope.filter_topics().into_iter().map(|s| s.id).collect();
        assert_eq!(offered, vec!["5678"]);
    }

    #[test]
    fn data_list_scope_offers_top_level() {
        let list = vec![
            Topic {
                id: "1".into(),
                ..Default::default()
            },
            Topic {
                id: "2".into(),
                parent_id: "1".into(),
                ..Default::default()
            },
        ];
        let scope = TopicScope {
            census: None,
            data: DataTopics::List(Arc::new(list)),
        };
        assert!(scope.exists("2"));
        assert_eq!(scope.expand("1"), "1");
        let offered: Vec<String> = scope.filter_topics().into_iter().map(|s| s.id).collect();
        assert_eq!(offered, vec!["1"]);
    }

    #[test]
    fn sentinel_census_rejects_everything() {
        let scope = TopicScope {
            census: Some(Arc::default()),
            data: DataTopics::Tree(Arc::default()),
        };
        assert!(!scope.exists("4445"));
        assert!(scope.filter_topics().is_empty());
    }
}
