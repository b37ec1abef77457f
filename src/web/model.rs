//! Page model handed to the renderer for the `search` template.

use crate::search_api::{ContentItem, SearchResponse};
use crate::topic_api::Navigation;
use crate::topics::registry::Subtopic;
use crate::web::query::{FILTER_GROUPS, Sort, ValidatedSearch};
use crate::config::ALLOWED_LIMITS;
use serde::Serialize;
use std::sync::Arc;
use url::form_urlencoded;

/// Pages either side of the current one shown in the pager.
const PAGE_WINDOW: u32 = 2;

#[derive(Debug, Serialize)]
pub struct SearchPage {
    pub language: String,
    pub title_localise_key: &'static str,
    pub query: String,
    pub count: u64,
    pub results: Vec<ResultItem>,
    pub pagination: Pagination,
    pub sort: Vec<SelectOption>,
    pub filters: Vec<FilterOption>,
    pub topic_filters: Vec<TopicFilter>,
    pub enable_census_topic_filter: bool,
    pub navigation: Arc<Navigation>,
}

#[derive(Debug, Serialize)]
pub struct ResultItem {
    pub content_type: String,
    pub uri: String,
    pub title: String,
    pub summary: Option<String>,
    pub release_date: Option<String>,
}

impl From<ContentItem> for ResultItem {
    /// Highlighted title/summary win over the plain fields.
    fn from(item: ContentItem) -> Self {
        let highlight = item.highlight.unwrap_or_default();
        Self {
            content_type: item.content_type,
            uri: item.uri,
            title: highlight.title.unwrap_or(item.title),
            summary: highlight.summary.or(item.summary),
            release_date: item.release_date,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub limit: u32,
    pub pages: Vec<PageLink>,
    pub first: Option<PageLink>,
    pub last: Option<PageLink>,
    pub limit_options: Vec<u32>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PageLink {
    pub number: u32,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub localise_key: &'static str,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct FilterOption {
    pub key: &'static str,
    pub localise_key: &'static str,
    pub count: u64,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct TopicFilter {
    pub id: String,
    pub label: String,
    pub count: u64,
    pub selected: bool,
}

pub fn total_pages(count: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    count.div_ceil(u64::from(limit)).min(u64::from(u32::MAX)) as u32
}

/// URL of `page` for the same search.
fn page_url(search: &ValidatedSearch, page: u32) -> String {
    let mut url = form_urlencoded::Serializer::new(String::new());
    if !search.q.is_empty() {
        url.append_pair("q", &search.q);
    }
    for group in &search.filters {
        url.append_pair("filter", group.key);
    }
    if !search.topics.is_empty() {
        url.append_pair("topics", &search.topics.join(","));
    }
    url.append_pair("sort", search.sort.as_str());
    url.append_pair("limit", &search.limit.to_string());
    url.append_pair("page", &page.to_string());
    format!("/search?{}", url.finish())
}

pub fn pagination(search: &ValidatedSearch, count: u64) -> Pagination {
    let total = total_pages(count, search.limit);
    let current = search.page;

    let (pages, first, last) = if total == 0 {
        (Vec::new(), None, None)
    } else {
        let start = current.saturating_sub(PAGE_WINDOW).max(1);
        let end = current.saturating_add(PAGE_WINDOW).min(total);
        let pages = (start..=end)
            .map(|number| PageLink {
                number,
                url: page_url(search, number),
            })
            .collect();
        let first = (start > 1).then(|| PageLink {
            number: 1,
            url: page_url(search, 1),
        });
        let last = (end < total).then(|| PageLink {
            number: total,
            url: page_url(search, total),
        });
        (pages, first, last)
    };

    Pagination {
        current_page: current,
        total_pages: total,
        limit: search.limit,
        pages,
        first,
        last,
        limit_options: ALLOWED_LIMITS.to_vec(),
    }
}

/// Inputs gathered by the search handler.
pub struct PageInputs<'a> {
    pub language: &'a str,
    pub search: &'a ValidatedSearch,
    pub results: SearchResponse,
    /// Unfiltered counts for the content-type filter panel.
    pub counts: &'a SearchResponse,
    /// Topics offered as filters, with their parents.
    pub topics: Vec<Subtopic>,
    pub enable_census_topic_filter: bool,
    pub navigation: Arc<Navigation>,
}

pub fn build_search_page(inputs: PageInputs<'_>) -> SearchPage {
    let PageInputs {
        language,
        search,
        results,
        counts,
        topics,
        enable_census_topic_filter,
        navigation,
    } = inputs;

    let filters = FILTER_GROUPS
        .iter()
        .map(|group| FilterOption {
            key: group.key,
            localise_key: group.localise_key,
            count: group
                .content_types
                .iter()
                .map(|t| counts.content_type_count(t))
                .sum(),
            selected: search.filters.contains(&group),
        })
        .collect();

    let mut topic_filters: Vec<TopicFilter> = topics
        .into_iter()
        .map(|topic| TopicFilter {
            count: counts.topic_count(&topic.id),
            selected: search.topics.contains(&topic.id),
            id: topic.id,
            label: topic.localise_key_name,
        })
        .collect();
    topic_filters.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));

    let sort = Sort::ALL
        .iter()
        .map(|s| SelectOption {
            value: s.as_str(),
            localise_key: s.localise_key(),
            selected: *s == search.sort,
        })
        .collect();

    SearchPage {
        language: language.to_owned(),
        title_localise_key: "SearchResults",
        query: search.q.clone(),
        count: results.count,
        pagination: pagination(search, results.count),
        results: results.items.into_iter().map(ResultItem::from).collect(),
        sort,
        filters,
        topic_filters,
        enable_census_topic_filter,
        navigation,
    }
}
