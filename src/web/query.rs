//! Validation of search page query parameters.

use crate::config::ALLOWED_LIMITS;
use crate::search_api::SearchQuery;
use crate::web::error::{ApiError, ApiErrorCode};
use serde::Deserialize;

pub const MAX_QUERY_LEN: usize = 500;

/// Raw query string of `GET /search`. `filter` may repeat.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub filter: Vec<String>,
    #[serde(default)]
    pub topics: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Relevance,
    ReleaseDate,
    Title,
}

impl Sort {
    pub const ALL: [Sort; 3] = [Sort::Relevance, Sort::ReleaseDate, Sort::Title];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "relevance" => Some(Sort::Relevance),
            "release_date" => Some(Sort::ReleaseDate),
            "title" => Some(Sort::Title),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sort::Relevance => "relevance",
            Sort::ReleaseDate => "release_date",
            Sort::Title => "title",
        }
    }

    pub fn localise_key(self) -> &'static str {
        match self {
            Sort::Relevance => "Relevance",
            Sort::ReleaseDate => "ReleaseDate",
            Sort::Title => "Title",
        }
    }
}

/// A user-facing content-type filter and the search API types it covers.
#[derive(Debug, PartialEq, Eq)]
pub struct FilterGroup {
    pub key: &'static str,
    pub localise_key: &'static str,
    pub content_types: &'static [&'static str],
}

pub static FILTER_GROUPS: &[FilterGroup] = &[
    FilterGroup {
        key: "bulletin",
        localise_key: "StatisticalBulletin",
        content_types: &["bulletin"],
    },
    FilterGroup {
        key: "article",
        localise_key: "Article",
        content_types: &["article", "article_download"],
    },
    FilterGroup {
        key: "compendia",
        localise_key: "Compendium",
        content_types: &["compendium_landing_page"],
    },
    FilterGroup {
        key: "time_series",
        localise_key: "TimeSeries",
        content_types: &["timeseries"],
    },
    FilterGroup {
        key: "datasets",
        localise_key: "Datasets",
        content_types: &["dataset_landing_page", "timeseries_dataset"],
    },
    FilterGroup {
        key: "user_requested_data",
        localise_key: "UserRequestedData",
        content_types: &["static_adhoc"],
    },
    FilterGroup {
        key: "methodology",
        localise_key: "Methodology",
        content_types: &["methodology", "static_methodology", "static_qmi"],
    },
    FilterGroup {
        key: "corporate_information",
        localise_key: "CorporateInformation",
        content_types: &["static_foi", "static_page", "static_landing_page", "static_article"],
    },
];

pub fn filter_group(key: &str) -> Option<&'static FilterGroup> {
    FILTER_GROUPS.iter().find(|g| g.key == key)
}

/// Search parameters after validation and defaulting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSearch {
    pub q: String,
    pub page: u32,
    pub limit: u32,
    pub sort: Sort,
    pub filters: Vec<&'static FilterGroup>,
    pub topics: Vec<String>,
}

impl ValidatedSearch {
    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn content_types(&self) -> Vec<String> {
        self.filters
            .iter()
            .flat_map(|g| g.content_types.iter().map(|t| t.to_string()))
            .collect()
    }

    /// Build the search API query. `expand` maps each selected topic ID to the
    /// comma-joined IDs it stands for (a topic may stand for its whole subtree).
    pub fn to_search_query(&self, expand: impl Fn(&str) -> String) -> SearchQuery {
        let topics = (!self.topics.is_empty()).then(|| {
            self.topics
                .iter()
                .map(|id| expand(id))
                .filter(|ids| !ids.is_empty())
                .collect::<Vec<_>>()
                .join(",")
        });
        SearchQuery {
            q: self.q.clone(),
            limit: self.limit,
            offset: self.offset(),
            sort: self.sort.as_str().to_owned(),
            content_types: self.content_types(),
            topics,
        }
    }
}

fn parse_positive(value: &str, code: ApiErrorCode, name: &str) -> Result<u32, ApiError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ApiError::new(
            code,
            format!("{name} must be a positive integer, got '{value}'"),
        )),
    }
}

/// Validate raw parameters. `topic_exists` decides which topic IDs may be filtered on.
pub fn validate(
    params: SearchParams,
    default_limit: u32,
    default_sort: &str,
    topic_exists: impl Fn(&str) -> bool,
) -> Result<ValidatedSearch, ApiError> {
    let q = params.q.unwrap_or_default().trim().to_owned();
    if q.chars().count() > MAX_QUERY_LEN {
        return Err(ApiError::new(
            ApiErrorCode::InvalidQuery,
            format!("query must be at most {MAX_QUERY_LEN} characters"),
        ));
    }

    let page = match params.page.as_deref().filter(|p| !p.is_empty()) {
        Some(p) => parse_positive(p, ApiErrorCode::InvalidPage, "page")?,
        None => 1,
    };

    let limit = match params.limit.as_deref().filter(|l| !l.is_empty()) {
        Some(l) => {
            let limit = parse_positive(l, ApiErrorCode::InvalidLimit, "limit")?;
            if !ALLOWED_LIMITS.contains(&limit) {
                return Err(ApiError::new(
                    ApiErrorCode::InvalidLimit,
                    format!("limit must be one of {ALLOWED_LIMITS:?}"),
                ));
            }
            limit
        }
        None => default_limit,
    };

    let sort = match params.sort.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Sort::parse(s)
            .ok_or_else(|| ApiError::new(ApiErrorCode::InvalidSort, format!("unknown sort '{s}'")))?,
        None => Sort::parse(default_sort).unwrap_or(Sort::Relevance),
    };

    let mut filters: Vec<&'static FilterGroup> = Vec::new();
    for key in params.filter.iter().map(|f| f.trim()).filter(|f| !f.is_empty()) {
        let group = filter_group(key).ok_or_else(|| {
            ApiError::new(ApiErrorCode::InvalidFilter, format!("unknown filter '{key}'"))
        })?;
        if !filters.contains(&group) {
            filters.push(group);
        }
    }

    let mut topics: Vec<String> = Vec::new();
    for id in params
        .topics
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        if !topic_exists(id) {
            return Err(ApiError::new(
                ApiErrorCode::InvalidTopic,
                format!("unknown topic '{id}'"),
            ));
        }
        if !topics.iter().any(|t| t == id) {
            topics.push(id.to_owned());
        }
    }

    Ok(ValidatedSearch {
        q,
        page,
        limit,
        sort,
        filters,
        topics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_topic(_: &str) -> bool {
        true
    }

    fn run(params: SearchParams) -> Result<ValidatedSearch, ApiError> {
        validate(params, 10, "relevance", any_topic)
    }

    #[test]
    fn defaults_applied() {
        let v = run(SearchParams::default()).unwrap();
        assert_eq!(v.q, "");
        assert_eq!(v.page, 1);
        assert_eq!(v.limit, 10);
        assert_eq!(v.sort, Sort::Relevance);
        assert_eq!(v.offset(), 0);
    }

    #[test]
    fn query_trimmed_and_bounded() {
        let v = run(SearchParams {
            q: Some("  gdp  ".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(v.q, "gdp");

        let err = run(SearchParams {
            q: Some("x".repeat(MAX_QUERY_LEN + 1)),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::InvalidQuery);
    }

    #[test]
    fn page_and_offset() {
        let v = run(SearchParams {
            page: Some("3".into()),
            limit: Some("25".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(v.offset(), 50);
    }

    #[test]
    fn rejects_bad_page_limit_sort() {
        for (params, code) in [
            (
                SearchParams {
                    page: Some("0".into()),
                    ..Default::default()
                },
                ApiErrorCode::InvalidPage,
            ),
            (
                SearchParams {
                    page: Some("two".into()),
                    ..Default::default()
                },
                ApiErrorCode::InvalidPage,
            ),
            (
                SearchParams {
                    limit: Some("11".into()),
                    ..Default::default()
                },
                ApiErrorCode::InvalidLimit,
            ),
            (
                SearchParams {
                    sort: Some("popularity".into()),
                    ..Default::default()
                },
                ApiErrorCode::InvalidSort,
            ),
        ] {
            assert_eq!(run(params).unwrap_err().code, code);
        }
    }

    #[test]
    fn filters_expand_and_dedupe() {
        let v = run(SearchParams {
            filter: vec!["article".into(), "bulletin".into(), "article".into()],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(v.filters.len(), 2);
        assert_eq!(
            v.content_types(),
            vec!["article", "article_download", "bulletin"]
        );
    }

    #[test]
    fn unknown_filter_rejected() {
        let err = run(SearchParams {
            filter: vec!["podcast".into()],
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::InvalidFilter);
    }

    #[test]
    fn topics_checked_against_known_ids() {
        let known = |id: &str| id == "5678" || id == "1235";
        let v = validate(
            SearchParams {
                topics: Some("5678, 1235,5678".into()),
                ..Default::default()
            },
            10,
            "relevance",
            known,
        )
        .unwrap();
        assert_eq!(v.topics, vec!["5678", "1235"]);

        let err = validate(
            SearchParams {
                topics: Some("9999".into()),
                ..Default::default()
            },
            10,
            "relevance",
            known,
        )
        .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::InvalidTopic);
    }

    #[test]
    fn search_query_expands_selected_topics() {
        let v = run(SearchParams::default()).unwrap();
        assert_eq!(v.to_search_query(|id| id.to_owned()).topics, None);

        let v = run(SearchParams {
            topics: Some("4445,7".into()),
            ..Default::default()
        })
        .unwrap();
        let query = v.to_search_query(|id| {
            if id == "4445" { "4445,1,2".to_owned() } else { id.to_owned() }
        });
        assert_eq!(query.topics.as_deref(), Some("4445,1,2,7"));
    }
}
