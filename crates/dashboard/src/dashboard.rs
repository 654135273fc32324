//! Dashboard listing: filtering, sorting and pagination over a reconciled
//! repository list. Everything here is request-scoped and pure.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::MAX_PROGRESS;
use crate::reconcile::{EmptyState, ReconciledRepository, Reconciliation};
use crate::roast::{activity_status, card_roast, ActivityStatus};

pub const ITEMS_PER_PAGE: usize = 9;
const ALL_LANGUAGES: &str = "all";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    Name,
    Stars,
    Forks,
    Updated,
    Progress,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardQuery {
    pub search: Option<String>,
    pub language: Option<String>,
    pub sort: Option<SortOption>,
    pub exclude_forks_and_completed: Option<bool>,
    pub page: Option<usize>,
}

impl DashboardQuery {
    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }

    fn language_filter(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|language| !language.is_empty() && *language != ALL_LANGUAGES)
    }

    fn excludes_forks_and_completed(&self) -> bool {
        self.exclude_forks_and_completed.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryCard {
    #[serde(flatten)]
    pub repository: ReconciledRepository,
    pub last_activity_days: i64,
    pub status: ActivityStatus,
    pub roast: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardPage {
    pub total_count: u64,
    pub matching_count: usize,
    pub page: usize,
    pub total_pages: usize,
    pub per_page: usize,
    pub sort: SortOption,
    pub languages: Vec<String>,
    pub items: Vec<RepositoryCard>,
    pub empty_state: Option<EmptyState>,
}

#[must_use]
pub fn days_since(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(updated_at).num_days().max(0)
}

fn compare_names(left: &ReconciledRepository, right: &ReconciledRepository) -> Ordering {
    left.name
        .to_lowercase()
        .cmp(&right.name.to_lowercase())
        .then_with(|| left.name.cmp(&right.name))
}

fn compare(sort: SortOption, left: &ReconciledRepository, right: &ReconciledRepository) -> Ordering {
    let primary = match sort {
        SortOption::Name => Ordering::Equal,
        SortOption::Stars => right.star_count.cmp(&left.star_count),
        SortOption::Forks => right.fork_count.cmp(&left.fork_count),
        SortOption::Updated => right.updated_at.cmp(&left.updated_at),
        SortOption::Progress => right.progress.cmp(&left.progress),
    };

    primary.then_with(|| compare_names(left, right))
}

fn matches(query: &DashboardQuery, search: Option<&str>, repository: &ReconciledRepository) -> bool {
    if let Some(term) = search {
        if !repository.name.to_lowercase().contains(term) {
            return false;
        }
    }

    if let Some(language) = query.language_filter() {
        if repository.language.as_deref() != Some(language) {
            return false;
        }
    }

    if query.excludes_forks_and_completed()
        && (repository.is_fork || repository.progress >= MAX_PROGRESS)
    {
        return false;
    }

    true
}

#[must_use]
pub fn build_page(
    reconciliation: &Reconciliation,
    query: &DashboardQuery,
    now: DateTime<Utc>,
) -> DashboardPage {
    let sort = query.sort.unwrap_or_default();
    let search = query.search_term();

    let mut matching = reconciliation
        .items
        .iter()
        .filter(|repository| matches(query, search.as_deref(), repository))
        .collect::<Vec<_>>();
    matching.sort_by(|left, right| compare(sort, left, right));

    let matching_count = matching.len();
    let total_pages = matching_count.div_ceil(ITEMS_PER_PAGE).max(1);
    let page = query.page.unwrap_or(1).clamp(1, total_pages);

    let items = matching
        .into_iter()
        .skip((page - 1) * ITEMS_PER_PAGE)
        .take(ITEMS_PER_PAGE)
        .map(|repository| {
            let last_activity_days = days_since(repository.updated_at, now);
            RepositoryCard {
                repository: repository.clone(),
                last_activity_days,
                status: activity_status(last_activity_days),
                roast: card_roast(last_activity_days, repository.progress),
            }
        })
        .collect();

    let languages = reconciliation
        .items
        .iter()
        .filter_map(|repository| repository.language.clone())
        .filter(|language| !language.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    DashboardPage {
        total_count: reconciliation.total_count,
        matching_count,
        page,
        total_pages,
        per_page: ITEMS_PER_PAGE,
        sort,
        languages,
        items,
        empty_state: reconciliation.empty_state(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn repository(id: i64, name: &str) -> ReconciledRepository {
        ReconciledRepository {
            id,
            name: name.to_string(),
            description: None,
            language: Some("Rust".to_string()),
            star_count: 0,
            fork_count: 0,
            updated_at: now() - Duration::days(1),
            url: format!("https://github.com/octo/{name}"),
            is_fork: false,
            progress: 0,
            reminder_enabled: false,
        }
    }

    fn reconciliation(items: Vec<ReconciledRepository>) -> Reconciliation {
        Reconciliation {
            total_count: u64::try_from(items.len()).expect("fits"),
            items,
            remote_unavailable: false,
        }
    }

    fn names(page: &DashboardPage) -> Vec<&str> {
        page.items
            .iter()
            .map(|card| card.repository.name.as_str())
            .collect()
    }

    #[test]
    fn default_query_sorts_by_name_and_hides_forks_and_completed() {
        let mut fork = repository(1, "alpha-fork");
        fork.is_fork = true;
        let mut done = repository(2, "beta-done");
        done.progress = 100;

        let listing = reconciliation(vec![
            repository(3, "zulu"),
            fork,
            done,
            repository(4, "Echo"),
        ]);
        let page = build_page(&listing, &DashboardQuery::default(), now());

        assert_eq!(names(&page), vec!["Echo", "zulu"]);
        assert_eq!(page.matching_count, 2);
        assert_eq!(page.total_count, 4);

        let everything = build_page(
            &listing,
            &DashboardQuery {
                exclude_forks_and_completed: Some(false),
                ..DashboardQuery::default()
            },
            now(),
        );
        assert_eq!(everything.matching_count, 4);
    }

    #[test]
    fn search_and_language_filters_combine() {
        let mut go_tool = repository(1, "cli-tool");
        go_tool.language = Some("Go".to_string());
        let mut untyped = repository(2, "cli-notes");
        untyped.language = None;

        let listing = reconciliation(vec![go_tool, untyped, repository(3, "CLI-rs"), repository(4, "web")]);

        let page = build_page(
            &listing,
            &DashboardQuery {
                search: Some("  cli ".to_string()),
                language: Some("Rust".to_string()),
                ..DashboardQuery::default()
            },
            now(),
        );
        assert_eq!(names(&page), vec!["CLI-rs"]);
        assert_eq!(page.languages, vec!["Go".to_string(), "Rust".to_string()]);

        let all = build_page(
            &listing,
            &DashboardQuery {
                search: Some("cli".to_string()),
                language: Some("all".to_string()),
                ..DashboardQuery::default()
            },
            now(),
        );
        assert_eq!(all.matching_count, 3);
    }

    #[test]
    fn numeric_sorts_are_descending_with_name_tiebreak() {
        let mut a = repository(1, "a");
        a.star_count = 5;
        a.progress = 10;
        let mut b = repository(2, "b");
        b.star_count = 9;
        b.progress = 10;
        let mut c = repository(3, "c");
        c.star_count = 5;
        c.progress = 80;
        c.updated_at = now() - Duration::days(40);

        let listing = reconciliation(vec![c, b, a]);
        let sorted = |sort| {
            let page = build_page(
                &listing,
                &DashboardQuery {
                    sort: Some(sort),
                    ..DashboardQuery::default()
                },
                now(),
            );
            names(&page).into_iter().map(ToString::to_string).collect::<Vec<_>>()
        };

        assert_eq!(sorted(SortOption::Stars), vec!["b", "a", "c"]);
        assert_eq!(sorted(SortOption::Progress), vec!["c", "a", "b"]);
        assert_eq!(sorted(SortOption::Updated), vec!["a", "b", "c"]);
    }

    #[test]
    fn pagination_uses_nine_items_and_clamps_page() {
        let listing = reconciliation(
            (0..20)
                .map(|index| repository(index, &format!("repo-{index:02}")))
                .collect(),
        );

        let last = build_page(
            &listing,
            &DashboardQuery {
                page: Some(3),
                ..DashboardQuery::default()
            },
            now(),
        );
        assert_eq!(last.total_pages, 3);
        assert_eq!(last.items.len(), 2);
        assert_eq!(names(&last), vec!["repo-18", "repo-19"]);

        let beyond = build_page(
            &listing,
            &DashboardQuery {
                page: Some(99),
                ..DashboardQuery::default()
            },
            now(),
        );
        assert_eq!(beyond.page, 3);

        let zero = build_page(
            &listing,
            &DashboardQuery {
                page: Some(0),
                ..DashboardQuery::default()
            },
            now(),
        );
        assert_eq!(zero.page, 1);
        assert_eq!(zero.items.len(), ITEMS_PER_PAGE);
    }

    #[test]
    fn empty_listing_reports_single_page_and_empty_state() {
        let page = build_page(&Reconciliation::default(), &DashboardQuery::default(), now());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.empty_state, Some(EmptyState::NoRepositories));
    }

    #[test]
    fn cards_carry_staleness_status_and_roast() {
        let mut stale = repository(1, "stale");
        stale.updated_at = now() - Duration::days(100);
        let page = build_page(&reconciliation(vec![stale]), &DashboardQuery::default(), now());

        let card = &page.items[0];
        assert_eq!(card.last_activity_days, 100);
        assert_eq!(card.status, ActivityStatus::Destructive);
        assert!(card.roast.contains("gym membership"));
    }

    #[test]
    fn query_deserializes_from_url_parameters() {
        let query = serde_json::from_value::<DashboardQuery>(serde_json::json!({
            "sort": "progress",
            "page": 2
        }))
        .expect("deserialize");
        assert_eq!(query.sort, Some(SortOption::Progress));
        assert_eq!(query.page, Some(2));
        assert!(query.excludes_forks_and_completed());
    }
}
