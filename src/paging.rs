//! Pagination and search state for the project table.
//!
//! [`PageState`] is a plain value: every transition consumes the current
//! state and returns the next one. [`reload`] turns a state's [`PageQuery`]
//! into gateway calls.

use std::fmt;

use chrono::NaiveDate;

use crate::db::ProjectGateway;
use crate::error::PersistenceError;
use crate::models::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    Five,
    #[default]
    Ten,
    Twenty,
    Fifty,
    Hundred,
}

impl PageSize {
    pub const ALL: [PageSize; 5] = [
        PageSize::Five,
        PageSize::Ten,
        PageSize::Twenty,
        PageSize::Fifty,
        PageSize::Hundred,
    ];

    pub fn get(self) -> u32 {
        match self {
            PageSize::Five => 5,
            PageSize::Ten => 10,
            PageSize::Twenty => 20,
            PageSize::Fifty => 50,
            PageSize::Hundred => 100,
        }
    }

    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.get() == value)
    }

    /// The next larger size, staying at the largest.
    pub fn larger(self) -> Self {
        match self {
            PageSize::Five => PageSize::Ten,
            PageSize::Ten => PageSize::Twenty,
            PageSize::Twenty => PageSize::Fifty,
            PageSize::Fifty | PageSize::Hundred => PageSize::Hundred,
        }
    }

    /// The next smaller size, staying at the smallest.
    pub fn smaller(self) -> Self {
        match self {
            PageSize::Five | PageSize::Ten => PageSize::Five,
            PageSize::Twenty => PageSize::Ten,
            PageSize::Fifty => PageSize::Twenty,
            PageSize::Hundred => PageSize::Fifty,
        }
    }

    pub fn describe_all() -> String {
        Self::ALL
            .iter()
            .map(|size| size.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Which rows the table shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchFilter {
    #[default]
    All,
    NameContains(String),
    DueDate(NaiveDate),
}

impl SearchFilter {
    /// Search text as typed by the user; blank text means no filter.
    pub fn by_name(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            SearchFilter::All
        } else {
            SearchFilter::NameContains(text.to_string())
        }
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchFilter::All => write!(f, "all projects"),
            SearchFilter::NameContains(text) => write!(f, "name contains \"{}\"", text),
            SearchFilter::DueDate(date) => write!(f, "due on {}", date.format("%Y-%m-%d")),
        }
    }
}

/// The offset window a reload fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub filter: SearchFilter,
    pub offset: i64,
    pub limit: i64,
}

/// One fetched page plus the row count of the whole filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub projects: Vec<Project>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageState {
    pub filter: SearchFilter,
    pub page_number: u32,
    pub page_size: PageSize,
}

impl PageState {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page_number) * i64::from(self.page_size.get())
    }

    pub fn query(&self) -> PageQuery {
        PageQuery {
            filter: self.filter.clone(),
            offset: self.offset(),
            limit: i64::from(self.page_size.get()),
        }
    }

    pub fn with_filter(self, filter: SearchFilter) -> Self {
        Self {
            filter,
            page_number: 0,
            ..self
        }
    }

    pub fn with_page_size(self, page_size: PageSize) -> Self {
        Self {
            page_size,
            page_number: 0,
            ..self
        }
    }

    /// Advance one page unless `total` is known and this is already the last page.
    pub fn next(self, total: Option<i64>) -> Self {
        if self.is_last_page(total) {
            return self;
        }
        Self {
            page_number: self.page_number.saturating_add(1),
            ..self
        }
    }

    pub fn previous(self) -> Self {
        Self {
            page_number: self.page_number.saturating_sub(1),
            ..self
        }
    }

    pub fn first(self) -> Self {
        Self {
            page_number: 0,
            ..self
        }
    }

    pub fn last(self, total: i64) -> Self {
        let page_number = self.page_count(total).saturating_sub(1);
        Self {
            page_number,
            ..self
        }
    }

    /// Number of pages needed for `total` rows; zero rows need zero pages.
    pub fn page_count(&self, total: i64) -> u32 {
        let total = total.max(0);
        let size = i64::from(self.page_size.get());
        let pages = (total + size - 1) / size;
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn is_last_page(&self, total: Option<i64>) -> bool {
        match total {
            Some(total) => self.offset() + i64::from(self.page_size.get()) >= total,
            None => false,
        }
    }
}

/// Fetch the page described by `query`, along with the filtered row count.
pub async fn reload<G: ProjectGateway>(gateway: &G, query: &PageQuery) -> Result<Page, PersistenceError> {
    let offset = Some(query.offset);
    let limit = Some(query.limit);
    let (projects, total) = match &query.filter {
        SearchFilter::All => (
            gateway.list(offset, limit).await?,
            gateway.count().await?,
        ),
        SearchFilter::NameContains(text) => (
            gateway.list_by_name_contains(text, offset, limit).await?,
            gateway.count_by_name_contains(text).await?,
        ),
        SearchFilter::DueDate(date) => (
            gateway.list_by_due_date(*date, offset, limit).await?,
            gateway.count_by_due_date(*date).await?,
        ),
    };
    Ok(Page { projects, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryGateway;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_match_a_fresh_table() {
        let state = PageState::default();
        assert_eq!(state.filter, SearchFilter::All);
        assert_eq!(state.page_number, 0);
        assert_eq!(state.page_size.get(), 10);
    }

    #[test]
    fn page_sizes_are_the_fixed_set() {
        let values: Vec<u32> = PageSize::ALL.iter().map(|s| s.get()).collect();
        assert_eq!(values, vec![5, 10, 20, 50, 100]);
        assert_eq!(PageSize::from_value(20), Some(PageSize::Twenty));
        assert_eq!(PageSize::from_value(15), None);
        assert_eq!(PageSize::Hundred.larger(), PageSize::Hundred);
        assert_eq!(PageSize::Five.smaller(), PageSize::Five);
        assert_eq!(PageSize::Ten.larger().smaller(), PageSize::Ten);
    }

    #[test]
    fn search_and_page_size_reset_to_first_page() {
        let state = PageState {
            page_number: 4,
            ..PageState::default()
        };

        let searched = state.clone().with_filter(SearchFilter::by_name("alp"));
        assert_eq!(searched.page_number, 0);
        assert_eq!(searched.filter, SearchFilter::NameContains("alp".into()));

        let resized = state.with_page_size(PageSize::Fifty);
        assert_eq!(resized.page_number, 0);
        assert_eq!(resized.page_size, PageSize::Fifty);
    }

    #[test]
    fn blank_search_text_clears_the_filter() {
        assert_eq!(SearchFilter::by_name("   "), SearchFilter::All);
        assert_eq!(SearchFilter::by_name(" Beta "), SearchFilter::NameContains("Beta".into()));
    }

    #[test]
    fn page_count_rounds_up() {
        let state = PageState::new(PageSize::Five);
        assert_eq!(state.page_count(0), 0);
        assert_eq!(state.page_count(5), 1);
        assert_eq!(state.page_count(12), 3);
        assert_eq!(state.clone().last(0).page_number, 0);
        assert_eq!(state.last(12).page_number, 2);
    }

    #[test]
    fn previous_stops_at_zero() {
        let state = PageState::default().previous();
        assert_eq!(state.page_number, 0);

        let state = PageState {
            page_number: 2,
            ..PageState::default()
        }
        .previous();
        assert_eq!(state.page_number, 1);
    }

    #[test]
    fn next_stops_at_the_last_known_page() {
        let state = PageState::new(PageSize::Five);

        let state = state.next(Some(12));
        assert_eq!(state.page_number, 1);
        let state = state.next(Some(12));
        assert_eq!(state.page_number, 2);
        let state = state.next(Some(12));
        assert_eq!(state.page_number, 2);
    }

    #[test]
    fn next_without_a_total_always_advances() {
        let state = PageState::new(PageSize::Five).next(None).next(None);
        assert_eq!(state.page_number, 2);
    }

    #[test]
    fn first_and_last_jump_to_the_ends() {
        let state = PageState::new(PageSize::Five).last(12);
        assert_eq!(state.page_number, 2);
        assert_eq!(state.first().page_number, 0);

        assert_eq!(PageState::new(PageSize::Five).last(10).page_number, 1);
        assert_eq!(PageState::new(PageSize::Five).last(0).page_number, 0);
    }

    #[test]
    fn query_uses_page_times_size_as_offset() {
        let state = PageState {
            filter: SearchFilter::DueDate(ymd(2025, 1, 1)),
            page_number: 3,
            page_size: PageSize::Twenty,
        };
        let query = state.query();

        assert_eq!(query.offset, 60);
        assert_eq!(query.limit, 20);
        assert_eq!(query.filter, SearchFilter::DueDate(ymd(2025, 1, 1)));
    }

    #[tokio::test]
    async fn reload_walks_twelve_rows_in_pages_of_five() {
        let gateway = MemoryGateway::default();
        for i in 1..=12 {
            gateway.insert(Project::new(format!("p{i}"), "d", ymd(2025, 1, 1)));
        }

        let mut state = PageState::new(PageSize::Five);
        let mut sizes = Vec::new();
        for _ in 0..4 {
            let page = reload(&gateway, &state.query()).await.unwrap();
            assert_eq!(page.total, 12);
            sizes.push(page.projects.len());
            state = state.next(None);
        }
        assert_eq!(sizes, vec![5, 5, 2, 0]);

        let first = reload(&gateway, &PageState::new(PageSize::Five).query())
            .await
            .unwrap();
        let names: Vec<&str> = first.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["p12", "p11", "p10", "p9", "p8"]);
    }

    #[tokio::test]
    async fn reload_dispatches_on_filter() {
        let gateway = MemoryGateway::default();
        gateway.insert(Project::new("Alpha", "d1", ymd(2025, 1, 1)));
        gateway.insert(Project::new("Beta", "d2", ymd(2025, 2, 1)));

        let by_name = PageState::default().with_filter(SearchFilter::by_name("pha"));
        let page = reload(&gateway, &by_name.query()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.projects[0].name, "Alpha");

        let by_date = PageState::default().with_filter(SearchFilter::DueDate(ymd(2025, 2, 1)));
        let page = reload(&gateway, &by_date.query()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.projects[0].name, "Beta");
    }

    #[tokio::test]
    async fn reload_surfaces_gateway_failures() {
        let gateway = MemoryGateway::default();
        gateway.fail_next();

        let err = reload(&gateway, &PageState::default().query()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Query { .. }));
    }
}
