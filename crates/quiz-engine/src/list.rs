//! Filtered, paged collection controller.
//!
//! A [`ListController`] owns the query for one list view and keeps the page
//! on screen consistent with it. It never performs I/O itself: every change
//! that needs new data yields a [`FetchTicket`], the caller runs the fetch
//! (usually on a spawned task) and hands the response back to
//! [`ListController::apply`]. Tickets carry a sequence number, so a response
//! that resolves after a newer request is discarded.

use crate::api::QuizApi;
use crate::debounce::Debouncer;
use crate::error::{ApiError, ApiResult};
use crate::models::{AttemptSummary, Material, PagedResult, QuizSummary};
use crate::query::{CollectionQuery, Filter, FilterKey};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// A list endpoint the controller can page through.
#[async_trait]
pub trait Collection: Copy + Send + Sync + 'static {
    type Item: Clone + Send + 'static;

    /// Message shown when a fetch fails without a better one.
    fn failure_message(&self) -> &'static str;

    async fn fetch(
        &self,
        api: &dyn QuizApi,
        query: &CollectionQuery,
    ) -> ApiResult<PagedResult<Self::Item>>;
}

/// `GET /quizzes`, server-side paging and filtering.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quizzes;

#[async_trait]
impl Collection for Quizzes {
    type Item = QuizSummary;

    fn failure_message(&self) -> &'static str {
        "Failed to fetch quizzes"
    }

    async fn fetch(
        &self,
        api: &dyn QuizApi,
        query: &CollectionQuery,
    ) -> ApiResult<PagedResult<QuizSummary>> {
        api.list_quizzes(query).await
    }
}

/// `GET /quizzes/attempts`, server-side paging and filtering.
#[derive(Debug, Clone, Copy, Default)]
pub struct Attempts;

#[async_trait]
impl Collection for Attempts {
    type Item = AttemptSummary;

    fn failure_message(&self) -> &'static str {
        "Failed to load quiz attempts"
    }

    async fn fetch(
        &self,
        api: &dyn QuizApi,
        query: &CollectionQuery,
    ) -> ApiResult<PagedResult<AttemptSummary>> {
        api.list_attempts(query).await
    }
}

/// `GET /materials`. The endpoint is unpaged, so search and paging happen
/// on the client.
#[derive(Debug, Clone, Copy, Default)]
pub struct Materials;

#[async_trait]
impl Collection for Materials {
    type Item = Material;

    fn failure_message(&self) -> &'static str {
        "Failed to fetch study materials"
    }

    async fn fetch(
        &self,
        api: &dyn QuizApi,
        query: &CollectionQuery,
    ) -> ApiResult<PagedResult<Material>> {
        let needle = query.search.to_lowercase();
        let matching = api
            .list_materials()
            .await?
            .into_iter()
            .filter(|m| {
                needle.is_empty()
                    || m.title.to_lowercase().contains(&needle)
                    || m.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
                    || m.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect();
        Ok(PagedResult::from_full(matching, query.page, query.limit))
    }
}

/// A request the caller must execute and feed back through `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub query: CollectionQuery,
}

/// State of one filtered list view.
#[derive(Debug)]
pub struct ListController<C: Collection> {
    collection: C,
    query: CollectionQuery,
    /// Raw search box contents, echoed immediately.
    search_input: String,
    debouncer: Debouncer<String>,
    data: Option<PagedResult<C::Item>>,
    error: Option<String>,
    loading: bool,
    /// Sequence number of the latest issued request.
    issued: u64,
}

impl<C: Collection> ListController<C> {
    pub fn new(collection: C, limit: u32, debounce: Duration) -> Self {
        Self {
            collection,
            query: CollectionQuery::new(limit),
            search_input: String::new(),
            debouncer: Debouncer::new(debounce),
            data: None,
            error: None,
            loading: false,
            issued: 0,
        }
    }

    pub fn collection(&self) -> C {
        self.collection
    }

    pub fn query(&self) -> &CollectionQuery {
        &self.query
    }

    pub fn page(&self) -> u32 {
        self.query.page
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn data(&self) -> Option<&PagedResult<C::Item>> {
        self.data.as_ref()
    }

    pub fn items(&self) -> &[C::Item] {
        self.data.as_ref().map(|d| d.items.as_slice()).unwrap_or(&[])
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// No page has been received yet.
    pub fn is_initial_load(&self) -> bool {
        self.data.is_none()
    }

    /// Total pages as last reported, never below one.
    pub fn last_page(&self) -> u32 {
        self.data.as_ref().map(PagedResult::last_page).unwrap_or(1)
    }

    pub fn total(&self) -> u32 {
        self.data.as_ref().map(|d| d.total).unwrap_or(0)
    }

    /// Record a keystroke in the search box. The effective query only
    /// changes once input goes quiet (see [`tick`](Self::tick)).
    pub fn set_search_text(&mut self, text: impl Into<String>, now: Instant) {
        self.search_input = text.into();
        self.debouncer.push(self.search_input.clone(), now);
    }

    /// Advance the debounce timer. Returns a ticket if the committed search
    /// changed.
    pub fn tick(&mut self, now: Instant) -> Option<FetchTicket> {
        let search = self.debouncer.poll(now)?;
        if search == self.query.search {
            return None;
        }
        tracing::debug!(%search, "search committed");
        self.query.search = search;
        self.query.page = 1;
        Some(self.refetch())
    }

    /// Set a structured filter. Resets to page one when it changes.
    pub fn set_filter(&mut self, filter: Filter) -> Option<FetchTicket> {
        if !self.query.filters.set(filter) {
            return None;
        }
        self.query.page = 1;
        Some(self.refetch())
    }

    pub fn clear_filter(&mut self, key: FilterKey) -> Option<FetchTicket> {
        if !self.query.filters.clear(key) {
            return None;
        }
        self.query.page = 1;
        Some(self.refetch())
    }

    /// Clear the search box and every structured filter.
    pub fn clear_filters(&mut self) -> Option<FetchTicket> {
        self.search_input.clear();
        self.debouncer.cancel();
        if !self.query.is_filtered() {
            return None;
        }
        self.query.search.clear();
        self.query.filters = Default::default();
        self.query.page = 1;
        Some(self.refetch())
    }

    /// Jump to a page, clamped to the known range. Other filters are kept.
    pub fn set_page(&mut self, page: u32) -> Option<FetchTicket> {
        let page = page.clamp(1, self.last_page());
        if page == self.query.page {
            return None;
        }
        self.query.page = page;
        Some(self.refetch())
    }

    pub fn next_page(&mut self) -> Option<FetchTicket> {
        self.set_page(self.query.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> Option<FetchTicket> {
        self.set_page(self.query.page.saturating_sub(1))
    }

    /// Issue a request for the current query. Any older request still in
    /// flight is superseded.
    pub fn refetch(&mut self) -> FetchTicket {
        self.issued += 1;
        self.loading = true;
        FetchTicket {
            seq: self.issued,
            query: self.query.clone(),
        }
    }

    /// Whether `seq` belongs to the latest issued request.
    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.issued
    }

    /// Commit a response. Responses to superseded requests are dropped.
    ///
    /// Returns a follow-up ticket when the page no longer exists, e.g. the
    /// collection shrank underneath us.
    pub fn apply(
        &mut self,
        seq: u64,
        result: ApiResult<PagedResult<C::Item>>,
    ) -> Option<FetchTicket> {
        if !self.is_current(seq) {
            tracing::debug!(seq, latest = self.issued, "discarding stale response");
            return None;
        }
        self.loading = false;

        match result {
            Ok(page) => {
                let overshoot = self.query.page > page.last_page();
                self.data = Some(page);
                self.error = None;
                if overshoot {
                    self.query.page = self.last_page();
                    return Some(self.refetch());
                }
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "list fetch failed");
                self.error = Some(self.describe(&err));
                None
            }
        }
    }

    /// Drop items removed on the server and re-derive the page to show.
    ///
    /// Emptying a page beyond the first steps back one page.
    pub fn remove_where(&mut self, pred: impl Fn(&C::Item) -> bool) -> FetchTicket {
        if let Some(data) = &mut self.data {
            data.items.retain(|item| !pred(item));
            if data.items.is_empty() && self.query.page > 1 {
                self.query.page -= 1;
            }
        }
        self.refetch()
    }

    /// Record a failure that happened outside a fetch (e.g. a delete).
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Start over with a fresh query, as when a view is mounted again.
    ///
    /// The sequence counter keeps running so responses to requests issued
    /// before the reset are still recognised as stale.
    pub fn reset(&mut self) -> FetchTicket {
        self.query = CollectionQuery::new(self.query.limit);
        self.search_input.clear();
        self.debouncer.cancel();
        self.data = None;
        self.error = None;
        self.refetch()
    }

    fn describe(&self, err: &ApiError) -> String {
        match err {
            ApiError::Network(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            _ => err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| self.collection.failure_message().to_string()),
        }
    }

    /// Issue, fetch and apply in one go. Used where nothing else can run
    /// concurrently, such as tests and one-shot refreshes.
    pub async fn refresh(&mut self, api: &dyn QuizApi) {
        let mut ticket = Some(self.refetch());
        while let Some(t) = ticket {
            let result = self.collection.fetch(api, &t.query).await;
            ticket = self.apply(t.seq, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::SEARCH_DEBOUNCE;
    use crate::testing::{material, FakeApi};

    fn quizzes(limit: u32) -> ListController<Quizzes> {
        ListController::new(Quizzes, limit, SEARCH_DEBOUNCE)
    }

    #[tokio::test]
    async fn test_initial_fetch() {
        let api = FakeApi::with_quizzes(20);
        let mut list = quizzes(8);
        assert!(list.is_initial_load());

        list.refresh(&api).await;

        assert_eq!(list.items().len(), 8);
        assert_eq!(list.last_page(), 3);
        assert_eq!(list.total(), 20);
        assert!(!list.is_loading());
    }

    #[test]
    fn test_debounced_search_commits_once() {
        let t0 = Instant::now();
        let mut list = quizzes(8);
        let mut tickets = Vec::new();

        for (i, text) in ["b", "bi", "bio", "biol", "biolo"].iter().enumerate() {
            let now = t0 + Duration::from_millis(i as u64 * 100);
            tickets.extend(list.tick(now));
            list.set_search_text(*text, now);
            assert_eq!(list.search_input(), *text);
        }
        assert!(tickets.is_empty());
        assert_eq!(list.query().search, "");

        tickets.extend(list.tick(t0 + Duration::from_millis(400) + SEARCH_DEBOUNCE));
        tickets.extend(list.tick(t0 + Duration::from_secs(5)));

        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].query.search, "biolo");
    }

    #[tokio::test]
    async fn test_search_resets_page() {
        let api = FakeApi::with_quizzes(30);
        let mut list = quizzes(8);
        list.refresh(&api).await;
        list.set_page(3);
        assert_eq!(list.page(), 3);

        let t0 = Instant::now();
        list.set_search_text("Quiz", t0);
        let ticket = list.tick(t0 + SEARCH_DEBOUNCE).unwrap();
        assert_eq!(ticket.query.page, 1);
    }

    #[tokio::test]
    async fn test_filter_change_resets_page() {
        let api = FakeApi::with_quizzes(30);
        let mut list = quizzes(8);
        list.refresh(&api).await;
        assert!(list.set_page(3).is_some());

        let ticket = list.set_filter(Filter::Material("m1".into())).unwrap();
        assert_eq!(ticket.query.page, 1);
        assert_eq!(ticket.query.filters.material.as_deref(), Some("m1"));

        // Same value again is not a change.
        assert!(list.set_filter(Filter::Material("m1".into())).is_none());
    }

    #[tokio::test]
    async fn test_set_page_keeps_filters_and_clamps() {
        let api = FakeApi::with_quizzes(20);
        let mut list = quizzes(8);
        list.set_filter(Filter::Material("m1".into()));
        list.refresh(&api).await;

        let ticket = list.set_page(99).unwrap();
        assert_eq!(ticket.query.page, 3);
        assert_eq!(ticket.query.filters.material.as_deref(), Some("m1"));
        assert!(list.set_page(0).is_some());
        assert_eq!(list.page(), 1);
        assert!(list.prev_page().is_none());
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut list = quizzes(8);
        let first = list.refetch();
        let second = list.refetch();

        let newer = PagedResult::from_full(vec![crate::testing::summary("new")], 1, 8);
        let older = PagedResult::from_full(vec![crate::testing::summary("old")], 1, 8);

        assert!(list.apply(second.seq, Ok(newer)).is_none());
        assert!(list.apply(first.seq, Ok(older)).is_none());

        assert_eq!(list.items()[0].id, "new");
    }

    #[tokio::test]
    async fn test_error_keeps_previous_page() {
        let api = FakeApi::with_quizzes(10);
        let mut list = quizzes(8);
        list.refresh(&api).await;

        *api.list_error.lock().unwrap() = Some(ApiError::Server {
            status: 500,
            message: None,
        });
        list.next_page();
        let ticket = list.refetch();
        let result = list.collection().fetch(&api, &ticket.query).await;
        list.apply(ticket.seq, result);

        assert_eq!(list.error(), Some("Failed to fetch quizzes"));
        assert_eq!(list.items().len(), 8);
    }

    #[tokio::test]
    async fn test_emptied_collection_returns_to_first_page() {
        let api = FakeApi::with_quizzes(9);
        let mut list = quizzes(8);
        list.refresh(&api).await;
        list.set_page(2);
        api.quizzes.lock().unwrap().clear();

        list.refresh(&api).await;
        assert_eq!(list.page(), 1);
        assert_eq!(list.last_page(), 1);
        assert_eq!(list.total(), 0);
        assert!(list.items().is_empty());
    }

    #[tokio::test]
    async fn test_initial_error_leaves_no_data() {
        let api = FakeApi::default();
        *api.list_error.lock().unwrap() = Some(ApiError::Network("refused".into()));
        let mut list = quizzes(8);
        list.refresh(&api).await;

        assert!(list.is_initial_load());
        assert!(list.error().unwrap().starts_with("Network error"));
    }

    #[tokio::test]
    async fn test_delete_last_item_steps_back() {
        let api = FakeApi::with_quizzes(9);
        let mut list = quizzes(8);
        list.refresh(&api).await;
        let ticket = list.set_page(2).unwrap();
        let result = list.collection().fetch(&api, &ticket.query).await;
        list.apply(ticket.seq, result);
        assert_eq!(list.items().len(), 1);

        api.delete_quiz("q9").await.unwrap();
        let ticket = list.remove_where(|q| q.id == "q9");
        assert_eq!(ticket.query.page, 1);
    }

    #[tokio::test]
    async fn test_delete_keeps_page_when_items_remain() {
        let api = FakeApi::with_quizzes(12);
        let mut list = quizzes(8);
        list.refresh(&api).await;
        list.set_page(2);
        list.refresh(&api).await;

        let ticket = list.remove_where(|q| q.id == "q9");
        assert_eq!(ticket.query.page, 2);
    }

    #[tokio::test]
    async fn test_page_overshoot_corrects() {
        let api = FakeApi::with_quizzes(9);
        let mut list = quizzes(8);
        list.refresh(&api).await;
        list.set_page(2);
        api.quizzes.lock().unwrap().truncate(8);

        list.refresh(&api).await;
        assert_eq!(list.page(), 1);
        assert_eq!(list.items().len(), 8);
    }

    #[test]
    fn test_clear_filters() {
        let mut list = quizzes(8);
        let t0 = Instant::now();
        list.set_search_text("pending", t0);
        assert!(list.clear_filters().is_none());
        assert_eq!(list.search_input(), "");
        assert!(list.tick(t0 + SEARCH_DEBOUNCE).is_none());

        list.set_filter(Filter::Material("m".into()));
        let ticket = list.clear_filters().unwrap();
        assert!(!ticket.query.is_filtered());
    }

    #[tokio::test]
    async fn test_materials_paged_client_side() {
        let api = FakeApi::default();
        *api.materials.lock().unwrap() = vec![
            material("m1", "Cell Biology"),
            material("m2", "Organic Chemistry"),
            material("m3", "Biology of Plants"),
        ];
        let mut list = ListController::new(Materials, 10, SEARCH_DEBOUNCE);
        let t0 = Instant::now();
        list.set_search_text("biology", t0);
        let ticket = list.tick(t0 + SEARCH_DEBOUNCE).unwrap();
        let result = list.collection().fetch(&api, &ticket.query).await;
        list.apply(ticket.seq, result);

        let ids: Vec<_> = list.items().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
        assert_eq!(list.total(), 2);
    }

    #[test]
    fn test_reset_keeps_stale_guard() {
        let mut list = quizzes(8);
        list.set_filter(Filter::Material("m1".into()));
        let before = list.refetch();

        let after = list.reset();
        assert!(!after.query.is_filtered());
        assert!(after.seq > before.seq);

        let old = PagedResult::from_full(vec![crate::testing::summary("old")], 1, 8);
        list.apply(before.seq, Ok(old));
        assert!(list.is_initial_load());
    }
}
