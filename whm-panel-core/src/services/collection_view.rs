//! 本地列表视图（排序 / 过滤 / 分页 / 选择）

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::traits::ViewStateStore;
use crate::types::{FilterDescriptor, ListItem, Slice, SortDirection, SortType, ViewState};

/// A paged, sorted and filtered view over a collection held in memory.
///
/// The visible page is `page(sort(filter(items)))`, recomputed after every change. Nothing is
/// cached besides the last computed slice. Selection is keyed by [`ListItem::key`] and survives
/// recomputation, replacement and re-sorting.
pub struct CollectionView<T> {
    items: Vec<T>,
    state: ViewState,
    selected: HashSet<String>,
    filtered_count: usize,
    slice: Slice<T>,
}

impl<T: ListItem + Clone> CollectionView<T> {
    /// Build a view and compute its first page.
    pub fn new(items: Vec<T>, state: ViewState) -> CoreResult<Self> {
        state.validate()?;
        let mut view = Self {
            items,
            state,
            selected: HashSet::new(),
            filtered_count: 0,
            slice: Slice::default(),
        };
        view.recompute();
        Ok(view)
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// The whole collection in its original order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Records on the current page plus pager totals.
    pub fn current_slice(&self) -> &Slice<T> {
        &self.slice
    }

    /// `(start, limit)` of the current page, 1-based, `(0, 0)` when empty.
    pub fn display_range(&self) -> (u64, u64) {
        (self.slice.start, self.slice.limit)
    }

    /// Number of records passing the filter.
    pub fn filtered_count(&self) -> usize {
        self.filtered_count
    }

    // ===== View state =====

    /// Replace the filter (`None` or an empty value filters nothing) and go back to page 1.
    pub fn set_filter(&mut self, filter: Option<FilterDescriptor>) {
        self.state.filter = filter;
        self.state.page_number = 1;
        self.recompute();
    }

    /// Sort by `field`. Ties keep their original order.
    pub fn set_sort(
        &mut self,
        field: impl Into<String>,
        direction: SortDirection,
        sort_type: Option<SortType>,
    ) {
        self.state.sort_field = Some(field.into());
        self.state.sort_direction = direction;
        self.state.sort_type = sort_type;
        self.recompute();
    }

    /// Back to the original order.
    pub fn clear_sort(&mut self) {
        self.state.sort_field = None;
        self.state.sort_type = None;
        self.recompute();
    }

    /// Go to page `n`, clamped to `1..=total_pages`.
    pub fn select_page(&mut self, n: u32) {
        self.state.page_number = n.max(1);
        self.recompute();
    }

    /// Change the page size and go back to page 1.
    pub fn set_page_size(&mut self, size: u32) -> CoreResult<()> {
        if size == 0 {
            return Err(CoreError::ValidationError(
                "page size must be greater than zero".to_string(),
            ));
        }
        self.state.page_size = size;
        self.state.page_number = 1;
        self.recompute();
        Ok(())
    }

    /// Replace the whole view state, e.g. one restored from a query string.
    pub fn apply_state(&mut self, state: ViewState) -> CoreResult<()> {
        state.validate()?;
        self.state = state;
        self.recompute();
        Ok(())
    }

    // ===== Collection edits =====

    /// Swap in a fresh collection. Selection is kept for keys still present.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
        let keys: HashSet<String> = self.items.iter().map(ListItem::key).collect();
        self.selected.retain(|k| keys.contains(k));
        self.recompute();
    }

    /// Edit one record in place. Returns `false` when no record has `key`.
    pub fn update<F>(&mut self, key: &str, edit: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let Some(item) = self.items.iter_mut().find(|item| item.key() == key) else {
            return false;
        };
        edit(item);
        let new_key = item.key();
        if new_key != key && self.selected.remove(key) {
            self.selected.insert(new_key);
        }
        self.recompute();
        true
    }

    /// Delete by key.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let position = self.items.iter().position(|item| item.key() == key)?;
        let removed = self.items.remove(position);
        self.selected.remove(key);
        self.recompute();
        Some(removed)
    }

    // ===== Selection =====

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.contains(key)
    }

    pub fn select(&mut self, key: &str) {
        if self.items.iter().any(|item| item.key() == key) {
            self.selected.insert(key.to_string());
        }
    }

    pub fn unselect(&mut self, key: &str) {
        self.selected.remove(key);
    }

    /// Flip selection, returning the new state.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.selected.remove(key) {
            false
        } else {
            self.select(key);
            self.selected.contains(key)
        }
    }

    pub fn select_all_visible(&mut self) {
        self.selected
            .extend(self.slice.items.iter().map(ListItem::key));
    }

    pub fn unselect_all_visible(&mut self) {
        for item in &self.slice.items {
            self.selected.remove(&item.key());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Selected records in collection order, visible or not.
    pub fn selected_records(&self) -> Vec<&T> {
        self.items
            .iter()
            .filter(|item| self.selected.contains(&item.key()))
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Every visible row is selected (false on an empty page).
    pub fn all_visible_selected(&self) -> bool {
        !self.slice.items.is_empty()
            && self
                .slice
                .items
                .iter()
                .all(|item| self.selected.contains(&item.key()))
    }

    // ===== Persistence =====

    /// Remember the current state under `key`.
    pub async fn save_state(&self, store: &dyn ViewStateStore, key: &str) -> CoreResult<()> {
        store.save(key, &self.state).await
    }

    /// Restore the state saved under `key`. Returns `false` when nothing was saved.
    pub async fn restore_state(&mut self, store: &dyn ViewStateStore, key: &str) -> CoreResult<bool> {
        match store.load(key).await? {
            Some(state) => {
                self.apply_state(state)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ===== Recompute =====

    fn recompute(&mut self) {
        let mut order: Vec<usize> = match self.state.active_filter() {
            Some(filter) => (0..self.items.len())
                .filter(|&i| filter.matches(&self.items[i]))
                .collect(),
            None => (0..self.items.len()).collect(),
        };

        if let Some(field) = &self.state.sort_field {
            let sort_type = self.state.sort_type.unwrap_or_default();
            let direction = self.state.sort_direction;
            // 先取出排序键，避免比较时重复构造
            let mut keyed: Vec<(Option<Value>, usize)> = order
                .into_iter()
                .map(|i| (self.items[i].field(field), i))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| {
                let ordering = sort_type.compare(a.as_ref(), b.as_ref());
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
            order = keyed.into_iter().map(|(_, i)| i).collect();
        }

        self.filtered_count = order.len();
        let total_items = order.len() as u64;
        let page_size = self.state.page_size.max(1);
        let total_pages = whm_panel_api::total_pages_for(total_items, page_size);
        self.state.page_number = self.state.page_number.clamp(1, total_pages);

        let visible: Vec<T> = order
            .into_iter()
            .skip(self.state.offset())
            .take(page_size as usize)
            .map(|i| self.items[i].clone())
            .collect();

        self.slice = Slice::new(visible, total_items, self.state.page_number, page_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::numbered_records;
    use crate::traits::InMemoryViewStateStore;
    use crate::types::{FilterComparator, Record};
    use serde_json::json;
    use std::cmp::Ordering;

    fn is_sorted_by_field<T: ListItem>(items: &[T], field: &str, sort_type: SortType) -> bool {
        items.windows(2).all(|w| {
            sort_type.compare(w[0].field(field).as_ref(), w[1].field(field).as_ref())
                != Ordering::Greater
        })
    }

    fn view(n: usize, page_size: u32) -> CollectionView<Record> {
        let mut state = ViewState::default();
        state.page_size = page_size;
        CollectionView::new(numbered_records(n), state).unwrap()
    }

    fn ids(slice: &Slice<Record>) -> Vec<String> {
        slice.items.iter().map(ListItem::key).collect()
    }

    #[test]
    fn pages_cover_collection_without_overlap() {
        let mut v = view(23, 10);
        let mut seen = Vec::new();
        for page in 1..=3 {
            v.select_page(page);
            let slice = v.current_slice();
            assert_eq!(slice.total_pages, 3);
            assert_eq!(slice.total_items, 23);
            seen.extend(ids(slice));
        }
        assert_eq!(seen.len(), 23);
        let unique: HashSet<_> = seen.iter().collect();
        assert_eq!(unique.len(), 23);
        assert_eq!(v.display_range(), (21, 23));
    }

    #[test]
    fn select_page_clamps() {
        let mut v = view(23, 10);
        v.select_page(0);
        assert_eq!(v.state().page_number, 1);
        v.select_page(99);
        assert_eq!(v.state().page_number, 3);
    }

    #[test]
    fn empty_collection_has_one_page() {
        let v = view(0, 10);
        assert_eq!(v.current_slice().total_pages, 1);
        assert_eq!(v.display_range(), (0, 0));
    }

    #[test]
    fn page_size_change_resets_page() {
        let mut v = view(50, 10);
        v.select_page(3);
        v.set_page_size(20).unwrap();
        assert_eq!(v.state().page_number, 1);
        assert_eq!(v.current_slice().items.len(), 20);
        assert_eq!(v.current_slice().total_pages, 3);
    }

    #[test]
    fn zero_page_size_rejected() {
        let mut v = view(5, 10);
        assert!(matches!(
            v.set_page_size(0),
            Err(CoreError::ValidationError(_))
        ));
        assert_eq!(v.state().page_size, 10);
    }

    #[test]
    fn filter_resets_page_and_counts() {
        let mut v = view(30, 10);
        v.select_page(2);
        v.set_filter(Some(FilterDescriptor::new(
            "name",
            FilterComparator::Ends,
            "7",
        )));
        assert_eq!(v.state().page_number, 1);
        assert_eq!(v.filtered_count(), 3);
        v.set_filter(Some(FilterDescriptor::any_field("")));
        assert_eq!(v.filtered_count(), 30);
    }

    #[test]
    fn sort_is_stable_and_idempotent() {
        let items: Vec<Record> = ["b", "a", "b", "a", "c"]
            .iter()
            .enumerate()
            .map(|(i, g)| Record::from_value(json!({ "id": i, "group": g })))
            .collect();
        let mut v = CollectionView::new(items, ViewState::default()).unwrap();

        v.set_sort("group", SortDirection::Asc, Some(SortType::Lexical));
        let first = ids(v.current_slice());
        assert_eq!(first, vec!["1", "3", "0", "2", "4"]);
        assert!(is_sorted_by_field(&v.current_slice().items, "group", SortType::Lexical));

        v.set_sort("group", SortDirection::Asc, Some(SortType::Lexical));
        assert_eq!(ids(v.current_slice()), first);

        // 倒序时相等元素仍保持原顺序
        v.set_sort("group", SortDirection::Desc, Some(SortType::Lexical));
        assert_eq!(ids(v.current_slice()), vec!["4", "0", "2", "1", "3"]);
    }

    #[test]
    fn numeric_sort_orders_by_value() {
        let items: Vec<Record> = [10, 9, 100]
            .iter()
            .map(|n| Record::from_value(json!({ "id": n })))
            .collect();
        let mut v = CollectionView::new(items, ViewState::default()).unwrap();
        v.set_sort("id", SortDirection::Asc, Some(SortType::Numeric));
        assert_eq!(ids(v.current_slice()), vec!["9", "10", "100"]);
        v.set_sort("id", SortDirection::Asc, Some(SortType::Lexical));
        assert_eq!(ids(v.current_slice()), vec!["10", "100", "9"]);
    }

    #[test]
    fn selection_survives_recompute() {
        let mut v = view(25, 10);
        v.select("3");
        v.select("24");
        v.select("missing");
        v.set_sort("id", SortDirection::Desc, Some(SortType::Numeric));
        v.select_page(3);
        assert!(v.is_selected("3"));
        assert_eq!(v.selected_count(), 2);

        v.remove("24");
        assert_eq!(v.selected_count(), 1);

        v.replace_all(numbered_records(3));
        assert!(v.selected_records().is_empty());
    }

    #[test]
    fn select_all_visible_and_back() {
        let mut v = view(15, 10);
        v.select_all_visible();
        assert!(v.all_visible_selected());
        assert_eq!(v.selected_count(), 10);
        v.select_page(2);
        assert!(!v.all_visible_selected());
        v.select_page(1);
        v.unselect_all_visible();
        assert_eq!(v.selected_count(), 0);
        assert!(v.toggle("1"));
        assert!(!v.toggle("1"));
    }

    #[test]
    fn update_edits_in_place() {
        let mut v = view(3, 10);
        assert!(v.update("1", |r| {
            r.set("name", json!("renamed"));
        }));
        assert_eq!(
            v.items()[1].get_str("name").as_deref(),
            Some("renamed")
        );
        assert!(!v.update("nope", |_| {}));
    }

    #[test]
    fn removing_last_row_of_last_page_moves_back() {
        let mut v = view(11, 10);
        v.select_page(2);
        v.remove("10");
        assert_eq!(v.state().page_number, 1);
        assert_eq!(v.current_slice().total_pages, 1);
    }

    #[tokio::test]
    async fn state_round_trips_through_store() {
        let store = InMemoryViewStateStore::new();
        let mut v = view(40, 10);
        v.set_sort("id", SortDirection::Desc, Some(SortType::Numeric));
        v.select_page(3);
        v.save_state(&store, "rules").await.unwrap();

        let mut other = view(40, 10);
        assert!(other.restore_state(&store, "rules").await.unwrap());
        assert_eq!(other.state(), v.state());
        assert_eq!(ids(other.current_slice()), ids(v.current_slice()));
        assert!(!other.restore_state(&store, "vendors").await.unwrap());
    }
}
