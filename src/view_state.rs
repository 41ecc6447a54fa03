//! Small state machines shared by both role screens: a fixed-size pager over
//! a remote listing and an expandable detail row.

use serde::Serialize;
use uuid::Uuid;

use crate::remote::Page;

// ---------------------------------------------------------------------------
// Pager
// ---------------------------------------------------------------------------

/// One page of a listing. A full page means there may be more rows behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pager<T> {
    pub page: Page,
    pub rows: Vec<T>,
}

impl<T> Pager<T> {
    pub fn new(size: u32) -> Self {
        Self {
            page: Page::first(size),
            rows: Vec::new(),
        }
    }

    /// Replace the rows with a fetched page. Extra rows are dropped.
    pub fn apply(&mut self, page: Page, mut rows: Vec<T>) {
        rows.truncate(page.size as usize);
        self.page = page;
        self.rows = rows;
    }

    pub fn has_prev(&self) -> bool {
        self.page.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.rows.len() as u32 == self.page.size
    }

    pub fn next_page(&self) -> Option<Page> {
        self.has_next().then(|| self.page.next())
    }

    pub fn prev_page(&self) -> Option<Page> {
        self.page.prev()
    }

    pub fn first_page(&self) -> Page {
        Page::first(self.page.size)
    }
}

// ---------------------------------------------------------------------------
// Detail panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DetailPanel<T> {
    Collapsed,
    Loading { id: Uuid },
    Open { id: Uuid, items: Vec<T> },
}

/// What the caller must do after [`DetailPanel::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Collapsed,
    Fetch(Uuid),
}

impl<T> Default for DetailPanel<T> {
    fn default() -> Self {
        DetailPanel::Collapsed
    }
}

impl<T> DetailPanel<T> {
    pub fn open_id(&self) -> Option<Uuid> {
        match self {
            DetailPanel::Collapsed => None,
            DetailPanel::Loading { id } | DetailPanel::Open { id, .. } => Some(*id),
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            DetailPanel::Open { items, .. } => items,
            _ => &[],
        }
    }

    /// Selecting the open row collapses it; any other row starts a fetch.
    pub fn toggle(&mut self, id: Uuid) -> Toggle {
        if self.open_id() == Some(id) {
            *self = DetailPanel::Collapsed;
            Toggle::Collapsed
        } else {
            *self = DetailPanel::Loading { id };
            Toggle::Fetch(id)
        }
    }

    /// Store fetched items. Ignored unless `id` is still the row waiting for
    /// them, so a late response cannot reopen a collapsed panel.
    pub fn resolve(&mut self, id: Uuid, items: Vec<T>) -> bool {
        if matches!(self, DetailPanel::Loading { id: waiting } if *waiting == id) {
            *self = DetailPanel::Open { id, items };
            true
        } else {
            false
        }
    }

    pub fn collapse(&mut self) {
        *self = DetailPanel::Collapsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_only_when_page_is_full() {
        let mut pager: Pager<u32> = Pager::new(5);
        pager.apply(Page::first(5), vec![1, 2, 3, 4, 5]);
        assert!(pager.has_next());
        assert!(!pager.has_prev());
        assert_eq!(pager.next_page(), Some(Page { index: 1, size: 5 }));

        pager.apply(Page { index: 1, size: 5 }, vec![6, 7]);
        assert!(!pager.has_next());
        assert!(pager.has_prev());
        assert_eq!(pager.next_page(), None);
    }

    #[test]
    fn apply_caps_rows_at_page_size() {
        let mut pager = Pager::new(5);
        pager.apply(Page::first(5), (0..8).collect::<Vec<u32>>());
        assert_eq!(pager.rows.len(), 5);
    }

    #[test]
    fn toggling_twice_collapses_without_pending_fetch() {
        let id = Uuid::new_v4();
        let mut panel: DetailPanel<u32> = DetailPanel::default();
        assert_eq!(panel.toggle(id), Toggle::Fetch(id));
        assert_eq!(panel.toggle(id), Toggle::Collapsed);
        assert_eq!(panel, DetailPanel::Collapsed);

        // The first fetch finishing late must not reopen the row.
        assert!(!panel.resolve(id, vec![1]));
        assert_eq!(panel.open_id(), None);
    }

    #[test]
    fn switching_rows_discards_previous_items() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut panel = DetailPanel::default();
        panel.toggle(a);
        assert!(panel.resolve(a, vec!["x"]));
        assert_eq!(panel.items(), &["x"]);

        assert_eq!(panel.toggle(b), Toggle::Fetch(b));
        assert!(panel.items().is_empty());
        assert!(!panel.resolve(a, vec!["stale"]));
        assert!(panel.resolve(b, vec!["y"]));
        assert_eq!(panel.items(), &["y"]);
    }
}
