//! Pagination, sort and filter state of one list view.

use odds_client::ListQuery;

use crate::cell::StateCell;
use crate::error::StateError;

pub const DEFAULT_SORT_DIRECTIVE: &str = "-last_updated";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
    /// Sorting cleared by the user.
    #[default]
    None,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "asc" => Self::Asc,
            "desc" => Self::Desc,
            _ => Self::None,
        }
    }
}

/// Column the user sorted by, as reported by the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub active: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(active: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            active: active.into(),
            direction,
        }
    }
}

/// Maps view column names to backend sort fields.
#[derive(Debug, Clone, Copy)]
pub struct SortFieldMap {
    pub view: &'static str,
    fields: &'static [(&'static str, &'static str)],
}

impl SortFieldMap {
    pub const DATASETS: Self = Self {
        view: "datasets",
        fields: &[
            ("title", "title.keyword"),
            ("publisher", "publisher.keyword"),
            ("quality_score", "quality_score"),
        ],
    };

    pub const WEBPAGES: Self = Self {
        view: "webpages",
        ..Self::DATASETS
    };

    pub const QUESTIONS: Self = Self {
        view: "questions",
        fields: &[
            ("timestamp", "last_updated"),
            ("success", "success"),
            ("score", "score"),
        ],
    };

    pub fn field(&self, column: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, field)| *field)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }
}

/// Four independent cells; clones share them.
#[derive(Debug, Clone)]
pub struct PageState {
    sort_fields: SortFieldMap,
    pub current_page: StateCell<u32>,
    pub current_sort: StateCell<Option<SortState>>,
    pub sort_directive: StateCell<Option<String>>,
    pub text_filter: StateCell<Option<String>>,
}

impl PageState {
    pub fn new(sort_fields: SortFieldMap) -> Self {
        Self {
            sort_fields,
            current_page: StateCell::new(1),
            current_sort: StateCell::new(None),
            sort_directive: StateCell::new(Some(DEFAULT_SORT_DIRECTIVE.to_string())),
            text_filter: StateCell::new(None),
        }
    }

    pub fn view(&self) -> &'static str {
        self.sort_fields.view
    }

    pub fn sort_fields(&self) -> SortFieldMap {
        self.sort_fields
    }

    /// Sets the page, clamped to at least 1.
    pub fn set_page(&self, page: u32) {
        self.current_page.set(page.max(1));
    }

    /// Table paginator reports zero-based indices.
    pub fn on_page_index(&self, page_index: u32) {
        self.set_page(page_index.saturating_add(1));
    }

    pub fn on_sort(&self, sort: SortState) -> Result<(), StateError> {
        let directive = match sort.direction {
            SortDirection::None => None,
            direction => {
                let Some(field) = self.sort_fields.field(&sort.active) else {
                    let err = StateError::UnknownSortField {
                        view: self.sort_fields.view,
                        field: sort.active.clone(),
                    };
                    tracing::error!("{err}");
                    debug_assert!(false, "{err}");
                    return Err(err);
                };
                let sign = if direction == SortDirection::Asc { '+' } else { '-' };
                Some(format!("{sign}{field}"))
            }
        };
        self.sort_directive.set(directive);
        self.current_sort.set(Some(sort));
        Ok(())
    }

    /// The list request this state currently describes.
    pub fn query(&self) -> ListQuery {
        ListQuery::page(self.current_page.get())
            .with_sort(self.sort_directive.get())
            .with_filter(self.text_filter.get())
    }

    /// Back to page 1. Sort and filter are left alone.
    pub fn reset(&self) {
        self.current_page.set(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let state = PageState::new(SortFieldMap::DATASETS);
        assert_eq!(state.current_page.get(), 1);
        assert_eq!(state.current_sort.get(), None);
        assert_eq!(state.sort_directive.get().as_deref(), Some("-last_updated"));
        assert_eq!(state.text_filter.get(), None);
    }

    #[test]
    fn sort_maps_column_and_direction() {
        let state = PageState::new(SortFieldMap::DATASETS);
        state
            .on_sort(SortState::new("title", SortDirection::Asc))
            .unwrap();
        assert_eq!(state.sort_directive.get().as_deref(), Some("+title.keyword"));

        state
            .on_sort(SortState::new("quality_score", SortDirection::Desc))
            .unwrap();
        assert_eq!(state.sort_directive.get().as_deref(), Some("-quality_score"));
        assert_eq!(
            state.current_sort.get(),
            Some(SortState::new("quality_score", SortDirection::Desc))
        );
    }

    #[test]
    fn cleared_sort_drops_directive() {
        let state = PageState::new(SortFieldMap::QUESTIONS);
        state
            .on_sort(SortState::new("timestamp", SortDirection::parse("")))
            .unwrap();
        assert_eq!(state.sort_directive.get(), None);
    }

    #[test]
    fn question_columns_use_their_own_table() {
        let state = PageState::new(SortFieldMap::QUESTIONS);
        state
            .on_sort(SortState::new("timestamp", SortDirection::Desc))
            .unwrap();
        assert_eq!(state.sort_directive.get().as_deref(), Some("-last_updated"));
    }

    // Unknown columns trip a debug assertion, so only release builds reach the Err.
    #[cfg(not(debug_assertions))]
    #[test]
    fn unknown_column_is_an_error() {
        let state = PageState::new(SortFieldMap::QUESTIONS);
        let err = state
            .on_sort(SortState::new("title", SortDirection::Asc))
            .unwrap_err();
        assert_eq!(
            err,
            StateError::UnknownSortField {
                view: "questions",
                field: "title".into()
            }
        );
        assert_eq!(state.sort_directive.get().as_deref(), Some("-last_updated"));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "no sort mapping")]
    fn unknown_column_panics_in_debug_builds() {
        let state = PageState::new(SortFieldMap::QUESTIONS);
        let _ = state.on_sort(SortState::new("title", SortDirection::Asc));
    }

    #[test]
    fn reset_only_touches_page() {
        let state = PageState::new(SortFieldMap::DATASETS);
        state.on_page_index(4);
        state.text_filter.set(Some("roads".into()));
        state
            .on_sort(SortState::new("publisher", SortDirection::Asc))
            .unwrap();

        state.reset();
        assert_eq!(state.current_page.get(), 1);
        assert_eq!(state.text_filter.get().as_deref(), Some("roads"));
        assert_eq!(
            state.sort_directive.get().as_deref(),
            Some("+publisher.keyword")
        );
    }

    #[test]
    fn page_is_clamped() {
        let state = PageState::new(SortFieldMap::WEBPAGES);
        state.set_page(0);
        assert_eq!(state.current_page.get(), 1);
        assert_eq!(state.view(), "webpages");
        assert_eq!(state.sort_fields().field("publisher"), Some("publisher.keyword"));
    }
}
