//! Status and free-text filtering of joined views

use crate::catalog::CatalogEntry;
use crate::error::{Result, WaitingTimeError};
use crate::types::{JoinedWaitingView, WaitingStatus};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status selector from the staff filter bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Only(WaitingStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: WaitingStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "all" {
            return Ok(StatusFilter::All);
        }
        WaitingStatus::from_str(s)
            .map(StatusFilter::Only)
            .map_err(|_| {
                WaitingTimeError::validation("status_filter", format!("unknown filter '{}'", s))
                    .into()
            })
    }
}

/// Filter criteria applied to a loaded view list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingFilter {
    pub status: StatusFilter,
    /// Free text matched against subject name and description
    pub search: String,
}

impl WaitingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self
    }

    /// True when the filter lets every view through
    pub fn is_identity(&self) -> bool {
        self.status == StatusFilter::All && self.search.trim().is_empty()
    }

    pub fn matches<S: CatalogEntry>(&self, view: &JoinedWaitingView<S>) -> bool {
        self.status.matches(view.status()) && matches_term(view, &normalized_term(&self.search))
    }
}

/// Views that pass `filter`, in their original order
pub fn filter_views<S: CatalogEntry>(
    views: &[JoinedWaitingView<S>],
    filter: &WaitingFilter,
) -> Vec<JoinedWaitingView<S>> {
    let term = normalized_term(&filter.search);
    views
        .iter()
        .filter(|view| filter.status.matches(view.status()) && matches_term(view, &term))
        .cloned()
        .collect()
}

fn normalized_term(search: &str) -> String {
    search.trim().to_lowercase()
}

fn matches_term<S: CatalogEntry>(view: &JoinedWaitingView<S>, term: &str) -> bool {
    term.is_empty()
        || view.subject.name().to_lowercase().contains(term)
        || view.subject.description().to_lowercase().contains(term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::seed;
    use crate::store::join_records;
    use crate::types::{ConsultationRoom, Examination, RecordKind};
    use proptest::prelude::*;

    fn exam_views() -> Vec<JoinedWaitingView<Examination>> {
        let catalog = Catalog::from_entries(seed::examinations()).unwrap();
        join_records(RecordKind::Examination, &seed::examination_records(), &catalog).0
    }

    fn room_views() -> Vec<JoinedWaitingView<ConsultationRoom>> {
        let catalog = Catalog::from_entries(seed::consultation_rooms()).unwrap();
        join_records(RecordKind::Room, &seed::room_records(), &catalog).0
    }

    #[test]
    fn test_status_and_search_combine() {
        let views = exam_views();
        let filter = WaitingFilter::new()
            .status(StatusFilter::Only(WaitingStatus::Crowded))
            .search("ct");

        let filtered = filter_views(&views, &filter);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].subject.name, "CT scan");
    }

    #[test]
    fn test_search_is_trimmed_and_case_insensitive() {
        let views = exam_views();
        let filtered = filter_views(&views, &WaitingFilter::new().search("  ULTRA "));

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id(), "wait-004");
    }

    #[test]
    fn test_search_matches_description() {
        let views = exam_views();
        let filtered = filter_views(&views, &WaitingFilter::new().search("stomach"));
        assert_eq!(filtered[0].subject.name, "Endoscopy");
    }

    #[test]
    fn test_blank_search_keeps_everything() {
        let views = exam_views();
        let filter = WaitingFilter::new().search("   ");

        assert!(filter.is_identity());
        assert_eq!(filter_views(&views, &filter), views);
    }

    #[test]
    fn test_room_search_uses_doctor_and_department() {
        let views = room_views();

        let surgical = filter_views(&views, &WaitingFilter::new().search("surgery"));
        assert_eq!(surgical.len(), 2);

        let by_doctor = filter_views(&views, &WaitingFilter::new().search("tanaka"));
        assert_eq!(by_doctor.len(), 1);
        assert_eq!(by_doctor[0].id(), "consult-002");
    }

    #[test]
    fn test_status_filter_parsing() {
        assert_eq!(StatusFilter::from_str("all").unwrap(), StatusFilter::All);
        assert_eq!(
            StatusFilter::from_str("closed").unwrap(),
            StatusFilter::Only(WaitingStatus::Closed)
        );
        assert!(StatusFilter::from_str("busy").is_err());
    }

    fn status_filter() -> impl Strategy<Value = StatusFilter> {
        prop_oneof![
            Just(StatusFilter::All),
            Just(StatusFilter::Only(WaitingStatus::Normal)),
            Just(StatusFilter::Only(WaitingStatus::Crowded)),
            Just(StatusFilter::Only(WaitingStatus::Closed)),
        ]
    }

    proptest! {
        #[test]
        fn prop_whitespace_search_with_all_is_identity(pad in "[ \t]{0,4}") {
            let views = exam_views();
            let filter = WaitingFilter::new().search(pad);
            prop_assert_eq!(filter_views(&views, &filter), views);
        }

        #[test]
        fn prop_result_is_ordered_subsequence(status in status_filter(), term in "[a-zA-Z ]{0,6}") {
            let views = exam_views();
            let filtered = filter_views(&views, &WaitingFilter { status, search: term });

            let mut remaining = views.iter();
            for view in &filtered {
                prop_assert!(remaining.any(|v| v == view));
            }
        }

        #[test]
        fn prop_narrowing_never_grows(status in status_filter(), term in "[a-z]{0,4}") {
            let views = exam_views();
            let broad = filter_views(&views, &WaitingFilter::new().search(term.clone()));
            let narrow = filter_views(&views, &WaitingFilter { status, search: term });
            prop_assert!(narrow.len() <= broad.len());
        }
    }
}
