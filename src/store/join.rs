//! Joining waiting records to their catalog entries

use crate::catalog::{CatalogEntry, SubjectResolver};
use crate::error::IntegrityError;
use crate::types::{JoinedWaitingView, RecordKind, Timestamp, WaitingRecord};
use serde::Serialize;

/// Point-in-time copy of one kind's joined views
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<S> {
    pub kind: RecordKind,
    /// Joined views in catalog-registration order
    pub views: Vec<JoinedWaitingView<S>>,
    /// Records left out because their subject could not be resolved
    #[serde(skip)]
    pub integrity_errors: Vec<IntegrityError>,
    pub last_refreshed_at: Option<Timestamp>,
}

impl<S> Snapshot<S> {
    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn view(&self, record_id: &str) -> Option<&JoinedWaitingView<S>> {
        self.views.iter().find(|v| v.record.id == record_id)
    }
}

/// Join records to the catalog, ordering by subject registration.
///
/// Records whose subject does not resolve are returned as integrity errors
/// instead of views.
pub fn join_records<S, R>(
    kind: RecordKind,
    records: &[WaitingRecord],
    resolver: &R,
) -> (Vec<JoinedWaitingView<S>>, Vec<IntegrityError>)
where
    S: CatalogEntry,
    R: SubjectResolver<S>,
{
    let mut positioned = Vec::with_capacity(records.len());
    let mut errors = Vec::new();

    for record in records {
        let subject_id = record.subject_id.as_str();
        match (resolver.position(subject_id), resolver.resolve(subject_id)) {
            (Some(position), Some(subject)) => positioned.push((
                position,
                JoinedWaitingView {
                    record: record.clone(),
                    subject: subject.clone(),
                },
            )),
            _ => errors.push(IntegrityError {
                kind,
                record_id: record.id.clone(),
                subject_id: record.subject_id.clone(),
            }),
        }
    }

    // Stable sort keeps source order among records of the same subject
    positioned.sort_by_key(|(position, _)| *position);
    let views = positioned.into_iter().map(|(_, view)| view).collect();

    (views, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::seed;
    use crate::types::Examination;

    #[test]
    fn test_join_orders_by_catalog() {
        let catalog: Catalog<Examination> = Catalog::from_entries(seed::examinations()).unwrap();
        let mut records = seed::examination_records();
        records.reverse();

        let (views, errors) = join_records(RecordKind::Examination, &records, &catalog);

        assert!(errors.is_empty());
        let ids: Vec<_> = views.iter().map(|v| v.subject.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["exam-001", "exam-002", "exam-003", "exam-004", "exam-005", "exam-006"]
        );
    }

    #[test]
    fn test_unresolved_record_becomes_integrity_error() {
        let catalog: Catalog<Examination> =
            Catalog::from_entries(vec![seed::examinations()[0].clone()]).unwrap();
        let mut records = vec![seed::examination_records()[0].clone()];
        let mut dangling = seed::examination_records()[1].clone();
        dangling.subject_id = "exam-404".to_string();
        records.push(dangling);

        let (views, errors) = join_records(RecordKind::Examination, &records, &catalog);

        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id(), "wait-001");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].subject_id, "exam-404");
        assert_eq!(errors[0].record_id, "wait-002");
    }
}
