//! Board rendering of joined views
//!
//! Closed entries show "-" instead of numbers; the stored values are kept so
//! reopening restores them.

use crate::catalog::CatalogEntry;
use crate::error::{Result, WaitingTimeError};
use crate::types::{JoinedWaitingView, Timestamp};
use chrono::{Datelike, FixedOffset, Offset, Timelike, Utc};
use serde::Serialize;

/// Japan Standard Time, where the boards run
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

const CLOSED_PLACEHOLDER: &str = "-";

/// One row as shown on the patient and staff boards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitingDisplay {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub waiting_count: String,
    pub estimated_minutes: String,
    pub status_label: &'static str,
    /// `H:MM`
    pub last_updated: String,
    /// `YYYY/M/D H:MM`
    pub updated_detail: String,
}

/// Renders views in the board's local time
#[derive(Debug, Clone, Copy)]
pub struct DisplayFormatter {
    offset: FixedOffset,
}

impl DisplayFormatter {
    pub fn new(utc_offset_hours: i32) -> Result<Self> {
        let offset = utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| WaitingTimeError::ConfigurationError {
                message: format!("UTC offset {} hours is out of range", utc_offset_hours),
            })?;
        Ok(Self { offset })
    }

    pub fn render<S: CatalogEntry>(&self, view: &JoinedWaitingView<S>) -> WaitingDisplay {
        let record = &view.record;
        let (waiting_count, estimated_minutes) = if record.status.is_closed() {
            (CLOSED_PLACEHOLDER.to_string(), CLOSED_PLACEHOLDER.to_string())
        } else {
            (
                record.waiting_count.to_string(),
                record.estimated_minutes.to_string(),
            )
        };

        WaitingDisplay {
            id: record.id.clone(),
            title: view.subject.name().into_owned(),
            subtitle: view.subject.description().into_owned(),
            waiting_count,
            estimated_minutes,
            status_label: record.status.label(),
            last_updated: self.clock(record.updated_at),
            updated_detail: self.detail(record.updated_at),
        }
    }

    pub fn render_all<S: CatalogEntry>(&self, views: &[JoinedWaitingView<S>]) -> Vec<WaitingDisplay> {
        views.iter().map(|view| self.render(view)).collect()
    }

    /// `H:MM` in local time
    pub fn clock(&self, at: Timestamp) -> String {
        let local = at.with_timezone(&self.offset);
        format!("{}:{:02}", local.hour(), local.minute())
    }

    /// `YYYY/M/D H:MM` in local time
    pub fn detail(&self, at: Timestamp) -> String {
        let local = at.with_timezone(&self.offset);
        format!(
            "{}/{}/{} {}:{:02}",
            local.year(),
            local.month(),
            local.day(),
            local.hour(),
            local.minute()
        )
    }

    /// Header text for the board's last refresh
    pub fn refreshed_label(&self, at: Option<Timestamp>) -> String {
        at.map(|at| self.clock(at))
            .unwrap_or_else(|| CLOSED_PLACEHOLDER.to_string())
    }
}

impl Default for DisplayFormatter {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::seed;
    use crate::store::join_records;
    use crate::types::{ConsultationRoom, Examination, RecordKind};

    fn exam_views() -> Vec<JoinedWaitingView<Examination>> {
        let catalog = Catalog::from_entries(seed::examinations()).unwrap();
        join_records(RecordKind::Examination, &seed::examination_records(), &catalog).0
    }

    #[test]
    fn test_open_entry_shows_numbers() {
        let display = DisplayFormatter::default().render(&exam_views()[0]);

        assert_eq!(display.title, "X-ray");
        assert_eq!(display.waiting_count, "3");
        assert_eq!(display.estimated_minutes, "15");
        assert_eq!(display.status_label, "Normal");
        // 09:30 UTC seen from UTC+9
        assert_eq!(display.last_updated, "18:30");
        assert_eq!(display.updated_detail, "2023/8/1 18:30");
    }

    #[test]
    fn test_closed_entry_hides_numbers() {
        let display = DisplayFormatter::default().render(&exam_views()[4]);

        assert_eq!(display.id, "wait-005");
        assert_eq!(display.waiting_count, "-");
        assert_eq!(display.estimated_minutes, "-");
        assert_eq!(display.status_label, "Closed");
    }

    #[test]
    fn test_utc_formatting_has_no_hour_padding() {
        let formatter = DisplayFormatter::new(0).unwrap();
        let views = exam_views();

        assert_eq!(formatter.clock(views[0].updated_at()), "9:30");
        assert_eq!(formatter.detail(views[0].updated_at()), "2023/8/1 9:30");
        assert_eq!(formatter.refreshed_label(None), "-");
    }

    #[test]
    fn test_room_rendering() {
        let catalog = Catalog::<ConsultationRoom>::from_entries(seed::consultation_rooms()).unwrap();
        let views = join_records(RecordKind::Room, &seed::room_records(), &catalog).0;

        let display = DisplayFormatter::default().render(&views[0]);
        assert_eq!(display.title, "Room 1");
        assert_eq!(display.subtitle, "Surgery, Dr. Ichiro Suzuki");
        assert_eq!(display.status_label, "Crowded");
    }

    #[test]
    fn test_offset_out_of_range() {
        assert!(DisplayFormatter::new(30).is_err());
        assert!(DisplayFormatter::new(1_000_000).is_err());
        assert!(DisplayFormatter::new(i32::MIN).is_err());
    }
}
