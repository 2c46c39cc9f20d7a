//! Common types used throughout the waiting-time board

use crate::error::{Result, WaitingTimeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identifier of a waiting record (`wait-001`, `consult-003`, ...)
pub type RecordId = String;

/// Identifier of a reference catalog entry (`exam-001`, `room-002`, ...)
pub type SubjectId = String;

/// Store-assigned mutation time
pub type Timestamp = DateTime<Utc>;

/// Which of the two record collections an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Examination,
    Room,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Examination, RecordKind::Room];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Examination => "examination",
            RecordKind::Room => "room",
        }
    }

    /// Prefix used when the store derives a record id for a new subject
    pub fn record_prefix(&self) -> &'static str {
        match self {
            RecordKind::Examination => "wait",
            RecordKind::Room => "consult",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = WaitingTimeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "examination" | "exam" => Ok(RecordKind::Examination),
            "room" | "consultation" => Ok(RecordKind::Room),
            other => Err(WaitingTimeError::validation(
                "kind",
                format!("unknown record kind '{}'", other),
            )),
        }
    }
}

/// Congestion status of an examination or room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitingStatus {
    Normal,
    Crowded,
    Closed,
}

impl WaitingStatus {
    pub const ALL: [WaitingStatus; 3] = [
        WaitingStatus::Normal,
        WaitingStatus::Crowded,
        WaitingStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WaitingStatus::Normal => "normal",
            WaitingStatus::Crowded => "crowded",
            WaitingStatus::Closed => "closed",
        }
    }

    /// Badge text shown next to a row
    pub fn label(&self) -> &'static str {
        match self {
            WaitingStatus::Normal => "Normal",
            WaitingStatus::Crowded => "Crowded",
            WaitingStatus::Closed => "Closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, WaitingStatus::Closed)
    }
}

impl std::fmt::Display for WaitingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaitingStatus {
    type Err = WaitingTimeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "normal" => Ok(WaitingStatus::Normal),
            "crowded" => Ok(WaitingStatus::Crowded),
            "closed" => Ok(WaitingStatus::Closed),
            other => Err(WaitingTimeError::validation(
                "status",
                format!("'{}' is not one of normal, crowded, closed", other),
            )),
        }
    }
}

/// Clinical department a consultation room belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Internal,
    Surgical,
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Department::Internal => write!(f, "Internal Medicine"),
            Department::Surgical => write!(f, "Surgery"),
        }
    }
}

/// Examination reference entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Examination {
    pub id: SubjectId,
    pub name: String,
    pub description: String,
    /// Average time the examination itself takes, in minutes
    pub average_minutes: u32,
}

/// Consultation room reference entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationRoom {
    pub id: SubjectId,
    pub room_number: String,
    pub department: Department,
    pub doctor_name: String,
}

/// Staff member who edits waiting times
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: StaffRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Admin,
    Staff,
}

/// Current waiting state of one examination or room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingRecord {
    pub id: RecordId,
    /// Examination id or room id this record belongs to
    pub subject_id: SubjectId,
    pub waiting_count: u32,
    pub estimated_minutes: u32,
    pub status: WaitingStatus,
    pub last_updated_by: String,
    pub updated_at: Timestamp,
}

impl WaitingRecord {
    /// Default record created when a subject is added to the catalog
    pub fn placeholder(id: RecordId, subject_id: SubjectId, updated_at: Timestamp) -> Self {
        Self {
            id,
            subject_id,
            waiting_count: 0,
            estimated_minutes: 0,
            status: WaitingStatus::Normal,
            last_updated_by: "system".to_string(),
            updated_at,
        }
    }

    /// Compare everything except the store-assigned timestamp
    pub fn same_content(&self, other: &WaitingRecord) -> bool {
        self.id == other.id
            && self.subject_id == other.subject_id
            && self.waiting_count == other.waiting_count
            && self.estimated_minutes == other.estimated_minutes
            && self.status == other.status
            && self.last_updated_by == other.last_updated_by
    }
}

/// Partial edit submitted by staff, as received from the edit form.
///
/// Numbers are signed so negative input reaches validation instead of being
/// silently clamped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingUpdate {
    pub waiting_count: Option<i64>,
    pub estimated_minutes: Option<i64>,
    pub status: Option<String>,
    pub updated_by: Option<String>,
}

impl WaitingUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waiting_count(mut self, count: i64) -> Self {
        self.waiting_count = Some(count);
        self
    }

    pub fn estimated_minutes(mut self, minutes: i64) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    pub fn status(mut self, status: WaitingStatus) -> Self {
        self.status = Some(status.as_str().to_string());
        self
    }

    pub fn updated_by(mut self, staff_id: impl Into<String>) -> Self {
        self.updated_by = Some(staff_id.into());
        self
    }

    /// Build an update from raw form text; blank fields are left unset
    pub fn from_form(
        waiting_count: Option<&str>,
        estimated_minutes: Option<&str>,
        status: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            waiting_count: parse_form_number("waiting_count", waiting_count)?,
            estimated_minutes: parse_form_number("estimated_minutes", estimated_minutes)?,
            status: status
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            updated_by: None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.waiting_count.is_none() && self.estimated_minutes.is_none() && self.status.is_none()
    }

    /// Check ranges and enum values without touching any record
    pub fn validate(&self) -> Result<ValidatedUpdate> {
        Ok(ValidatedUpdate {
            waiting_count: self
                .waiting_count
                .map(|v| non_negative("waiting_count", v))
                .transpose()?,
            estimated_minutes: self
                .estimated_minutes
                .map(|v| non_negative("estimated_minutes", v))
                .transpose()?,
            status: self
                .status
                .as_deref()
                .map(WaitingStatus::from_str)
                .transpose()?,
            updated_by: self.updated_by.clone(),
        })
    }
}

fn parse_form_number(field: &str, raw: Option<&str>) -> Result<Option<i64>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) => text.parse::<i64>().map(Some).map_err(|_| {
            WaitingTimeError::validation(field, format!("'{}' is not an integer", text)).into()
        }),
    }
}

fn non_negative(field: &str, value: i64) -> Result<u32> {
    if value < 0 {
        return Err(WaitingTimeError::validation(field, format!("{} is negative", value)).into());
    }
    u32::try_from(value)
        .map_err(|_| WaitingTimeError::validation(field, format!("{} is too large", value)).into())
}

/// An update that passed validation and can be merged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedUpdate {
    pub waiting_count: Option<u32>,
    pub estimated_minutes: Option<u32>,
    pub status: Option<WaitingStatus>,
    pub updated_by: Option<String>,
}

impl ValidatedUpdate {
    /// Overwrite exactly the fields that are set
    pub fn apply_to(&self, record: &mut WaitingRecord) {
        if let Some(count) = self.waiting_count {
            record.waiting_count = count;
        }
        if let Some(minutes) = self.estimated_minutes {
            record.estimated_minutes = minutes;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(staff) = &self.updated_by {
            record.last_updated_by = staff.clone();
        }
    }
}

/// A waiting record joined with its reference entry, for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedWaitingView<S> {
    pub record: WaitingRecord,
    pub subject: S,
}

impl<S> JoinedWaitingView<S> {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn status(&self) -> WaitingStatus {
        self.record.status
    }

    pub fn waiting_count(&self) -> u32 {
        self.record.waiting_count
    }

    pub fn estimated_minutes(&self) -> u32 {
        self.record.estimated_minutes
    }

    pub fn updated_at(&self) -> Timestamp {
        self.record.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;

    fn record() -> WaitingRecord {
        WaitingRecord {
            id: "wait-001".to_string(),
            subject_id: "exam-001".to_string(),
            waiting_count: 3,
            estimated_minutes: 15,
            status: WaitingStatus::Normal,
            last_updated_by: "user-001".to_string(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("crowded".parse::<WaitingStatus>().unwrap(), WaitingStatus::Crowded);
        assert!("busy".parse::<WaitingStatus>().is_err());
        // Status values are exact wire strings
        assert!("Closed".parse::<WaitingStatus>().is_err());
    }

    #[test]
    fn test_record_kind_parsing_and_display() {
        assert_eq!("exam".parse::<RecordKind>().unwrap(), RecordKind::Examination);
        assert_eq!(" Room ".parse::<RecordKind>().unwrap(), RecordKind::Room);
        assert_eq!(RecordKind::Room.to_string(), "room");
        assert_eq!(RecordKind::Examination.record_prefix(), "wait");
    }

    #[test]
    fn test_validate_rejects_negative_numbers() {
        let err = WaitingUpdate::new().waiting_count(-1).validate().unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(WaitingTimeError::Validation { field, .. }) if field == "waiting_count"
        ));

        let err = WaitingUpdate::new()
            .estimated_minutes(-30)
            .validate()
            .unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(WaitingTimeError::Validation { field, .. }) if field == "estimated_minutes"
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_status() {
        let update = WaitingUpdate {
            status: Some("paused".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overflow() {
        let update = WaitingUpdate::new().waiting_count(i64::from(u32::MAX) + 1);
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_from_form_parses_and_rejects_text() {
        let update = WaitingUpdate::from_form(Some(" 4 "), Some(""), Some("crowded")).unwrap();
        assert_eq!(update.waiting_count, Some(4));
        assert_eq!(update.estimated_minutes, None);
        assert_eq!(update.status.as_deref(), Some("crowded"));

        let err = WaitingUpdate::from_form(Some("four"), None, None).unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(WaitingTimeError::Validation { .. })
        ));
    }

    #[test]
    fn test_apply_overwrites_only_given_fields() {
        let mut target = record();
        let validated = WaitingUpdate::new()
            .status(WaitingStatus::Closed)
            .validate()
            .unwrap();
        validated.apply_to(&mut target);

        assert_eq!(target.status, WaitingStatus::Closed);
        assert_eq!(target.waiting_count, 3);
        assert_eq!(target.estimated_minutes, 15);
        assert_eq!(target.last_updated_by, "user-001");
    }

    #[test]
    fn test_updated_by_is_recorded() {
        let mut target = record();
        WaitingUpdate::new()
            .waiting_count(0)
            .updated_by("user-002")
            .validate()
            .unwrap()
            .apply_to(&mut target);
        assert_eq!(target.last_updated_by, "user-002");
        assert_eq!(target.waiting_count, 0);
    }
}
