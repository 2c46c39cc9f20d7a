//! Catalog entry capability shared by examinations and rooms

use crate::error::{Result, WaitingTimeError};
use crate::types::{ConsultationRoom, Examination, RecordKind};
use std::borrow::Cow;

/// A reference entry that waiting records can be joined to
pub trait CatalogEntry: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Record collection this entry type belongs to
    const KIND: RecordKind;

    fn id(&self) -> &str;

    /// Name matched by search and shown as the row title
    fn name(&self) -> Cow<'_, str>;

    /// Secondary text matched by search
    fn description(&self) -> Cow<'_, str>;

    /// Reject entries the catalog manager should never accept
    fn validate(&self) -> Result<()>;
}

/// Resolve a record's subject id to its catalog entry
pub trait SubjectResolver<S> {
    fn resolve(&self, subject_id: &str) -> Option<&S>;

    /// Registration order of the subject, used to order joined views
    fn position(&self, subject_id: &str) -> Option<usize>;
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WaitingTimeError::validation(field, "must not be empty").into());
    }
    Ok(())
}

impl CatalogEntry for Examination {
    const KIND: RecordKind = RecordKind::Examination;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn description(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.description)
    }

    fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        require("name", &self.name)
    }
}

impl CatalogEntry for ConsultationRoom {
    const KIND: RecordKind = RecordKind::Room;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Owned(format!("Room {}", self.room_number))
    }

    fn description(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{}, Dr. {}", self.department, self.doctor_name))
    }

    fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        require("room_number", &self.room_number)?;
        require("doctor_name", &self.doctor_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Department;

    #[test]
    fn test_room_name_and_description() {
        let room = ConsultationRoom {
            id: "room-003".to_string(),
            room_number: "3".to_string(),
            department: Department::Internal,
            doctor_name: "Kenta Sato".to_string(),
        };
        assert_eq!(room.name(), "Room 3");
        assert_eq!(room.description(), "Internal Medicine, Dr. Kenta Sato");
        assert_eq!(<ConsultationRoom as CatalogEntry>::KIND, RecordKind::Room);
    }

    #[test]
    fn test_examination_validation() {
        let mut exam = Examination {
            id: "exam-010".to_string(),
            name: "Bone density".to_string(),
            description: String::new(),
            average_minutes: 20,
        };
        assert!(exam.validate().is_ok());

        exam.name = "  ".to_string();
        assert!(exam.validate().is_err());
    }
}
