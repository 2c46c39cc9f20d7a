//! Seed dataset for the examination and consultation-room boards
//!
//! Mirrors what the hospital's front desk starts the day with: six
//! examinations, six consultation rooms, one waiting record for each, and
//! the two staff accounts that maintain them.

use crate::types::{
    ConsultationRoom, Department, Examination, StaffRole, StaffUser, WaitingRecord, WaitingStatus,
};
use chrono::{TimeZone, Utc};

fn exam(id: &str, name: &str, description: &str, average_minutes: u32) -> Examination {
    Examination {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        average_minutes,
    }
}

fn room(id: &str, number: &str, department: Department, doctor: &str) -> ConsultationRoom {
    ConsultationRoom {
        id: id.to_string(),
        room_number: number.to_string(),
        department,
        doctor_name: doctor.to_string(),
    }
}

fn record(
    id: &str,
    subject_id: &str,
    waiting_count: u32,
    estimated_minutes: u32,
    status: WaitingStatus,
    last_updated_by: &str,
    (hour, minute): (u32, u32),
) -> WaitingRecord {
    WaitingRecord {
        id: id.to_string(),
        subject_id: subject_id.to_string(),
        waiting_count,
        estimated_minutes,
        status,
        last_updated_by: last_updated_by.to_string(),
        updated_at: Utc
            .with_ymd_and_hms(2023, 8, 1, hour, minute, 0)
            .single()
            .unwrap_or_default(),
    }
}

/// Examinations in registration order
pub fn examinations() -> Vec<Examination> {
    vec![
        exam("exam-001", "X-ray", "Chest and abdominal radiography", 15),
        exam("exam-002", "CT scan", "Whole-body CT scan", 30),
        exam("exam-003", "MRI", "Detailed imaging of the brain and spine", 45),
        exam("exam-004", "Ultrasound", "Abdominal and cardiac ultrasound", 20),
        exam("exam-005", "Blood test", "Routine blood panel", 10),
        exam(
            "exam-006",
            "Endoscopy",
            "Endoscopic examination of the stomach and colon",
            40,
        ),
    ]
}

/// Waiting records for [`examinations`]
pub fn examination_records() -> Vec<WaitingRecord> {
    use WaitingStatus::*;
    vec![
        record("wait-001", "exam-001", 3, 15, Normal, "user-001", (9, 30)),
        record("wait-002", "exam-002", 8, 60, Crowded, "user-001", (9, 45)),
        record("wait-003", "exam-003", 5, 90, Crowded, "user-002", (10, 15)),
        record("wait-004", "exam-004", 2, 10, Normal, "user-002", (10, 30)),
        record("wait-005", "exam-005", 0, 0, Closed, "user-001", (11, 0)),
        record("wait-006", "exam-006", 4, 45, Normal, "user-002", (10, 45)),
    ]
}

/// Consultation rooms in registration order
pub fn consultation_rooms() -> Vec<ConsultationRoom> {
    use Department::*;
    vec![
        room("room-001", "1", Surgical, "Ichiro Suzuki"),
        room("room-002", "2", Surgical, "Sachiko Tanaka"),
        room("room-003", "3", Internal, "Kenta Sato"),
        room("room-004", "4", Internal, "Mika Takahashi"),
        room("room-005", "5", Internal, "Yoichi Ito"),
        room("room-006", "6", Internal, "Kazuko Yamamoto"),
    ]
}

/// Waiting records for [`consultation_rooms`]
pub fn room_records() -> Vec<WaitingRecord> {
    use WaitingStatus::*;
    vec![
        record("consult-001", "room-001", 5, 25, Crowded, "user-001", (9, 30)),
        record("consult-002", "room-002", 3, 15, Normal, "user-001", (9, 45)),
        record("consult-003", "room-003", 7, 35, Crowded, "user-002", (10, 15)),
        record("consult-004", "room-004", 4, 20, Normal, "user-002", (10, 30)),
        record("consult-005", "room-005", 6, 30, Crowded, "user-001", (11, 0)),
        record("consult-006", "room-006", 2, 10, Normal, "user-002", (10, 45)),
    ]
}

pub fn staff_users() -> Vec<StaffUser> {
    vec![
        StaffUser {
            id: "user-001".to_string(),
            email: "admin@hospital.example.com".to_string(),
            name: "Administrator".to_string(),
            role: StaffRole::Admin,
        },
        StaffUser {
            id: "user-002".to_string(),
            email: "staff@hospital.example.com".to_string(),
            name: "Staff".to_string(),
            role: StaffRole::Staff,
        },
    ]
}
