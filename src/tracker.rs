//! Live tracker: where every student is right now, derived from today's latest scan.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::clock::SchoolClock;
use crate::models::{ScanAction, ScanEvent, Student};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudentStatus {
    OnBus,
    OnCampus,
    Unaccounted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusStatus {
    InTransit,
    Arrived,
    MissingScans,
}

const CAMPUS_MARKERS: [&str; 3] = ["classroom", "entrance", "cafeteria"];

fn is_bus_location(location: &str) -> bool {
    location.to_lowercase().contains("bus")
}

pub fn student_status(
    student_id: &str,
    scans: &[ScanEvent],
    clock: &SchoolClock,
    now: NaiveDateTime,
) -> StudentStatus {
    let today = clock.local_date(now);
    let latest = scans
        .iter()
        .filter(|e| e.student_id == student_id && clock.same_local_day(e.timestamp, today))
        .max_by_key(|e| e.timestamp);

    let Some(latest) = latest else {
        return StudentStatus::Unaccounted;
    };
    if latest.action == ScanAction::Out {
        return StudentStatus::Unaccounted;
    }

    let location = latest.location.to_lowercase();
    if location.contains("bus") {
        StudentStatus::OnBus
    } else if CAMPUS_MARKERS.iter().any(|m| location.contains(m)) {
        StudentStatus::OnCampus
    } else {
        StudentStatus::Unaccounted
    }
}

/// Any bus scan in the last 30 minutes means buses are moving.
pub fn bus_status(scans: &[ScanEvent], clock: &SchoolClock, now: NaiveDateTime) -> BusStatus {
    let today = clock.local_date(now);
    let mut any_today = false;
    for event in scans
        .iter()
        .filter(|e| is_bus_location(&e.location) && clock.same_local_day(e.timestamp, today))
    {
        if now - event.timestamp < Duration::minutes(30) {
            return BusStatus::InTransit;
        }
        any_today = true;
    }
    if any_today {
        BusStatus::Arrived
    } else {
        BusStatus::MissingScans
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TrackerBoard {
    pub on_bus: Vec<Student>,
    pub on_campus: Vec<Student>,
    pub unaccounted: Vec<Student>,
    pub bus_status: BusStatus,
}

pub fn live_board(
    students: &[Student],
    scans: &[ScanEvent],
    clock: &SchoolClock,
    now: NaiveDateTime,
    grade: Option<&str>,
) -> TrackerBoard {
    let mut board = TrackerBoard {
        on_bus: Vec::new(),
        on_campus: Vec::new(),
        unaccounted: Vec::new(),
        bus_status: bus_status(scans, clock, now),
    };

    for student in students
        .iter()
        .filter(|s| grade.map_or(true, |g| g == "all" || s.grade == g))
    {
        let bucket = match student_status(&student.id, scans, clock, now) {
            StudentStatus::OnBus => &mut board.on_bus,
            StudentStatus::OnCampus => &mut board.on_campus,
            StudentStatus::Unaccounted => &mut board.unaccounted,
        };
        bucket.push(student.clone());
    }

    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transportation;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn scan(student_id: &str, location: &str, action: ScanAction, ts: NaiveDateTime) -> ScanEvent {
        ScanEvent {
            id: Uuid::new_v4(),
            student_id: student_id.to_string(),
            location: location.to_string(),
            action,
            timestamp: ts,
            scanned_by: "Driver User".to_string(),
            notes: None,
        }
    }

    fn student(id: &str, grade: &str) -> Student {
        Student {
            id: id.to_string(),
            name: id.to_string(),
            grade: grade.to_string(),
            emergency_contact: String::new(),
            emergency_phone: String::new(),
            parent_email: None,
            parent_phone: None,
            allergies: vec![],
            medical_notes: String::new(),
            transportation: Transportation::Bus,
            bus_route: None,
            teacher_name: None,
            classroom_number: None,
            custom_fields: Default::default(),
        }
    }

    #[test]
    fn latest_scan_decides_status() {
        let clock = SchoolClock::default();
        let scans = vec![
            scan("S1", "Bus #1", ScanAction::In, at(7, 20)),
            scan("S1", "Classroom 101", ScanAction::In, at(8, 5)),
        ];
        assert_eq!(student_status("S1", &scans, &clock, at(9, 0)), StudentStatus::OnCampus);
        assert_eq!(student_status("S2", &scans, &clock, at(9, 0)), StudentStatus::Unaccounted);
    }

    #[test]
    fn checked_out_students_are_unaccounted() {
        let clock = SchoolClock::default();
        let scans = vec![
            scan("S1", "Bus #2", ScanAction::In, at(7, 20)),
            scan("S1", "Bus #2", ScanAction::Out, at(7, 55)),
        ];
        assert_eq!(student_status("S1", &scans, &clock, at(9, 0)), StudentStatus::Unaccounted);
    }

    #[test]
    fn bus_status_tracks_recent_activity() {
        let clock = SchoolClock::default();
        assert_eq!(bus_status(&[], &clock, at(7, 0)), BusStatus::MissingScans);
        let scans = vec![scan("S1", "Bus #1", ScanAction::In, at(7, 20))];
        assert_eq!(bus_status(&scans, &clock, at(7, 40)), BusStatus::InTransit);
        assert_eq!(bus_status(&scans, &clock, at(8, 0)), BusStatus::Arrived);
    }

    #[test]
    fn grade_filter_limits_the_board() {
        let clock = SchoolClock::default();
        let students = vec![student("S1", "K"), student("S2", "1st")];
        let scans = vec![scan("S1", "Bus #1", ScanAction::In, at(7, 20))];
        let board = live_board(&students, &scans, &clock, at(7, 30), Some("K"));
        assert_eq!(board.on_bus.len(), 1);
        assert!(board.unaccounted.is_empty());

        let all = live_board(&students, &scans, &clock, at(7, 30), Some("all"));
        assert_eq!(all.unaccounted.len(), 1);
    }
}
