//! Attendance reporting. Single-pass aggregations over already-fetched collections.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::clock::SchoolClock;
use crate::models::{ScanAction, ScanEvent, Student};

pub const TREND_DAYS: i64 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Missing,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct GradeStats {
    pub total: usize,
    pub present: usize,
    pub late: usize,
    pub missing: usize,
}

impl GradeStats {
    fn add(&mut self, status: AttendanceStatus) {
        self.total += 1;
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Missing => self.missing += 1,
        }
    }

    /// `(present + late) / total` as a percentage, 0 for an empty group.
    pub fn attendance_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.present + self.late) as f64 / self.total as f64 * 100.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttendanceReport {
    pub date: NaiveDate,
    pub grades: BTreeMap<String, GradeStats>,
    pub totals: GradeStats,
    pub attendance_rate: f64,
}

/// Present, late (first scan of the day after the late cutoff) or missing on `date`.
pub fn attendance_status(
    student_id: &str,
    day_scans: &[&ScanEvent],
    clock: &SchoolClock,
) -> AttendanceStatus {
    let first = day_scans
        .iter()
        .filter(|e| e.student_id == student_id)
        .map(|e| e.timestamp)
        .min();
    match first {
        None => AttendanceStatus::Missing,
        Some(ts) if clock.local(ts).time() > clock.late_cutoff => AttendanceStatus::Late,
        Some(_) => AttendanceStatus::Present,
    }
}

pub fn attendance_report(
    students: &[Student],
    scans: &[ScanEvent],
    clock: &SchoolClock,
    date: NaiveDate,
) -> AttendanceReport {
    let day_scans: Vec<&ScanEvent> = scans
        .iter()
        .filter(|e| clock.same_local_day(e.timestamp, date))
        .collect();

    let mut grades: BTreeMap<String, GradeStats> = BTreeMap::new();
    let mut totals = GradeStats::default();
    for student in students {
        let status = attendance_status(&student.id, &day_scans, clock);
        grades.entry(student.grade.clone()).or_default().add(status);
        totals.add(status);
    }

    AttendanceReport {
        date,
        attendance_rate: totals.attendance_rate(),
        grades,
        totals,
    }
}

pub fn attendance_csv(report: &AttendanceReport) -> String {
    let mut out = String::from("Grade,Total,Present,Late,Missing,Attendance Rate\n");
    for (grade, stats) in &report.grades {
        out.push_str(&format!(
            "{},{},{},{},{},{:.1}%\n",
            grade,
            stats.total,
            stats.present,
            stats.late,
            stats.missing,
            stats.attendance_rate()
        ));
    }
    out
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub scans: usize,
    pub unique_students: usize,
}

/// Scan counts for the `TREND_DAYS` days ending at `end`, oldest first.
pub fn daily_totals(scans: &[ScanEvent], clock: &SchoolClock, end: NaiveDate) -> Vec<DailyTotal> {
    let start = end - Duration::days(TREND_DAYS - 1);
    let mut per_day: HashMap<NaiveDate, (usize, HashSet<&str>)> = HashMap::new();
    for event in scans {
        let day = clock.local_date(event.timestamp);
        if day < start || day > end {
            continue;
        }
        let entry = per_day.entry(day).or_default();
        entry.0 += 1;
        entry.1.insert(event.student_id.as_str());
    }

    (0..TREND_DAYS)
        .map(|offset| {
            let date = start + Duration::days(offset);
            let (count, unique) = per_day
                .get(&date)
                .map(|(c, u)| (*c, u.len()))
                .unwrap_or((0, 0));
            DailyTotal {
                date,
                scans: count,
                unique_students: unique,
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MissedDays {
    pub student_id: String,
    pub name: String,
    pub grade: String,
    pub missed_days: i64,
    pub attendance_rate: f64,
}

/// Students ranked by days without any scan in the trend window, worst first.
pub fn missed_days_ranking(
    students: &[Student],
    scans: &[ScanEvent],
    clock: &SchoolClock,
    end: NaiveDate,
) -> Vec<MissedDays> {
    let start = end - Duration::days(TREND_DAYS - 1);
    let mut days_seen: HashMap<&str, BTreeSet<NaiveDate>> = HashMap::new();
    for event in scans {
        let day = clock.local_date(event.timestamp);
        if day >= start && day <= end {
            days_seen
                .entry(event.student_id.as_str())
                .or_default()
                .insert(day);
        }
    }

    let mut ranking: Vec<MissedDays> = students
        .iter()
        .map(|s| {
            let present = days_seen.get(s.id.as_str()).map_or(0, |d| d.len()) as i64;
            MissedDays {
                student_id: s.id.clone(),
                name: s.name.clone(),
                grade: s.grade.clone(),
                missed_days: TREND_DAYS - present,
                attendance_rate: present as f64 / TREND_DAYS as f64 * 100.0,
            }
        })
        .collect();
    ranking.sort_by(|a, b| b.missed_days.cmp(&a.missed_days));
    ranking
}

/// Per grade, the number of student-days whose first check-in came after the late cutoff.
pub fn late_arrivals_by_grade(
    students: &[Student],
    scans: &[ScanEvent],
    clock: &SchoolClock,
) -> BTreeMap<String, usize> {
    let mut first_in: HashMap<(&str, NaiveDate), chrono::NaiveTime> = HashMap::new();
    for event in scans.iter().filter(|e| e.action == ScanAction::In) {
        let local = clock.local(event.timestamp);
        first_in
            .entry((event.student_id.as_str(), local.date()))
            .and_modify(|t| {
                if local.time() < *t {
                    *t = local.time();
                }
            })
            .or_insert(local.time());
    }

    let grade_of: HashMap<&str, &str> = students
        .iter()
        .map(|s| (s.id.as_str(), s.grade.as_str()))
        .collect();

    let mut late: BTreeMap<String, usize> = students
        .iter()
        .map(|s| (s.grade.clone(), 0))
        .collect();
    for ((student_id, _), time) in first_in {
        if time <= clock.late_cutoff {
            continue;
        }
        if let Some(grade) = grade_of.get(student_id) {
            *late.entry(grade.to_string()).or_default() += 1;
        }
    }
    late
}

/// Share of the roster with at least one scan on record.
pub fn overall_attendance_rate(students: &[Student], scans: &[ScanEvent]) -> f64 {
    if students.is_empty() {
        return 0.0;
    }
    let scanned: HashSet<&str> = scans.iter().map(|e| e.student_id.as_str()).collect();
    let present = students
        .iter()
        .filter(|s| scanned.contains(s.id.as_str()))
        .count();
    present as f64 / students.len() as f64 * 100.0
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Analytics {
    pub daily_totals: Vec<DailyTotal>,
    pub total_scans: usize,
    pub avg_scans_per_day: f64,
    pub late_arrivals_by_grade: BTreeMap<String, usize>,
    pub missed_days: Vec<MissedDays>,
    pub overall_attendance_rate: f64,
}

pub fn analytics(
    students: &[Student],
    scans: &[ScanEvent],
    clock: &SchoolClock,
    end: NaiveDate,
) -> Analytics {
    let daily = daily_totals(scans, clock, end);
    let total_scans: usize = daily.iter().map(|d| d.scans).sum();
    Analytics {
        total_scans,
        avg_scans_per_day: total_scans as f64 / TREND_DAYS as f64,
        daily_totals: daily,
        late_arrivals_by_grade: late_arrivals_by_grade(students, scans, clock),
        missed_days: missed_days_ranking(students, scans, clock, end),
        overall_attendance_rate: overall_attendance_rate(students, scans),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySort {
    #[default]
    Timestamp,
    StudentName,
    Location,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: HistorySort,
    #[serde(default)]
    pub dir: SortDirection,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryRow {
    #[serde(flatten)]
    pub event: ScanEvent,
    pub student_name: String,
    pub grade: String,
}

/// Scan log for one day, filtered by a case-insensitive search over student name,
/// location and scanner, then sorted.
pub fn scan_history(
    students: &[Student],
    scans: &[ScanEvent],
    clock: &SchoolClock,
    date: NaiveDate,
    query: &HistoryQuery,
) -> Vec<HistoryRow> {
    let by_id: HashMap<&str, &Student> = students.iter().map(|s| (s.id.as_str(), s)).collect();
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();

    let mut rows: Vec<HistoryRow> = scans
        .iter()
        .filter(|e| clock.same_local_day(e.timestamp, date))
        .map(|e| {
            let student = by_id.get(e.student_id.as_str());
            HistoryRow {
                event: e.clone(),
                student_name: student.map_or_else(|| "Unknown Student".to_string(), |s| s.name.clone()),
                grade: student.map(|s| s.grade.clone()).unwrap_or_default(),
            }
        })
        .filter(|row| {
            needle.is_empty()
                || row.student_name.to_lowercase().contains(&needle)
                || row.event.location.to_lowercase().contains(&needle)
                || row.event.scanned_by.to_lowercase().contains(&needle)
        })
        .collect();

    rows.sort_by(|a, b| {
        let ord = match query.sort {
            HistorySort::Timestamp => a.event.timestamp.cmp(&b.event.timestamp),
            HistorySort::StudentName => a.student_name.cmp(&b.student_name),
            HistorySort::Location => a.event.location.cmp(&b.event.location),
        };
        match query.dir {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    rows
}

pub fn history_csv(rows: &[HistoryRow], clock: &SchoolClock) -> String {
    let mut out = String::from("Timestamp,Student,Grade,Location,Action,Scanned By\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            clock.local(row.event.timestamp).format("%Y-%m-%d %H:%M:%S"),
            row.student_name,
            row.grade,
            row.event.location,
            row.event.action.as_str(),
            row.event.scanned_by
        ));
    }
    out
}
