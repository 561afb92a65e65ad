use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};

use crate::config::Config;
use crate::settings::AlertThresholds;

/// School-local view of time plus the cutoffs every attendance rule is measured against.
///
/// Scan timestamps are stored in UTC; all "same day" and "past cutoff" checks happen
/// after shifting into the school's offset.
#[derive(Clone, Debug, PartialEq)]
pub struct SchoolClock {
    pub offset: FixedOffset,
    /// After this time a student with no scan at all is reported missing.
    pub school_start: NaiveTime,
    /// A first check-in after this time counts as late.
    pub late_cutoff: NaiveTime,
    /// After this time a student without a morning check-in is unscanned.
    pub morning_cutoff: NaiveTime,
    /// After this time a student without an afternoon check-out is unscanned.
    pub afternoon_cutoff: NaiveTime,
}

impl Default for SchoolClock {
    fn default() -> Self {
        Self::from_parts(
            Utc.fix(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default(),
            &AlertThresholds::default(),
        )
    }
}

impl SchoolClock {
    pub fn new(config: &Config, thresholds: &AlertThresholds) -> Self {
        Self::from_parts(
            config.utc_offset,
            config.school_start,
            config.afternoon_cutoff,
            thresholds,
        )
    }

    pub fn from_parts(
        offset: FixedOffset,
        school_start: NaiveTime,
        afternoon_cutoff: NaiveTime,
        thresholds: &AlertThresholds,
    ) -> Self {
        Self {
            offset,
            school_start,
            late_cutoff: school_start + Duration::minutes(thresholds.late_arrival_minutes as i64),
            morning_cutoff: school_start + Duration::minutes(thresholds.unscanned_minutes as i64),
            afternoon_cutoff,
        }
    }

    pub fn local(&self, utc: NaiveDateTime) -> NaiveDateTime {
        utc + Duration::seconds(self.offset.local_minus_utc() as i64)
    }

    pub fn local_date(&self, utc: NaiveDateTime) -> NaiveDate {
        self.local(utc).date()
    }

    pub fn same_local_day(&self, utc: NaiveDateTime, day: NaiveDate) -> bool {
        self.local_date(utc) == day
    }
}
