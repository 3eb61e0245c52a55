use crate::db::models::AttendancePoint;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// Attendance series cut into the windows the dashboard charts
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceWindows {
    /// Last hour
    pub attendance_data: Vec<AttendancePoint>,
    /// One to two hours ago
    pub old_attendance_data: Vec<AttendancePoint>,
    pub all_attendance_data: Vec<AttendancePoint>,
    /// Two to three hours ago
    pub chart_data: Vec<AttendancePoint>,
}

/// Split a minute series around `now` (UTC wall clock).
///
/// Buckets at or after `now` are dropped everywhere. Window starts are
/// inclusive and ends exclusive.
pub fn split_windows(series: Vec<AttendancePoint>, now: NaiveDateTime) -> AttendanceWindows {
    let one_hour_ago = now - Duration::hours(1);
    let two_hours_ago = now - Duration::hours(2);
    let three_hours_ago = now - Duration::hours(3);

    let all: Vec<AttendancePoint> = series.into_iter().filter(|p| p.minute < now).collect();

    let within = |start: NaiveDateTime, end: NaiveDateTime| -> Vec<AttendancePoint> {
        all.iter()
            .filter(|p| p.minute >= start && p.minute < end)
            .cloned()
            .collect()
    };

    AttendanceWindows {
        attendance_data: within(one_hour_ago, now),
        old_attendance_data: within(two_hours_ago, one_hour_ago),
        chart_data: within(three_hours_ago, two_hours_ago),
        all_attendance_data: all.clone(),
    }
}
