pub mod attendance;
pub mod social;

pub use attendance::{split_windows, AttendanceWindows};
pub use social::{build_summary, SocialSummary};
