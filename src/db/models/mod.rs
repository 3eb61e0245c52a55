pub mod alert_models;
pub mod analytics_models;
pub mod camera_models;
pub mod gate_models;
pub mod tweet_models;
pub mod user_models;

pub use alert_models::{AlertDbId, LoiteringAlertRow, PoliceAlertRow, SearchAlertRow};
pub use analytics_models::{AnalyticsSnapshot, Anomaly};
pub use camera_models::{Camera, NewCamera};
pub use gate_models::{AttendancePoint, CameraData, MinuteGroupedData, NewGateMonitoring};
pub use tweet_models::{PlayerStatRow, Sentiment, SentimentStats, Tweet, TweetCategory};
pub use user_models::{Account, AuthToken, Session, SignInCredentials, SignUpRequest, User};
