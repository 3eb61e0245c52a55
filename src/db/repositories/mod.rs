use sqlx::PgPool;
use std::sync::Arc;

pub mod alerts;
pub mod analytics;
pub mod cameras;
pub mod gate_monitoring;
pub mod sessions;
pub mod tweets;
pub mod users;

pub use alerts::{AlertsRepository, NotifiableTable};
pub use analytics::{AnalyticsRepository, AnomaliesRepository};
pub use cameras::CamerasRepository;
pub use gate_monitoring::GateMonitoringRepository;
pub use sessions::SessionsRepository;
pub use tweets::{SocialSnapshot, TweetsRepository};
pub use users::UsersRepository;

/// Every repository over one shared pool
#[derive(Clone)]
pub struct Repositories {
    pub alerts: AlertsRepository,
    pub analytics: AnalyticsRepository,
    pub anomalies: AnomaliesRepository,
    pub cameras: CamerasRepository,
    pub gate_monitoring: GateMonitoringRepository,
    pub sessions: SessionsRepository,
    pub tweets: TweetsRepository,
    pub users: UsersRepository,
}

impl Repositories {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            alerts: AlertsRepository::new(pool.clone()),
            analytics: AnalyticsRepository::new(pool.clone()),
            anomalies: AnomaliesRepository::new(pool.clone()),
            cameras: CamerasRepository::new(pool.clone()),
            gate_monitoring: GateMonitoringRepository::new(pool.clone()),
            sessions: SessionsRepository::new(pool.clone()),
            tweets: TweetsRepository::new(pool.clone()),
            users: UsersRepository::new(pool),
        }
    }
}
