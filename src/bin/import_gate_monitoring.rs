use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use serde_json::Value;
use stadium_monitor::config::DatabaseConfig;
use stadium_monitor::db::models::NewGateMonitoring;
use stadium_monitor::db::repositories::GateMonitoringRepository;
use stadium_monitor::db::DatabaseService;
use std::path::PathBuf;
use std::sync::Arc;

/// Import exported gate counter snapshots into `gate_monitoring`
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON file holding an array of records
    file: PathBuf,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

/// Parse every record that carries usable counters, skipping the rest
fn parse_records(data: &str) -> Result<Vec<NewGateMonitoring>> {
    let json: Value = serde_json::from_str(data).context("Failed to parse JSON file")?;
    let Value::Array(items) = json else {
        bail!("JSON data is not an array.");
    };

    let mut records = Vec::with_capacity(items.len());
    for item in &items {
        match NewGateMonitoring::from_json(item) {
            Some(record) => records.push(record),
            None => warn!("Skipping record due to invalid counters: {}", item),
        }
    }

    Ok(records)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let data = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let records = parse_records(&data)?;
    info!("Parsed {} gate monitoring records", records.len());

    let database = DatabaseService::new(&DatabaseConfig {
        url: args.database_url,
        auto_migrate: false,
        ..DatabaseConfig::default()
    })
    .await?;

    let repo = GateMonitoringRepository::new(Arc::clone(&database.pool));
    let inserted = repo.insert_many(&records).await?;

    info!("Data inserted successfully ({} new rows)", inserted);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records_skips_invalid() {
        let data = r#"[
            {"cameraId": "gate-1", "timestamp": "2025-04-12T18:30:00", "uniqueCount": 12, "jerseyYellow": "4"},
            {"camera_id": "gate-2", "timestamp": "2025-04-12T18:31:00", "unique_count": "x"},
            {"camera_id": "gate-2", "timestamp": "2025-04-12T18:31:00", "unique_count": 3, "jersey_blue": "blue"}
        ]"#;

        let records = parse_records(data).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].camera_id, "gate-1");
        assert_eq!(records[0].jersey_yellow, 4);
        assert_eq!(records[0].jersey_blue, 0);
    }

    #[test]
    fn test_parse_records_requires_array() {
        assert!(parse_records(r#"{"cameraId": "gate-1"}"#).is_err());
        assert!(parse_records("not json").is_err());
    }
}
