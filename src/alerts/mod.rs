//! Alert aggregation for the dashboard.
//!
//! Search notifications, loitering events and police monitoring events are
//! grouped into the categories of the alert catalog. Each group also carries
//! the ids of rows the operator has not been notified about yet, so the UI
//! can acknowledge them afterwards.

use crate::db::models::{AlertDbId, LoiteringAlertRow, PoliceAlertRow, SearchAlertRow};
use crate::db::repositories::{AlertsRepository, NotifiableTable};
use crate::error::Error;
use anyhow::Result;
use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

pub mod catalog;

pub use catalog::{AlertCategory, ALERT_CATALOG};

/// A single alert row of any source
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum AlertDetail {
    Search(SearchAlertRow),
    Loitering(LoiteringAlertRow),
    Police(PoliceAlertRow),
}

/// Alerts of one catalog category
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertGroup {
    pub id: &'static str,
    pub count: usize,
    pub details: Vec<AlertDetail>,
    /// Un-notified row ids; absent for categories with no backing table yet
    #[serde(rename = "dbIds", skip_serializing_if = "Option::is_none")]
    pub db_ids: Option<Vec<AlertDbId>>,
}

impl AlertGroup {
    fn empty(id: &'static str) -> Self {
        Self {
            id,
            count: 0,
            details: Vec::new(),
            db_ids: None,
        }
    }
}

/// Group alert rows into the catalog categories.
///
/// Search hits are de-duplicated by result id (first occurrence wins) for
/// the counts and details, while the un-notified ids come from every row.
pub fn aggregate(
    search_rows: &[SearchAlertRow],
    loitering_rows: Vec<LoiteringAlertRow>,
    police_rows: Vec<PoliceAlertRow>,
) -> Vec<AlertGroup> {
    let unique = unique_by_result_id(search_rows);

    let banners = search_group(catalog::BANNERS_SLOGANS, catalog::BANNER_KEYWORDS, &unique, search_rows);
    let animals = search_group(catalog::ANIMALS, catalog::ANIMAL_KEYWORDS, &unique, search_rows);

    let loitering_ids = loitering_rows
        .iter()
        .filter(|row| !row.is_notified)
        .map(|row| AlertDbId::from(row.id))
        .collect();
    let loitering = AlertGroup {
        id: catalog::LOITERING,
        count: loitering_rows.len(),
        details: loitering_rows.into_iter().map(AlertDetail::Loitering).collect(),
        db_ids: Some(loitering_ids),
    };

    let police_ids = police_rows
        .iter()
        .filter(|row| !row.is_notified)
        .map(|row| AlertDbId::from(row.id))
        .collect();
    let police = AlertGroup {
        id: catalog::MISSING_POLICE,
        count: police_rows.len(),
        details: police_rows.into_iter().map(AlertDetail::Police).collect(),
        db_ids: Some(police_ids),
    };

    let mut groups = vec![banners, animals, loitering, police];
    for category in ALERT_CATALOG {
        if !groups.iter().any(|group| group.id == category.id) {
            groups.push(AlertGroup::empty(category.id));
        }
    }

    groups
}

fn unique_by_result_id(rows: &[SearchAlertRow]) -> Vec<&SearchAlertRow> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| seen.insert(row.res_id.as_deref()))
        .collect()
}

fn matches(row: &SearchAlertRow, keywords: &[&str]) -> bool {
    row.query
        .as_deref()
        .map_or(false, |query| keywords.contains(&query))
}

fn search_group(
    id: &'static str,
    keywords: &[&str],
    unique: &[&SearchAlertRow],
    all_rows: &[SearchAlertRow],
) -> AlertGroup {
    let details: Vec<AlertDetail> = unique
        .iter()
        .filter(|row| matches(row, keywords))
        .map(|row| AlertDetail::Search((*row).clone()))
        .collect();

    let db_ids = all_rows
        .iter()
        .filter(|row| matches(row, keywords) && !row.is_notified)
        .map(|row| AlertDbId::Text(row.id.clone()))
        .collect();

    AlertGroup {
        id,
        count: details.len(),
        details,
        db_ids: Some(db_ids),
    }
}

/// Table that stores the rows of an alert category
pub fn table_for_category(category: &str) -> Option<NotifiableTable> {
    match category {
        catalog::LOITERING => Some(NotifiableTable::Loitering),
        catalog::MISSING_POLICE => Some(NotifiableTable::PoliceMonitoring),
        other if catalog::find(other).is_some() => Some(NotifiableTable::AlertNotifications),
        _ => None,
    }
}

/// Updates derived from a `{category: [ids]}` acknowledgement
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationUpdate {
    pub category: String,
    pub table: NotifiableTable,
    pub ids: Vec<AlertDbId>,
}

/// Turn an acknowledgement body into table updates.
///
/// Empty lists and unknown categories are skipped. Anything that is not a
/// JSON object is rejected.
pub fn plan_notification_updates(payload: &Value) -> Result<Vec<NotificationUpdate>> {
    let categories: &Map<String, Value> = payload
        .as_object()
        .ok_or_else(|| Error::Validation("Invalid unNotifiedAlertIds format".to_string()))?;

    let mut updates = Vec::new();
    for (category, ids) in categories {
        let ids: Vec<AlertDbId> = match ids {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => {
                warn!("Ignoring non-array ids for alert category {}", category);
                continue;
            }
        };

        if ids.is_empty() {
            continue;
        }

        match table_for_category(category) {
            Some(table) => updates.push(NotificationUpdate {
                category: category.clone(),
                table,
                ids,
            }),
            None => debug!("Ignoring unknown alert category {}", category),
        }
    }

    Ok(updates)
}

/// Mark the listed alerts as notified, returning the touched table names
pub async fn mark_notified(repo: &AlertsRepository, payload: &Value) -> Result<Vec<String>> {
    let updates = plan_notification_updates(payload)?;

    let mut updated_tables = Vec::with_capacity(updates.len());
    for update in updates {
        debug!(
            "Updating {} ids for {} in {}",
            update.ids.len(),
            update.category,
            update.table
        );

        match update.table {
            NotifiableTable::AlertNotifications => {
                let ids: Vec<String> = update.ids.iter().map(|id| id.to_string()).collect();
                repo.mark_search_notified(&ids).await?;
            }
            table => {
                let ids: Vec<i64> = update.ids.iter().filter_map(AlertDbId::as_int).collect();
                if ids.len() != update.ids.len() {
                    warn!("Skipping non-numeric ids for {}", update.category);
                }
                repo.mark_event_notified(table, &ids).await?;
            }
        }

        updated_tables.push(update.table.table_name().to_string());
    }

    Ok(updated_tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_row(id: &str, res_id: &str, query: &str, is_notified: bool) -> SearchAlertRow {
        SearchAlertRow {
            id: id.to_string(),
            query: Some(query.to_string()),
            res_id: Some(res_id.to_string()),
            camera_id: Some("gate_1".to_string()),
            img_url: None,
            thumb_path: None,
            start_timestamp: None,
            end_timestamp: None,
            thumbnail: None,
            is_notified,
        }
    }

    fn loitering_row(id: i32, is_notified: bool) -> LoiteringAlertRow {
        LoiteringAlertRow {
            id,
            camera_id: Some("cam_2".to_string()),
            query: Some("person found loitering".to_string()),
            thumb_path: None,
            start_timestamp: None,
            end_timestamp: None,
            duration: Some(12.0),
            is_notified,
        }
    }

    fn police_row(id: i32, is_notified: bool) -> PoliceAlertRow {
        PoliceAlertRow {
            id,
            camera_id: None,
            query: "Missing Police Personnel".to_string(),
            start_timestamp: None,
            end_timestamp: None,
            duration: None,
            thumb_path: None,
            clip_path: None,
            is_notified,
        }
    }

    fn group<'a>(groups: &'a [AlertGroup], id: &str) -> &'a AlertGroup {
        groups.iter().find(|g| g.id == id).unwrap()
    }

    #[test]
    fn test_aggregate_deduplicates_by_result_id() {
        let rows = vec![
            search_row("n1", "r1", "person waving black flag", false),
            search_row("n2", "r1", "person waving black flag", false),
            search_row("n3", "r2", "people holding placards", true),
            search_row("n4", "r3", "dog", false),
        ];

        let groups = aggregate(&rows, vec![], vec![]);
        let banners = group(&groups, "banners-slogans");

        assert_eq!(banners.count, 2);
        assert_eq!(
            banners.db_ids,
            Some(vec![
                AlertDbId::Text("n1".to_string()),
                AlertDbId::Text("n2".to_string())
            ])
        );

        let animals = group(&groups, "animals");
        assert_eq!(animals.count, 1);
        assert_eq!(animals.db_ids, Some(vec![AlertDbId::Text("n4".to_string())]));
    }

    #[test]
    fn test_aggregate_event_groups_report_unnotified_ids() {
        let groups = aggregate(
            &[],
            vec![loitering_row(10, false), loitering_row(11, true)],
            vec![police_row(3, false)],
        );

        let loitering = group(&groups, "loitering");
        assert_eq!(loitering.count, 2);
        assert_eq!(loitering.db_ids, Some(vec![AlertDbId::Int(10)]));

        let police = group(&groups, "missing-police");
        assert_eq!(police.count, 1);
        assert_eq!(police.db_ids, Some(vec![AlertDbId::Int(3)]));
    }

    #[test]
    fn test_aggregate_returns_every_category() {
        let groups = aggregate(&[], vec![], vec![]);
        assert_eq!(groups.len(), 10);

        let weapons = serde_json::to_value(group(&groups, "weapons")).unwrap();
        assert_eq!(weapons, json!({"id": "weapons", "count": 0, "details": []}));

        let loitering = serde_json::to_value(group(&groups, "loitering")).unwrap();
        assert_eq!(loitering["dbIds"], json!([]));
    }

    #[test]
    fn test_plan_notification_updates() {
        let payload = json!({
            "animals": ["n4"],
            "banners-slogans": [],
            "loitering": [610, 609],
            "missing-police": [30],
            "not-a-category": [1]
        });

        let updates = plan_notification_updates(&payload).unwrap();
        let tables: Vec<_> = updates.iter().map(|u| u.table).collect();

        assert_eq!(
            tables,
            vec![
                NotifiableTable::AlertNotifications,
                NotifiableTable::Loitering,
                NotifiableTable::PoliceMonitoring
            ]
        );
        assert_eq!(updates[1].ids, vec![AlertDbId::Int(610), AlertDbId::Int(609)]);
    }

    #[test]
    fn test_plan_notification_updates_rejects_non_objects() {
        assert!(plan_notification_updates(&json!([1, 2])).is_err());
        assert!(plan_notification_updates(&Value::Null).is_err());
    }

    #[test]
    fn test_table_for_category() {
        assert_eq!(table_for_category("weapons"), Some(NotifiableTable::AlertNotifications));
        assert_eq!(table_for_category("missing-police"), Some(NotifiableTable::PoliceMonitoring));
        assert_eq!(table_for_category("parking"), None);
    }
}
