use serde::Serialize;

/// One kind of alert shown on the dashboard
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlertCategory {
    pub id: &'static str,
    pub main_title: &'static str,
    /// Search queries that produce this alert
    pub alert_title: &'static [&'static str],
    pub description: &'static str,
    pub icon: &'static str,
}

pub const BANNERS_SLOGANS: &str = "banners-slogans";
pub const LOITERING: &str = "loitering";
pub const MISSING_POLICE: &str = "missing-police";
pub const ANIMALS: &str = "animals";

/// Queries whose hits count as banners and slogans
pub const BANNER_KEYWORDS: &[&str] = &[
    "person waving black flag",
    "person carrying banners",
    "person carrying bottles",
    "person carrying posters",
    "people holding placards",
];

pub const ANIMAL_KEYWORDS: &[&str] = &["dogs", "dog"];

pub const ALERT_CATALOG: &[AlertCategory] = &[
    AlertCategory {
        id: BANNERS_SLOGANS,
        main_title: "Banners & Slogans",
        alert_title: &["person waving black flag", "people holding placards"],
        description: "Detection of unauthorized banners, posters, or slogans in restricted areas.",
        icon: "FlagIcon",
    },
    AlertCategory {
        id: LOITERING,
        main_title: "Loitering",
        alert_title: &["motorcycle"],
        description: "Detection of suspicious loitering in specific areas.",
        icon: "FootprintsIcon",
    },
    AlertCategory {
        id: MISSING_POLICE,
        main_title: "Missing Police Personnel",
        alert_title: &["No police found"],
        description: "Detection of missing police in the stadium.",
        icon: "UsersIcon",
    },
    AlertCategory {
        id: ANIMALS,
        main_title: "Animals",
        alert_title: &["dogs"],
        description: "Detection of Animals in the stadium areas.",
        icon: "PawPrintIcon",
    },
    AlertCategory {
        id: "prohibited-items",
        main_title: "Prohibited Items",
        alert_title: &["Prohibited Items"],
        description: "Detection of items not allowed in the premises.",
        icon: "BanIcon",
    },
    AlertCategory {
        id: "stampede-risk",
        main_title: "Stampede Risk",
        alert_title: &["stampede risk"],
        description: "Detection of crowd conditions that may lead to stampede.",
        icon: "UsersIcon",
    },
    AlertCategory {
        id: "fire-smoke",
        main_title: "Fire & Smoke",
        alert_title: &["fire & smoke"],
        description: "Detection of fire or smoke in monitored areas.",
        icon: "FlameIcon",
    },
    AlertCategory {
        id: "suspect-alert",
        main_title: "Suspect Alert",
        alert_title: &["suspect"],
        description: "Detection of known suspects or persons of interest.",
        icon: "AlertTriangleIcon",
    },
    AlertCategory {
        id: "unattended-baggage",
        main_title: "Unattended Baggage",
        alert_title: &["unattended baggage"],
        description: "Detection of bags or packages left unattended.",
        icon: "PackageIcon",
    },
    AlertCategory {
        id: "weapons",
        main_title: "Weapons",
        alert_title: &["weapons"],
        description: "Detection of potential weapons in monitored areas.",
        icon: "SwordIcon",
    },
];

pub fn find(id: &str) -> Option<&'static AlertCategory> {
    ALERT_CATALOG.iter().find(|category| category.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_are_unique() {
        let ids: HashSet<_> = ALERT_CATALOG.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), ALERT_CATALOG.len());
        assert_eq!(ALERT_CATALOG.len(), 10);
    }

    #[test]
    fn test_find_category() {
        assert_eq!(find(LOITERING).map(|c| c.main_title), Some("Loitering"));
        assert!(find("unknown").is_none());
    }

    #[test]
    fn test_catalog_serializes_camel_case() {
        let value = serde_json::to_value(find(ANIMALS).unwrap()).unwrap();
        assert_eq!(value["mainTitle"], "Animals");
        assert_eq!(value["alertTitle"], serde_json::json!(["dogs"]));
    }
}
