use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum length (in characters) for any newly chosen password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Organizational role. Only `Administrator` grants access to account
/// management and the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserLevel {
    Administrator,
    DivisionChief,
    EiaAirWaterSectionChief,
    ToxicHazardousSectionChief,
    SolidWasteSectionChief,
    EiaMonitoringUnitHead,
    AirQualityUnitHead,
    WaterQualityUnitHead,
    ToxicChemicalsMonitoringPersonnel,
    SolidWasteMonitoringPersonnel,
}

impl UserLevel {
    pub const ALL: [UserLevel; 10] = [
        UserLevel::Administrator,
        UserLevel::DivisionChief,
        UserLevel::EiaAirWaterSectionChief,
        UserLevel::ToxicHazardousSectionChief,
        UserLevel::SolidWasteSectionChief,
        UserLevel::EiaMonitoringUnitHead,
        UserLevel::AirQualityUnitHead,
        UserLevel::WaterQualityUnitHead,
        UserLevel::ToxicChemicalsMonitoringPersonnel,
        UserLevel::SolidWasteMonitoringPersonnel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserLevel::Administrator => "administrator",
            UserLevel::DivisionChief => "division_chief",
            UserLevel::EiaAirWaterSectionChief => "eia_air_water_section_chief",
            UserLevel::ToxicHazardousSectionChief => "toxic_hazardous_section_chief",
            UserLevel::SolidWasteSectionChief => "solid_waste_section_chief",
            UserLevel::EiaMonitoringUnitHead => "eia_monitoring_unit_head",
            UserLevel::AirQualityUnitHead => "air_quality_unit_head",
            UserLevel::WaterQualityUnitHead => "water_quality_unit_head",
            UserLevel::ToxicChemicalsMonitoringPersonnel => {
                "toxic_chemicals_monitoring_personnel"
            }
            UserLevel::SolidWasteMonitoringPersonnel => "solid_waste_monitoring_personnel",
        }
    }
}

impl fmt::Display for UserLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserLevel::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("\"{s}\" is not a valid choice."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            _ => Err("Invalid status value".to_string()),
        }
    }
}

/// Account model
#[derive(Clone, Debug)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub user_level: UserLevel,
    pub status: UserStatus,
    pub password_hash: String,
    pub using_default_password: bool,
    /// Stored avatar path relative to the media root, e.g. `avatars/7_1712.png`.
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn is_administrator(&self) -> bool {
        self.user_level == UserLevel::Administrator
    }

    /// "First Middle Last", skipping empty parts.
    pub fn full_name(&self) -> String {
        [&self.first_name, &self.middle_name, &self.last_name]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Canonical form used for storage and every lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            email: "ana@example.com".into(),
            first_name: "Ana".into(),
            last_name: "Reyes".into(),
            middle_name: String::new(),
            user_level: UserLevel::AirQualityUnitHead,
            status: UserStatus::Active,
            password_hash: String::new(),
            using_default_password: false,
            avatar: "avatars/default.jpg".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn levels_round_trip_through_strings() {
        for level in UserLevel::ALL {
            assert_eq!(level.as_str().parse::<UserLevel>().unwrap(), level);
        }
        assert!("superuser".parse::<UserLevel>().is_err());
    }

    #[test]
    fn status_parse_rejects_unknown_values() {
        assert_eq!("inactive".parse::<UserStatus>().unwrap(), UserStatus::Inactive);
        assert_eq!(
            "suspended".parse::<UserStatus>().unwrap_err(),
            "Invalid status value"
        );
    }

    #[test]
    fn full_name_skips_empty_middle_name() {
        let mut u = user();
        assert_eq!(u.full_name(), "Ana Reyes");
        u.middle_name = "Cruz".into();
        assert_eq!(u.full_name(), "Ana Cruz Reyes");
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
