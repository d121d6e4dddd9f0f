//! User entity for database

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(64))")]
pub enum UserLevel {
    #[sea_orm(string_value = "administrator")]
    Administrator,
    #[sea_orm(string_value = "division_chief")]
    DivisionChief,
    #[sea_orm(string_value = "eia_air_water_section_chief")]
    EiaAirWaterSectionChief,
    #[sea_orm(string_value = "toxic_hazardous_section_chief")]
    ToxicHazardousSectionChief,
    #[sea_orm(string_value = "solid_waste_section_chief")]
    SolidWasteSectionChief,
    #[sea_orm(string_value = "eia_monitoring_unit_head")]
    EiaMonitoringUnitHead,
    #[sea_orm(string_value = "air_quality_unit_head")]
    AirQualityUnitHead,
    #[sea_orm(string_value = "water_quality_unit_head")]
    WaterQualityUnitHead,
    #[sea_orm(string_value = "toxic_chemicals_monitoring_personnel")]
    ToxicChemicalsMonitoringPersonnel,
    #[sea_orm(string_value = "solid_waste_monitoring_personnel")]
    SolidWasteMonitoringPersonnel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum UserStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

/// User model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Always stored lowercased.
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub user_level: UserLevel,
    pub status: UserStatus,
    pub password_hash: String,
    pub using_default_password: bool,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::password_reset_otp::Entity")]
    PasswordResetOtps,
}

impl Related<super::password_reset_otp::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PasswordResetOtps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
