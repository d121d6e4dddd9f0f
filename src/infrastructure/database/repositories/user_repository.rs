use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};

use super::{contains_pattern, db_err};
use crate::domain::user::{normalize_email, CreateUserDto, GetUserDto};
use crate::domain::{DomainError, DomainResult, User, UserLevel, UserStatus};
use crate::infrastructure::database::entities::user;

pub const DUPLICATE_EMAIL_MESSAGE: &str = "A user with this email already exists.";

pub struct UserRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> UserRepository<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn entity_level_to_domain(level: user::UserLevel) -> UserLevel {
    match level {
        user::UserLevel::Administrator => UserLevel::Administrator,
        user::UserLevel::DivisionChief => UserLevel::DivisionChief,
        user::UserLevel::EiaAirWaterSectionChief => UserLevel::EiaAirWaterSectionChief,
        user::UserLevel::ToxicHazardousSectionChief => UserLevel::ToxicHazardousSectionChief,
        user::UserLevel::SolidWasteSectionChief => UserLevel::SolidWasteSectionChief,
        user::UserLevel::EiaMonitoringUnitHead => UserLevel::EiaMonitoringUnitHead,
        user::UserLevel::AirQualityUnitHead => UserLevel::AirQualityUnitHead,
        user::UserLevel::WaterQualityUnitHead => UserLevel::WaterQualityUnitHead,
        user::UserLevel::ToxicChemicalsMonitoringPersonnel => {
            UserLevel::ToxicChemicalsMonitoringPersonnel
        }
        user::UserLevel::SolidWasteMonitoringPersonnel => UserLevel::SolidWasteMonitoringPersonnel,
    }
}

fn domain_level_to_entity(level: UserLevel) -> user::UserLevel {
    match level {
        UserLevel::Administrator => user::UserLevel::Administrator,
        UserLevel::DivisionChief => user::UserLevel::DivisionChief,
        UserLevel::EiaAirWaterSectionChief => user::UserLevel::EiaAirWaterSectionChief,
        UserLevel::ToxicHazardousSectionChief => user::UserLevel::ToxicHazardousSectionChief,
        UserLevel::SolidWasteSectionChief => user::UserLevel::SolidWasteSectionChief,
        UserLevel::EiaMonitoringUnitHead => user::UserLevel::EiaMonitoringUnitHead,
        UserLevel::AirQualityUnitHead => user::UserLevel::AirQualityUnitHead,
        UserLevel::WaterQualityUnitHead => user::UserLevel::WaterQualityUnitHead,
        UserLevel::ToxicChemicalsMonitoringPersonnel => {
            user::UserLevel::ToxicChemicalsMonitoringPersonnel
        }
        UserLevel::SolidWasteMonitoringPersonnel => user::UserLevel::SolidWasteMonitoringPersonnel,
    }
}

fn entity_status_to_domain(status: user::UserStatus) -> UserStatus {
    match status {
        user::UserStatus::Active => UserStatus::Active,
        user::UserStatus::Inactive => UserStatus::Inactive,
    }
}

fn domain_status_to_entity(status: UserStatus) -> user::UserStatus {
    match status {
        UserStatus::Active => user::UserStatus::Active,
        UserStatus::Inactive => user::UserStatus::Inactive,
    }
}

fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        email: model.email,
        first_name: model.first_name,
        last_name: model.last_name,
        middle_name: model.middle_name,
        user_level: entity_level_to_domain(model.user_level),
        status: entity_status_to_domain(model.status),
        password_hash: model.password_hash,
        using_default_password: model.using_default_password,
        avatar: model.avatar,
        created_at: model.created_at,
        updated_at: model.updated_at,
        last_login_at: model.last_login_at,
    }
}

fn write_err(e: sea_orm::DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => DomainError::Conflict {
            field: "email",
            message: DUPLICATE_EMAIL_MESSAGE.to_string(),
        },
        _ => db_err(e),
    }
}

fn contains_ci(column: user::Column, term: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(contains_pattern(term))
}

// ── Repository implementation ───────────────────────────────────

impl<'c, C: ConnectionTrait> UserRepository<'c, C> {
    pub async fn find_by_id(&self, id: i32) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    /// Row-locking read (`SELECT … FOR UPDATE` where the backend supports it)
    /// for read-modify-write sequences inside a transaction.
    pub async fn find_by_id_for_update(&self, id: i32) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .lock_exclusive()
            .one(self.conn)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    pub async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(self.conn)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    pub async fn find_by_email_for_update(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .lock_exclusive()
            .one(self.conn)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    /// Whether another account already uses `email`.
    pub async fn email_taken(&self, email: &str, exclude_id: Option<i32>) -> DomainResult<bool> {
        let mut query = user::Entity::find().filter(user::Column::Email.eq(normalize_email(email)));
        if let Some(id) = exclude_id {
            query = query.filter(user::Column::Id.ne(id));
        }
        let count = query.count(self.conn).await.map_err(db_err)?;
        Ok(count > 0)
    }

    pub async fn insert(
        &self,
        dto: &CreateUserDto,
        password_hash: String,
        using_default_password: bool,
        avatar: &str,
    ) -> DomainResult<User> {
        let now = Utc::now();

        let new_user = user::ActiveModel {
            email: Set(normalize_email(&dto.email)),
            first_name: Set(dto.first_name.trim().to_string()),
            last_name: Set(dto.last_name.trim().to_string()),
            middle_name: Set(dto.middle_name.trim().to_string()),
            user_level: Set(domain_level_to_entity(dto.user_level)),
            status: Set(domain_status_to_entity(dto.status)),
            password_hash: Set(password_hash),
            using_default_password: Set(using_default_password),
            avatar: Set(avatar.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
            ..Default::default()
        };

        let model = new_user.insert(self.conn).await.map_err(write_err)?;
        Ok(user_model_to_domain(model))
    }

    /// Persist every mutable field of `user` and bump `updated_at`.
    pub async fn save(&self, user: &User) -> DomainResult<User> {
        let active = user::ActiveModel {
            id: Set(user.id),
            email: Set(normalize_email(&user.email)),
            first_name: Set(user.first_name.clone()),
            last_name: Set(user.last_name.clone()),
            middle_name: Set(user.middle_name.clone()),
            user_level: Set(domain_level_to_entity(user.user_level)),
            status: Set(domain_status_to_entity(user.status)),
            password_hash: Set(user.password_hash.clone()),
            using_default_password: Set(user.using_default_password),
            avatar: Set(user.avatar.clone()),
            created_at: Set(user.created_at),
            updated_at: Set(Utc::now()),
            last_login_at: Set(user.last_login_at),
        };

        let updated = active.update(self.conn).await.map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => DomainError::user_not_found("id", user.id),
            other => write_err(other),
        })?;
        Ok(user_model_to_domain(updated))
    }

    pub async fn touch_last_login(&self, id: i32) -> DomainResult<()> {
        user::Entity::update_many()
            .col_expr(user::Column::LastLoginAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: i32) -> DomainResult<bool> {
        let result = user::Entity::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list(&self, dto: &GetUserDto) -> DomainResult<Vec<User>> {
        let mut query = user::Entity::find();

        if let Some(id) = dto.exclude_id {
            query = query.filter(user::Column::Id.ne(id));
        }
        if let Some(status) = dto.status {
            query = query.filter(user::Column::Status.eq(domain_status_to_entity(status)));
        }
        if let Some(level) = dto.user_level {
            query = query.filter(user::Column::UserLevel.eq(domain_level_to_entity(level)));
        }
        if let Some(search) = dto.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(contains_ci(user::Column::Email, search))
                    .add(contains_ci(user::Column::FirstName, search))
                    .add(contains_ci(user::Column::LastName, search)),
            );
        }

        let models = query
            .order_by_asc(user::Column::Email)
            .all(self.conn)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(user_model_to_domain).collect())
    }

    pub async fn find_many(&self, ids: &[i32]) -> DomainResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(self.conn)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(user_model_to_domain).collect())
    }

    /// Ids of accounts whose email or name contains `term` (case-insensitive).
    pub async fn matching_ids(&self, term: &str) -> DomainResult<Vec<i32>> {
        let ids = user::Entity::find()
            .select_only()
            .column(user::Column::Id)
            .filter(
                Condition::any()
                    .add(contains_ci(user::Column::Email, term))
                    .add(contains_ci(user::Column::FirstName, term))
                    .add(contains_ci(user::Column::MiddleName, term))
                    .add(contains_ci(user::Column::LastName, term)),
            )
            .into_tuple::<i32>()
            .all(self.conn)
            .await
            .map_err(db_err)?;

        Ok(ids)
    }

    pub async fn count(&self) -> DomainResult<u64> {
        user::Entity::find().count(self.conn).await.map_err(db_err)
    }
}
