use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use super::db_err;
use crate::domain::{DomainResult, PasswordResetOtp};
use crate::infrastructure::database::entities::password_reset_otp;

pub struct OtpRepository<'c, C> {
    conn: &'c C,
}

fn otp_model_to_domain(model: password_reset_otp::Model) -> PasswordResetOtp {
    PasswordResetOtp {
        id: model.id,
        user_id: model.user_id,
        code: model.code,
        created_at: model.created_at,
        expires_at: model.expires_at,
        is_used: model.is_used,
    }
}

impl<'c, C: ConnectionTrait> OtpRepository<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Mark every unused code of the user as used. Returns how many changed.
    pub async fn invalidate_unused(&self, user_id: i32) -> DomainResult<u64> {
        let result = password_reset_otp::Entity::update_many()
            .col_expr(password_reset_otp::Column::IsUsed, Expr::value(true))
            .filter(password_reset_otp::Column::UserId.eq(user_id))
            .filter(password_reset_otp::Column::IsUsed.eq(false))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    pub async fn insert(
        &self,
        user_id: i32,
        code: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<PasswordResetOtp> {
        let model = password_reset_otp::ActiveModel {
            user_id: Set(user_id),
            code: Set(code.to_string()),
            created_at: Set(created_at),
            expires_at: Set(expires_at),
            is_used: Set(false),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .map_err(db_err)?;

        Ok(otp_model_to_domain(model))
    }

    /// Most recent unused code matching `code` that is still valid at `now`.
    pub async fn find_valid(
        &self,
        user_id: i32,
        code: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<PasswordResetOtp>> {
        let model = password_reset_otp::Entity::find()
            .filter(password_reset_otp::Column::UserId.eq(user_id))
            .filter(password_reset_otp::Column::Code.eq(code))
            .filter(password_reset_otp::Column::IsUsed.eq(false))
            .filter(password_reset_otp::Column::ExpiresAt.gt(now))
            .order_by_desc(password_reset_otp::Column::CreatedAt)
            .one(self.conn)
            .await
            .map_err(db_err)?;

        // The SQL filter narrows, the model predicate decides.
        Ok(model
            .map(otp_model_to_domain)
            .filter(|otp| otp.is_valid_at(now)))
    }

    /// Consume a code. Returns `false` if it was already used.
    pub async fn mark_used(&self, id: i32) -> DomainResult<bool> {
        let result = password_reset_otp::Entity::update_many()
            .col_expr(password_reset_otp::Column::IsUsed, Expr::value(true))
            .filter(password_reset_otp::Column::Id.eq(id))
            .filter(password_reset_otp::Column::IsUsed.eq(false))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    pub async fn count_valid(&self, user_id: i32, now: DateTime<Utc>) -> DomainResult<u64> {
        password_reset_otp::Entity::find()
            .filter(password_reset_otp::Column::UserId.eq(user_id))
            .filter(password_reset_otp::Column::IsUsed.eq(false))
            .filter(password_reset_otp::Column::ExpiresAt.gt(now))
            .count(self.conn)
            .await
            .map_err(db_err)
    }

    pub async fn count_for_user(&self, user_id: i32) -> DomainResult<u64> {
        password_reset_otp::Entity::find()
            .filter(password_reset_otp::Column::UserId.eq(user_id))
            .count(self.conn)
            .await
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::user::CreateUserDto;
    use crate::domain::{UserLevel, UserStatus};
    use crate::infrastructure::database::repositories::UserRepository;
    use crate::infrastructure::database::test_support::memory_db;

    async fn seed_user(db: &sea_orm::DatabaseConnection) -> i32 {
        UserRepository::new(db)
            .insert(
                &CreateUserDto {
                    email: "otp@example.com".into(),
                    first_name: "O".into(),
                    last_name: "P".into(),
                    middle_name: String::new(),
                    user_level: UserLevel::DivisionChief,
                    status: UserStatus::Active,
                    password: None,
                },
                "hash".into(),
                false,
                "avatars/default.jpg",
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn invalidate_leaves_no_valid_codes() {
        let db = memory_db().await;
        let user_id = seed_user(&db).await;
        let repo = OtpRepository::new(&db);
        let now = Utc::now();

        repo.insert(user_id, "111111", now, now + Duration::minutes(15)).await.unwrap();
        repo.insert(user_id, "222222", now, now + Duration::minutes(15)).await.unwrap();
        assert_eq!(repo.invalidate_unused(user_id).await.unwrap(), 2);
        assert_eq!(repo.count_valid(user_id, now).await.unwrap(), 0);
        assert_eq!(repo.count_for_user(user_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn find_valid_ignores_expired_and_used_codes() {
        let db = memory_db().await;
        let user_id = seed_user(&db).await;
        let repo = OtpRepository::new(&db);
        let now = Utc::now();

        repo.insert(user_id, "333333", now - Duration::minutes(20), now - Duration::minutes(5))
            .await
            .unwrap();
        assert!(repo.find_valid(user_id, "333333", now).await.unwrap().is_none());

        let fresh = repo
            .insert(user_id, "444444", now, now + Duration::minutes(15))
            .await
            .unwrap();
        let found = repo.find_valid(user_id, "444444", now).await.unwrap().unwrap();
        assert_eq!(found.id, fresh.id);

        assert!(repo.mark_used(fresh.id).await.unwrap());
        assert!(!repo.mark_used(fresh.id).await.unwrap());
        assert!(repo.find_valid(user_id, "444444", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn code_is_rejected_at_its_expiry_instant() {
        let db = memory_db().await;
        let user_id = seed_user(&db).await;
        let repo = OtpRepository::new(&db);
        let now = Utc::now();

        let otp = repo.insert(user_id, "555555", now - Duration::minutes(15), now).await.unwrap();
        assert!(repo.find_valid(user_id, "555555", otp.expires_at).await.unwrap().is_none());
    }
}
