use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use super::db_err;
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::blacklisted_token;

pub struct BlacklistRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> BlacklistRepository<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Record `jti` as revoked. Returns `true` only for the call that
    /// actually inserted the row, so concurrent consumers of the same token
    /// see exactly one winner.
    pub async fn claim(
        &self,
        jti: &str,
        token_type: &str,
        user_id: Option<i32>,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let row = blacklisted_token::ActiveModel {
            jti: Set(jti.to_string()),
            token_type: Set(token_type.to_string()),
            user_id: Set(user_id),
            expires_at: Set(expires_at),
            blacklisted_at: Set(Utc::now()),
            ..Default::default()
        };

        let inserted = blacklisted_token::Entity::insert(row)
            .on_conflict(
                OnConflict::column(blacklisted_token::Column::Jti)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await
            .map_err(db_err)?;

        Ok(inserted == 1)
    }

    pub async fn contains(&self, jti: &str) -> DomainResult<bool> {
        let count = blacklisted_token::Entity::find()
            .filter(blacklisted_token::Column::Jti.eq(jti))
            .count(self.conn)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Drop rows whose token expired at or before `cutoff`.
    pub async fn purge_expired(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let result = blacklisted_token::Entity::delete_many()
            .filter(blacklisted_token::Column::ExpiresAt.lte(cutoff))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::infrastructure::database::test_support::memory_db;

    #[tokio::test]
    async fn second_claim_of_same_jti_loses() {
        let db = memory_db().await;
        let repo = BlacklistRepository::new(&db);
        let exp = Utc::now() + Duration::days(7);

        assert!(repo.claim("abc", "refresh", None, exp).await.unwrap());
        assert!(!repo.claim("abc", "refresh", None, exp).await.unwrap());
        assert!(repo.contains("abc").await.unwrap());
        assert!(!repo.contains("other").await.unwrap());
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let db = memory_db().await;
        let repo = BlacklistRepository::new(&db);
        let now = Utc::now();

        repo.claim("old", "access", None, now - Duration::hours(1)).await.unwrap();
        repo.claim("new", "refresh", None, now + Duration::hours(1)).await.unwrap();

        assert_eq!(repo.purge_expired(now).await.unwrap(), 1);
        assert!(!repo.contains("old").await.unwrap());
        assert!(repo.contains("new").await.unwrap());
    }
}
