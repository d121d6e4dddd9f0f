//! Database repository implementations
//!
//! Repositories borrow any SeaORM connection (`DatabaseConnection` or an open
//! `DatabaseTransaction`), so services decide the transaction boundary and
//! several repositories can write inside one unit of work.

pub mod activity_log_repository;
pub mod blacklist_repository;
pub mod otp_repository;
pub mod user_repository;

pub use activity_log_repository::ActivityLogRepository;
pub use blacklist_repository::BlacklistRepository;
pub use otp_repository::OtpRepository;
pub use user_repository::UserRepository;

use sea_orm::sea_query::LikeExpr;

use crate::domain::DomainError;

pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::from(e)
}

/// Escape character for LIKE patterns; rendered verbatim by every backend.
const LIKE_ESCAPE: char = '!';

/// Lowercased `%term%` pattern in which `%` and `_` inside `term` match literally.
pub(crate) fn contains_pattern(term: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape(LIKE_ESCAPE)
}
