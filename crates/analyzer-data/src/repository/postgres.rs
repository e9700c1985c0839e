//! PostgreSQL 사용자 저장소.

use std::time::Duration;

use analyzer_core::{DatabaseConfig, RepositoryError, UserRecord, UserRepository};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info, instrument};

/// 데이터베이스 연결 풀 래퍼.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 새로운 데이터베이스 연결 풀을 생성합니다.
    ///
    /// URL이 설정되지 않았으면 `Ok(None)`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Option<Self>, RepositoryError> {
        let Some(url) = config.url.as_deref() else {
            return Ok(None);
        };

        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        info!("Database connection established");

        Ok(Some(Self { pool }))
    }

    /// 내부 연결 풀을 반환합니다.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 데이터베이스 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }
}

/// 사용자 테이블 행 (인증 관련 컬럼만).
#[derive(Debug, Clone, FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    password: String,
    is_active: bool,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: i64::from(row.id),
            username: row.username,
            email: row.email,
            hashed_password: row.password,
            is_active: row.is_active,
        }
    }
}

/// `users` 테이블 기반 [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    async fn find_one(
        &self,
        query: &'static str,
        value: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(UserRecord::from))
    }
}

const SELECT_BY_USERNAME: &str =
    "SELECT id, username, email, password, is_active FROM users WHERE username = $1";
const SELECT_BY_EMAIL: &str =
    "SELECT id, username, email, password, is_active FROM users WHERE email = $1";

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        self.find_one(SELECT_BY_USERNAME, username).await
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        self.find_one(SELECT_BY_EMAIL, email).await
    }

    #[instrument(skip(self, hashed_password))]
    async fn update_password(
        &self,
        user_id: i64,
        hashed_password: &str,
    ) -> Result<bool, RepositoryError> {
        let id = i32::try_from(user_id).map_err(|_| {
            RepositoryError::InvalidRecord(format!("user id out of range: {}", user_id))
        })?;

        let result = sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(hashed_password)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        debug!(rows = result.rows_affected(), "Password updated");
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_maps_password_column_to_hash() {
        let row = UserRow {
            id: 63,
            username: "jpcadena".to_string(),
            email: "jp@example.com".to_string(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            is_active: true,
        };

        let record = UserRecord::from(row);
        assert_eq!(record.id, 63);
        assert_eq!(record.hashed_password, "$argon2id$v=19$m=19456,t=2,p=1$abc$def");
        assert!(record.is_active);
    }

    #[tokio::test]
    async fn test_connect_without_url_is_none() {
        let config = DatabaseConfig {
            url: None,
            max_connections: 5,
            acquire_timeout_secs: 3,
        };
        assert!(Database::connect(&config).await.unwrap().is_none());
    }
}
