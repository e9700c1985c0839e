//! 인메모리 사용자 저장소.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use analyzer_core::{RepositoryError, UserRecord, UserRepository};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// ID로 색인된 인메모리 [`UserRepository`].
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<i64, UserRecord>>,
    failing: AtomicBool,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 사용자 추가 (같은 ID는 교체).
    pub async fn insert(&self, user: UserRecord) {
        self.users.write().await.insert(user.id, user);
    }

    /// 장애 상태 전환. 켜져 있으면 모든 조회가 데이터베이스 에러로 실패합니다.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// ID로 조회.
    pub async fn get(&self, user_id: i64) -> Option<UserRecord> {
        self.users.read().await.get(&user_id).cloned()
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RepositoryError::Database("in-memory repository marked failing".into()))
        } else {
            Ok(())
        }
    }

    async fn find_by<F>(&self, predicate: F) -> Result<Option<UserRecord>, RepositoryError>
    where
        F: Fn(&UserRecord) -> bool,
    {
        self.check()?;
        Ok(self.users.read().await.values().find(|u| predicate(u)).cloned())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        self.find_by(|u| u.username == username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        self.find_by(|u| u.email == email).await
    }

    async fn update_password(
        &self,
        user_id: i64,
        hashed_password: &str,
    ) -> Result<bool, RepositoryError> {
        self.check()?;
        match self.users.write().await.get_mut(&user_id) {
            Some(user) => {
                user.hashed_password = hashed_password.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
