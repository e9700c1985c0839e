//! 사용자 레코드와 인증된 신원.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;

/// 로그인에 필요한 사용자 레코드.
///
/// 관계형 저장소의 사용자 행 중 인증에 필요한 컬럼만 투영한 것입니다.
/// `hashed_password`는 PHC 문자열이며 평문은 어디에도 저장되지 않습니다.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// 사용자 ID
    pub id: i64,
    /// 사용자 이름 (고유)
    pub username: String,
    /// 이메일 (고유)
    pub email: String,
    /// 해시된 비밀번호
    pub hashed_password: String,
    /// 활성 계정 여부
    pub is_active: bool,
}

impl UserRecord {
    /// 요청 범위의 최소 신원으로 투영합니다.
    pub fn identity(&self) -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

// 해시는 로그에 남기지 않는다
impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// 요청에 부착되는 인증된 신원.
///
/// 요청 수명 동안만 유지되며 응답 후 폐기됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    /// 사용자 ID
    pub id: i64,
    /// 사용자 이름
    pub username: String,
    /// 이메일
    pub email: String,
}

/// 사용자 조회/갱신 협력자.
///
/// 관계형 영속성은 이 코어의 범위 밖이므로 trait로만 의존합니다.
/// "찾을 수 없음"은 에러가 아니라 `Ok(None)`으로 표현합니다.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 사용자 이름으로 조회.
    async fn find_by_username(&self, username: &str)
        -> Result<Option<UserRecord>, RepositoryError>;

    /// 이메일로 조회.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;

    /// 저장된 비밀번호 해시를 교체합니다.
    ///
    /// 대상 사용자가 없으면 `Ok(false)`.
    async fn update_password(
        &self,
        user_id: i64,
        hashed_password: &str,
    ) -> Result<bool, RepositoryError>;
}
