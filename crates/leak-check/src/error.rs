//! 누수 검사 에러 타입
//!
//! [`LeakCheckError`]는 상태 조회와 출력 파싱 중 발생하는 에러를 표현합니다.
//! 누수 자체는 에러가 아니라 [`LeakVerdict`](crate::LeakVerdict)로 보고됩니다.

use testgate_core::error::TestgateError;

/// 누수 검사 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LeakCheckError {
    /// 상태 조회 명령을 실행할 수 없음
    #[error("failed to spawn status command for profile '{profile}': {reason}")]
    Spawn { profile: String, reason: String },

    /// 상태 조회 명령이 실패로 종료됨
    #[error("status query failed for profile '{profile}': {reason}")]
    Query {
        /// 프로파일 이름
        profile: String,
        /// 실패 사유 (비밀 정보 제거됨)
        reason: String,
    },

    /// 상태 조회 시간 초과
    #[error("status query for profile '{profile}' timed out after {timeout_secs}s")]
    Timeout { profile: String, timeout_secs: u64 },

    /// 상태 명령이 설정되지 않음
    #[error("profile '{0}' has no status command")]
    NoStatusCommand(String),

    /// 정규식 설정 오류
    #[error("invalid pattern for '{field}': {reason}")]
    Pattern { field: String, reason: String },
}

impl From<LeakCheckError> for TestgateError {
    fn from(err: LeakCheckError) -> Self {
        TestgateError::LeakCheck(err.to_string())
    }
}
