//! 플래너 에러 타입
//!
//! [`PlannerError`]는 매트릭스/코퍼스 로딩, 버킷 검증, 파티션 검증 중
//! 발생하는 에러를 표현합니다. `From<PlannerError> for TestgateError`가
//! 구현되어 있어 상위 레이어에서 `?`로 전파할 수 있습니다.

use testgate_core::error::{PlanError, TestgateError};
use testgate_selector::SelectorError;

/// 플래너 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// 매트릭스 파일 로딩 실패
    #[error("matrix load error: {path}: {reason}")]
    MatrixLoad {
        /// 매트릭스 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 코퍼스 스냅샷 로딩 실패
    #[error("corpus load error: {path}: {reason}")]
    CorpusLoad { path: String, reason: String },

    /// 버킷 정의 검증 실패
    #[error("invalid bucket '{bucket}': {reason}")]
    InvalidBucket { bucket: String, reason: String },

    /// 버킷 셀렉터 파싱 실패
    #[error("invalid selector in bucket '{bucket}': {source}")]
    Selector {
        bucket: String,
        #[source]
        source: SelectorError,
    },

    /// 파티션 불변식 위반
    #[error(
        "partition check failed at level '{level}': {orphans} orphaned, {duplicates} duplicated, {empty} empty buckets"
    )]
    PartitionViolated {
        level: String,
        orphans: usize,
        duplicates: usize,
        empty: usize,
    },
}

impl From<PlannerError> for TestgateError {
    fn from(err: PlannerError) -> Self {
        let plan_err = match err {
            PlannerError::MatrixLoad { path, reason } => PlanError::MatrixLoad { path, reason },
            PlannerError::CorpusLoad { path, reason } => PlanError::CorpusLoad { path, reason },
            PlannerError::InvalidBucket { bucket, reason } => {
                PlanError::InvalidBucket { bucket, reason }
            }
            PlannerError::Selector { bucket, source } => PlanError::InvalidBucket {
                bucket,
                reason: source.to_string(),
            },
            PlannerError::PartitionViolated {
                orphans,
                duplicates,
                empty,
                ..
            } => PlanError::PartitionViolated {
                orphans,
                duplicates,
                empty,
            },
        };
        TestgateError::Plan(plan_err)
    }
}
