//! 에러 타입 -- 도메인별 에러 정의

/// testgate 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TestgateError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 셀렉터 표현식 에러
    #[error("selector error: {0}")]
    Selector(String),

    /// 계획 수립 / 파티션 검증 에러
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    /// 누수 검사 에러
    #[error("leak check error: {0}")]
    LeakCheck(String),

    /// 버킷 실행 에러
    #[error("execution error: {0}")]
    Execution(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 계획 수립 에러
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// 매트릭스 정의 로딩 실패
    #[error("matrix load failed: {path}: {reason}")]
    MatrixLoad { path: String, reason: String },

    /// 코퍼스 스냅샷 로딩 실패
    #[error("corpus load failed: {path}: {reason}")]
    CorpusLoad { path: String, reason: String },

    /// 버킷 정의 오류
    #[error("invalid bucket '{bucket}': {reason}")]
    InvalidBucket { bucket: String, reason: String },

    /// 파티션 불변식 위반 (고아/중복/빈 버킷)
    #[error("partition check failed: {orphans} orphaned, {duplicates} duplicated, {empty} empty buckets")]
    PartitionViolated {
        orphans: usize,
        duplicates: usize,
        empty: usize,
    },
}
