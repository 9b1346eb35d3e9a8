//! 메트릭 상수 정의
//!
//! 모든 메트릭의 이름과 레이블 키를 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `testgate_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(testgate_core::metrics::BUCKETS_TOTAL, "result" => "failed").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 버킷 결과 레이블 키 (succeeded, failed, timed_out, cancelled)
pub const LABEL_RESULT: &str = "result";

/// 트리거 레벨 레이블 키 (local, release)
pub const LABEL_LEVEL: &str = "level";

/// 프로파일 레이블 키
pub const LABEL_PROFILE: &str = "profile";

// ─── Planner 메트릭 ────────────────────────────────────────────────

/// 계획 수립 횟수 (counter, label: level)
pub const PLANS_TOTAL: &str = "testgate_plans_total";

/// 마지막 검증의 고아 테스트 수 (gauge)
pub const PLAN_ORPHANS: &str = "testgate_plan_orphans";

/// 마지막 검증의 중복 선택 테스트 수 (gauge)
pub const PLAN_DUPLICATES: &str = "testgate_plan_duplicates";

/// 마지막 검증의 빈 버킷 수 (gauge)
pub const PLAN_EMPTY_BUCKETS: &str = "testgate_plan_empty_buckets";

// ─── Runner 메트릭 ─────────────────────────────────────────────────

/// 종료된 버킷 수 (counter, label: result)
pub const BUCKETS_TOTAL: &str = "testgate_buckets_total";

/// 버킷 실행 시간 (histogram, 초)
pub const BUCKET_DURATION_SECONDS: &str = "testgate_bucket_duration_seconds";

// ─── Leak Check 메트릭 ─────────────────────────────────────────────

/// 상태 조회 횟수 (counter, label: profile, result)
pub const LEAK_CHECK_QUERIES_TOTAL: &str = "testgate_leak_check_queries_total";

/// 마지막 검사에서 발견된 누수 자원 수 (gauge)
pub const LEAKED_RESOURCES: &str = "testgate_leaked_resources";

/// 누수 검사 수렴까지 걸린 시간 (histogram, 초)
pub const LEAK_CHECK_DURATION_SECONDS: &str = "testgate_leak_check_duration_seconds";

/// 메트릭 설명을 등록합니다.
///
/// 레코더가 설치된 이후 한 번 호출합니다.
pub fn describe_metrics() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(PLANS_TOTAL, "Number of plans built");
    describe_gauge!(PLAN_ORPHANS, "Tests selected by no active bucket");
    describe_gauge!(PLAN_DUPLICATES, "Tests selected twice inside an exclusivity group");
    describe_gauge!(PLAN_EMPTY_BUCKETS, "Active buckets selecting no test");
    describe_counter!(BUCKETS_TOTAL, "Buckets that reached a terminal state");
    describe_histogram!(BUCKET_DURATION_SECONDS, "Wall-clock duration of a bucket");
    describe_counter!(LEAK_CHECK_QUERIES_TOTAL, "Infrastructure status queries issued");
    describe_gauge!(LEAKED_RESOURCES, "Attributable resources still running");
    describe_histogram!(
        LEAK_CHECK_DURATION_SECONDS,
        "Time from leak check start to verdict"
    );
}
