//! testgate-planner -- 실행 버킷 계획 수립
//!
//! 버킷 매트릭스와 테스트 코퍼스를 로드하고, 트리거 이벤트에 따라 활성 버킷을
//! 선택한 뒤 파티션 불변식(고아/중복/빈 버킷 없음)을 정적으로 검증합니다.
//!
//! # 모듈 구성
//!
//! - [`matrix`]: 버킷 정의와 YAML 로더
//! - [`corpus`]: 테스트 코퍼스 스냅샷
//! - [`gate`]: 트리거 이벤트 -> 게이트 상태 -> 레벨
//! - [`verify`]: 파티션 검증 (순수 함수)
//! - [`plan`]: 불변 실행 계획
//! - [`builtin`]: 내장 Runhouse 매트릭스와 기본 프로파일

pub mod builtin;
pub mod corpus;
pub mod error;
pub mod gate;
pub mod matrix;
pub mod plan;
pub mod verify;

pub use builtin::{builtin_matrix, default_profiles, merge_profiles};
pub use corpus::{Corpus, CorpusLoader};
pub use error::PlannerError;
pub use gate::GateState;
pub use matrix::{Bucket, Matrix, MatrixLoader};
pub use plan::{Plan, PlannedBucket, Planner, load_matrix};
pub use verify::{BucketSelection, Duplicate, LintWarning, PartitionReport, verify_partition};
