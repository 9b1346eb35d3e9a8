//! testgate 공통 타입, 에러, 설정
//!
//! 셀렉터, 플래너, 누수 검사, 러너 크레이트가 공유하는 기반 크레이트입니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, PlanError, TestgateError};

// 설정
pub use config::{GeneralConfig, LeakCheckConfig, PlannerConfig, RunnerConfig, TestgateConfig};

// 도메인 타입
pub use types::{
    AuthState, BucketOutcome, DEFAULT_TAXONOMY, ProfileKind, ProvisioningProfile, Tag, TagSet,
    TestCase, TriggerEvent, TriggerLevel,
};
