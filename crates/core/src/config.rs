//! 설정 관리 -- testgate.toml 파싱 및 런타임 설정
//!
//! [`TestgateConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TESTGATE_LEAK_CHECK_MAX_WAIT_SECS=600` 형식)
//! 3. 설정 파일 (`testgate.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), testgate_core::error::TestgateError> {
//! use testgate_core::config::TestgateConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TestgateConfig::load("testgate.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TestgateConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TestgateError};
use crate::types::{DEFAULT_TAXONOMY, ProvisioningProfile};

/// 설정 상한값 상수
const MAX_PARALLEL: usize = 64;
pub const MAX_BUCKET_TIMEOUT_SECS: u64 = 24 * 3600;
const MAX_LEAK_WAIT_SECS: u64 = 6 * 3600;

/// testgate 통합 설정
///
/// `testgate.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestgateConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 플래너 설정
    #[serde(default)]
    pub planner: PlannerConfig,
    /// 버킷 실행 설정
    #[serde(default)]
    pub runner: RunnerConfig,
    /// 누수 검사 설정
    #[serde(default)]
    pub leak_check: LeakCheckConfig,
    /// 프로비저닝 프로파일 (비어있으면 내장 매트릭스의 프로파일 사용)
    #[serde(default)]
    pub profiles: Vec<ProvisioningProfile>,
}

impl TestgateConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TestgateError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TestgateError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TestgateError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TestgateError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TestgateError> {
        toml::from_str(toml_str).map_err(|e| {
            TestgateError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TESTGATE_{SECTION}_{FIELD}`
    /// 예: `TESTGATE_RUNNER_MAX_PARALLEL=4`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TESTGATE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TESTGATE_GENERAL_LOG_FORMAT");

        // Planner
        override_string(
            &mut self.planner.matrix_path,
            "TESTGATE_PLANNER_MATRIX_PATH",
        );
        override_string(
            &mut self.planner.corpus_path,
            "TESTGATE_PLANNER_CORPUS_PATH",
        );
        override_csv(&mut self.planner.taxonomy, "TESTGATE_PLANNER_TAXONOMY");

        // Runner
        override_csv(
            &mut self.runner.pytest_command,
            "TESTGATE_RUNNER_PYTEST_COMMAND",
        );
        override_string(&mut self.runner.test_path, "TESTGATE_RUNNER_TEST_PATH");
        override_usize(&mut self.runner.max_parallel, "TESTGATE_RUNNER_MAX_PARALLEL");
        override_u64(
            &mut self.runner.default_timeout_secs,
            "TESTGATE_RUNNER_DEFAULT_TIMEOUT_SECS",
        );

        // Leak check
        override_bool(&mut self.leak_check.enabled, "TESTGATE_LEAK_CHECK_ENABLED");
        override_u64(
            &mut self.leak_check.initial_delay_secs,
            "TESTGATE_LEAK_CHECK_INITIAL_DELAY_SECS",
        );
        override_u64(
            &mut self.leak_check.poll_interval_secs,
            "TESTGATE_LEAK_CHECK_POLL_INTERVAL_SECS",
        );
        override_u64(
            &mut self.leak_check.max_poll_interval_secs,
            "TESTGATE_LEAK_CHECK_MAX_POLL_INTERVAL_SECS",
        );
        override_u64(
            &mut self.leak_check.max_wait_secs,
            "TESTGATE_LEAK_CHECK_MAX_WAIT_SECS",
        );
        override_u64(
            &mut self.leak_check.query_timeout_secs,
            "TESTGATE_LEAK_CHECK_QUERY_TIMEOUT_SECS",
        );
        override_csv(
            &mut self.leak_check.running_states,
            "TESTGATE_LEAK_CHECK_RUNNING_STATES",
        );
        override_string(
            &mut self.leak_check.resource_pattern,
            "TESTGATE_LEAK_CHECK_RESOURCE_PATTERN",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TestgateError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.planner.taxonomy.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "planner.taxonomy".to_owned(),
                reason: "taxonomy must contain at least one tag".to_owned(),
            }
            .into());
        }

        if self.runner.pytest_command.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "runner.pytest_command".to_owned(),
                reason: "command must not be empty".to_owned(),
            }
            .into());
        }

        if self.runner.max_parallel == 0 || self.runner.max_parallel > MAX_PARALLEL {
            return Err(ConfigError::InvalidValue {
                field: "runner.max_parallel".to_owned(),
                reason: format!("must be 1-{MAX_PARALLEL}"),
            }
            .into());
        }

        if self.runner.default_timeout_secs == 0
            || self.runner.default_timeout_secs > MAX_BUCKET_TIMEOUT_SECS
        {
            return Err(ConfigError::InvalidValue {
                field: "runner.default_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_BUCKET_TIMEOUT_SECS}"),
            }
            .into());
        }

        self.leak_check.validate()?;

        // 프로파일 이름 중복 검사
        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if profile.name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "profiles.name".to_owned(),
                    reason: "profile name must not be empty".to_owned(),
                }
                .into());
            }
            if !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "profiles.name".to_owned(),
                    reason: format!("duplicate profile '{}'", profile.name),
                }
                .into());
            }
        }

        Ok(())
    }

    /// 이름으로 프로파일을 찾습니다.
    pub fn profile(&self, name: &str) -> Option<&ProvisioningProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 플래너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// 버킷 매트릭스 YAML 경로 (비어있으면 내장 매트릭스)
    pub matrix_path: String,
    /// 코퍼스 스냅샷 YAML 경로
    pub corpus_path: String,
    /// 허용된 태그 분류 체계
    pub taxonomy: Vec<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            matrix_path: String::new(),
            corpus_path: "tests/corpus.yml".to_owned(),
            taxonomy: DEFAULT_TAXONOMY.iter().map(|t| (*t).to_owned()).collect(),
        }
    }
}

/// 버킷 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// 테스트 러너 명령 (argv 접두사)
    pub pytest_command: Vec<String>,
    /// 테스트 경로
    pub test_path: String,
    /// 동시에 실행할 최대 버킷 수
    pub max_parallel: usize,
    /// 버킷에 타임아웃이 없을 때 사용할 기본값 (초)
    pub default_timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pytest_command: vec!["pytest".to_owned(), "-v".to_owned()],
            test_path: "tests".to_owned(),
            max_parallel: 8,
            default_timeout_secs: 60 * 60,
        }
    }
}

/// 누수 검사 설정
///
/// 고정 300초 대기 대신 상한이 있는 폴링-백오프 루프를 사용합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeakCheckConfig {
    /// 활성화 여부 (release 레벨에서만 실행됨)
    pub enabled: bool,
    /// 첫 조회 전 유예 시간 (초)
    pub initial_delay_secs: u64,
    /// 기본 폴링 간격 (초), 매 시도마다 두 배
    pub poll_interval_secs: u64,
    /// 폴링 간격 상한 (초), 조회 실패 시 이 값으로 상향
    pub max_poll_interval_secs: u64,
    /// 최대 대기 시간 (초)
    pub max_wait_secs: u64,
    /// 상태 명령 1회 실행 타임아웃 (초)
    pub query_timeout_secs: u64,
    /// "실행 중"으로 간주하는 상태 값
    pub running_states: Vec<String>,
    /// 이번 CI 실행에 귀속되는 자원 이름 정규식
    ///
    /// 기본값 `.*`는 러너의 상태 목록 전체를 이번 실행의 자원으로 봅니다.
    /// CI 러너는 매 실행마다 새로 생성되므로 목록에는 이번 실행이 띄운
    /// 클러스터만 남습니다. 공유 계정에서는 CI 접두사로 좁혀야 합니다.
    pub resource_pattern: String,
    /// 상태 명령 출력 한 줄을 파싱하는 정규식 (`name`, `status` 그룹 필수)
    pub status_line_pattern: String,
}

impl Default for LeakCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_secs: 30,
            poll_interval_secs: 15,
            max_poll_interval_secs: 120,
            max_wait_secs: 900,
            query_timeout_secs: 120,
            running_states: vec!["UP".to_owned(), "INIT".to_owned()],
            resource_pattern: ".*".to_owned(),
            status_line_pattern: r"^(?P<name>\S+)\s+.*?\b(?P<status>UP|INIT|STOPPED)\b".to_owned(),
        }
    }
}

impl LeakCheckConfig {
    /// 누수 검사 설정의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "leak_check.poll_interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.max_poll_interval_secs < self.poll_interval_secs {
            return Err(ConfigError::InvalidValue {
                field: "leak_check.max_poll_interval_secs".to_owned(),
                reason: "must be >= poll_interval_secs".to_owned(),
            });
        }
        if self.max_wait_secs == 0 || self.max_wait_secs > MAX_LEAK_WAIT_SECS {
            return Err(ConfigError::InvalidValue {
                field: "leak_check.max_wait_secs".to_owned(),
                reason: format!("must be 1-{MAX_LEAK_WAIT_SECS}"),
            });
        }
        if self.initial_delay_secs > self.max_wait_secs {
            return Err(ConfigError::InvalidValue {
                field: "leak_check.initial_delay_secs".to_owned(),
                reason: "must not exceed max_wait_secs".to_owned(),
            });
        }
        if self.query_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "leak_check.query_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.running_states.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "leak_check.running_states".to_owned(),
                reason: "at least one running state is required".to_owned(),
            });
        }

        let line = compile_pattern("leak_check.status_line_pattern", &self.status_line_pattern)?;
        for group in ["name", "status"] {
            if !line.capture_names().flatten().any(|n| n == group) {
                return Err(ConfigError::InvalidValue {
                    field: "leak_check.status_line_pattern".to_owned(),
                    reason: format!("missing named capture group '{group}'"),
                });
            }
        }
        compile_pattern("leak_check.resource_pattern", &self.resource_pattern)?;
        Ok(())
    }
}

fn compile_pattern(field: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: e.to_string(),
    })
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = TestgateConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.planner.taxonomy.len(), 7);
        assert!(config.planner.matrix_path.is_empty());
        assert!(config.leak_check.enabled);
        assert_eq!(config.runner.pytest_command, vec!["pytest", "-v"]);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = TestgateConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = TestgateConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.leak_check.running_states, vec!["UP", "INIT"]);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[leak_check]
max_wait_secs = 1200
"#;
        let config = TestgateConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.leak_check.max_wait_secs, 1200);
        assert_eq!(config.leak_check.poll_interval_secs, 15);
    }

    #[test]
    fn from_str_full_toml_with_profiles() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "pretty"

[planner]
matrix_path = "ci/matrix.yml"
corpus_path = "ci/corpus.yml"
taxonomy = ["clustertest", "ondemand"]

[runner]
pytest_command = ["python", "-m", "pytest", "-v"]
test_path = "tests/"
max_parallel = 4
default_timeout_secs = 5400

[leak_check]
enabled = true
initial_delay_secs = 10
poll_interval_secs = 5
max_poll_interval_secs = 60
max_wait_secs = 300
running_states = ["UP"]
resource_pattern = "^rh-ci-"

[[profiles]]
name = "aws"
kind = "aws"
target = "arn:aws:iam::123456789012:role/ci"
auth = "logged_in"
status_command = ["sky", "status", "--refresh"]
secret_env = ["AWS_ROLE_ARN", "DEN_TESTER_TOKEN"]

[profiles.env]
AWS_REGION = "us-east-1"

[[profiles]]
name = "local"
"#;
        let config = TestgateConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.planner.taxonomy.len(), 2);
        assert_eq!(config.runner.max_parallel, 4);
        assert_eq!(config.leak_check.resource_pattern, "^rh-ci-");
        assert_eq!(config.profiles.len(), 2);

        let aws = config.profile("aws").unwrap();
        assert!(aws.is_leak_check_target());
        assert_eq!(aws.secret_env.len(), 2);
        assert_eq!(aws.env["AWS_REGION"], "us-east-1");

        let local = config.profile("local").unwrap();
        assert!(!local.is_leak_check_target());
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = TestgateConfig::parse("invalid = [[[toml");
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            TestgateError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = TestgateConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = TestgateConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_parallelism() {
        let mut config = TestgateConfig::default();
        config.runner.max_parallel = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_parallel"));
    }

    #[test]
    fn validate_rejects_empty_taxonomy() {
        let mut config = TestgateConfig::default();
        config.planner.taxonomy.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("taxonomy"));
    }

    #[test]
    fn validate_rejects_inverted_poll_intervals() {
        let mut config = TestgateConfig::default();
        config.leak_check.poll_interval_secs = 60;
        config.leak_check.max_poll_interval_secs = 30;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_poll_interval_secs"));
    }

    #[test]
    fn validate_rejects_grace_longer_than_max_wait() {
        let mut config = TestgateConfig::default();
        config.leak_check.initial_delay_secs = 1000;
        config.leak_check.max_wait_secs = 100;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("initial_delay_secs"));
    }

    #[test]
    fn validate_rejects_status_pattern_without_groups() {
        let mut config = TestgateConfig::default();
        config.leak_check.status_line_pattern = r"^(\S+)\s+(\S+)".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("status_line_pattern"));
    }

    #[test]
    fn validate_rejects_malformed_patterns() {
        let mut config = TestgateConfig::default();
        config.leak_check.resource_pattern = "[".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("leak_check.resource_pattern"));

        let mut config = TestgateConfig::default();
        config.leak_check.status_line_pattern = r"^(?P<name>\S+\s+(?P<status>\S+)".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("leak_check.status_line_pattern"));
    }

    #[test]
    fn default_resource_pattern_attributes_every_cluster() {
        let pattern = Regex::new(&LeakCheckConfig::default().resource_pattern).unwrap();
        assert!(pattern.is_match("rh-ci-ondemand-aws"));
        assert!(pattern.is_match("dev-notebook"));
    }

    #[test]
    fn validate_accepts_angle_bracket_group_syntax() {
        let mut config = TestgateConfig::default();
        config.leak_check.status_line_pattern = r"^(?<name>\S+)\s+(?<status>\S+)$".to_owned();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_profiles() {
        let mut config = TestgateConfig::default();
        config.profiles = vec![
            ProvisioningProfile::new("aws", crate::types::ProfileKind::Aws),
            ProvisioningProfile::new("aws", crate::types::ProfileKind::Gcp),
        ];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate profile"));
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_TESTGATE_STR", "overridden") };
        override_string(&mut val, "TEST_TESTGATE_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_TESTGATE_STR") };
    }

    #[test]
    #[serial]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = false;
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_TESTGATE_BOOL_BAD", "not-a-bool") };
        override_bool(&mut val, "TEST_TESTGATE_BOOL_BAD");
        assert!(!val);
        unsafe { std::env::remove_var("TEST_TESTGATE_BOOL_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_csv_skips_blank_items() {
        let mut val = vec!["a".to_owned()];
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_TESTGATE_CSV", "UP, INIT, ,") };
        override_csv(&mut val, "TEST_TESTGATE_CSV");
        assert_eq!(val, vec!["UP", "INIT"]);
        unsafe { std::env::remove_var("TEST_TESTGATE_CSV") };
    }

    #[test]
    #[serial]
    fn apply_env_overrides_updates_sections() {
        let mut config = TestgateConfig::default();
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe {
            std::env::set_var("TESTGATE_RUNNER_MAX_PARALLEL", "3");
            std::env::set_var("TESTGATE_LEAK_CHECK_ENABLED", "false");
        }
        config.apply_env_overrides();
        assert_eq!(config.runner.max_parallel, 3);
        assert!(!config.leak_check.enabled);
        unsafe {
            std::env::remove_var("TESTGATE_RUNNER_MAX_PARALLEL");
            std::env::remove_var("TESTGATE_LEAK_CHECK_ENABLED");
        }
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = TestgateConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = TestgateConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(
            config.leak_check.status_line_pattern,
            parsed.leak_check.status_line_pattern
        );
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = TestgateConfig::from_file("/nonexistent/path/testgate.toml").await;
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            TestgateError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
