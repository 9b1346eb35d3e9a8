//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 셀렉터, 플래너, 누수 검사, 러너가 공유하는 데이터 구조를 정의합니다.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 기본 태그 분류 체계
///
/// 외부 테스트 스위트가 테스트 케이스에 부여하는 카테고리 레이블입니다.
pub const DEFAULT_TAXONOMY: [&str; 7] = [
    "clustertest",
    "ondemand",
    "multinode",
    "servertest",
    "secrettest",
    "moduletest",
    "functiontest",
];

/// 테스트 태그
///
/// 대소문자를 구분하는 불투명 문자열 레이블입니다. 순서나 계층은 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// 새 태그를 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// 태그 이름을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// 테스트 케이스에 부여된 태그 집합
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<Tag>);

impl TagSet {
    /// 빈 태그 집합을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 태그 포함 여부 (대소문자 구분)
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// 태그를 추가합니다.
    pub fn insert(&mut self, tag: impl Into<Tag>) -> bool {
        self.0.insert(tag.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }
}

impl<T: Into<Tag>> FromIterator<T> for TagSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Tag::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// 테스트 케이스
///
/// 외부 테스트 스위트가 소유하는 엔티티입니다. 실행 중에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// 정규화된 테스트 이름 (예: `tests/test_cluster.py::test_up[ondemand_aws_cluster]`)
    pub name: String,
    /// 부여된 태그
    #[serde(default)]
    pub tags: TagSet,
    /// 이 테스트가 적용되는 트리거 레벨 (비어있으면 모든 레벨)
    #[serde(default)]
    pub levels: Vec<TriggerLevel>,
}

impl TestCase {
    /// 태그와 함께 새 테스트 케이스를 생성합니다.
    pub fn new<I, T>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        Self {
            name: name.into(),
            tags: tags.into_iter().collect(),
            levels: Vec::new(),
        }
    }

    /// 적용 레벨을 제한합니다.
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = TriggerLevel>) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    /// 주어진 레벨에서 이 테스트가 실행 대상인지 여부
    pub fn applies_to(&self, level: TriggerLevel) -> bool {
        self.levels.is_empty() || self.levels.contains(&level)
    }
}

/// 트리거 레벨 -- 활성 버킷 집합을 결정하는 범위 구분자
///
/// 외부 테스트 러너에 `--level` 인자로 그대로 전달됩니다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TriggerLevel {
    /// push / PR -- 라이브 클라우드 계정을 사용하지 않음
    Local,
    /// 야간 / 수동 -- 실제 클라우드 및 K8s 프로비저닝 포함
    Release,
}

impl TriggerLevel {
    /// 모든 레벨
    pub const ALL: [Self; 2] = [Self::Local, Self::Release];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Release => "release",
        }
    }

    /// 이 레벨이 클라우드 자원을 프로비저닝하는지 여부
    pub fn provisions_cloud(self) -> bool {
        matches!(self, Self::Release)
    }
}

impl fmt::Display for TriggerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "release" => Ok(Self::Release),
            other => Err(ConfigError::InvalidValue {
                field: "level".to_owned(),
                reason: format!("unknown trigger level '{other}' (expected local, release)"),
            }),
        }
    }
}

/// CI 트리거 이벤트
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    /// 브랜치 push
    Push,
    /// 풀 리퀘스트
    PullRequest,
    /// 수동 실행 (`workflow_dispatch`)
    WorkflowDispatch,
    /// 예약 실행 (cron)
    Schedule,
}

impl TriggerEvent {
    pub const ALL: [Self; 4] = [
        Self::Push,
        Self::PullRequest,
        Self::WorkflowDispatch,
        Self::Schedule,
    ];

    /// CI 제공자의 이벤트 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::PullRequest => "pull_request",
            Self::WorkflowDispatch => "workflow_dispatch",
            Self::Schedule => "schedule",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerEvent {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(Self::Push),
            "pull_request" | "pr" => Ok(Self::PullRequest),
            "workflow_dispatch" | "manual" => Ok(Self::WorkflowDispatch),
            "schedule" | "nightly" | "cron" => Ok(Self::Schedule),
            other => Err(ConfigError::InvalidValue {
                field: "trigger".to_owned(),
                reason: format!(
                    "unknown trigger '{other}' (expected push, pull_request, workflow_dispatch, schedule)"
                ),
            }),
        }
    }
}

/// 테스트 세션의 인증 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// 로그인하지 않은 상태
    #[default]
    LoggedOut,
    /// API 토큰으로 로그인한 상태
    LoggedIn,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => write!(f, "logged-out"),
            Self::LoggedIn => write!(f, "logged-in"),
        }
    }
}

/// 프로비저닝 대상 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// 로컬 클러스터 (클라우드 자원 없음)
    #[default]
    Local,
    Aws,
    Gcp,
    Kubernetes,
}

impl ProfileKind {
    pub fn is_cloud(self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Aws => write!(f, "aws"),
            Self::Gcp => write!(f, "gcp"),
            Self::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

/// 프로비저닝 프로파일 -- 버킷이 대상으로 하는 자격 증명과 컨텍스트
///
/// 자격 증명 값 자체는 보관하지 않습니다. `secret_env`는 실행 시점에
/// 프로세스 환경에서 읽어 그대로 전달할 환경변수 *이름* 목록입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningProfile {
    /// 프로파일 이름 (버킷에서 참조)
    pub name: String,
    /// 대상 식별자 (클라우드 계정, K8s 컨텍스트, API 엔드포인트 등)
    #[serde(default)]
    pub target: String,
    /// 대상 종류
    #[serde(default)]
    pub kind: ProfileKind,
    /// 테스트 세션의 인증 상태
    #[serde(default)]
    pub auth: AuthState,
    /// 실행 중인 자원을 조회하는 읽기 전용 명령 (argv)
    #[serde(default)]
    pub status_command: Vec<String>,
    /// 전달할 비밀 환경변수 이름
    #[serde(default)]
    pub secret_env: Vec<String>,
    /// 비밀이 아닌 추가 환경변수
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ProvisioningProfile {
    /// 이름과 종류로 최소 프로파일을 생성합니다.
    pub fn new(name: impl Into<String>, kind: ProfileKind) -> Self {
        Self {
            name: name.into(),
            target: String::new(),
            kind,
            auth: AuthState::default(),
            status_command: Vec::new(),
            secret_env: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// 누수 검사 대상인지 여부 (클라우드 대상이고 상태 명령이 있음)
    pub fn is_leak_check_target(&self) -> bool {
        self.kind.is_cloud() && !self.status_command.is_empty()
    }

    /// 출력용으로 비밀 정보를 가린 사본을 반환합니다.
    ///
    /// `secret_env` 이름은 유지하되 같은 이름의 `env` 값은 `***`로 치환합니다.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for (key, value) in copy.env.iter_mut() {
            if self.secret_env.iter().any(|s| s == key) || looks_secret(key) {
                *value = "***".to_owned();
            }
        }
        copy
    }
}

fn looks_secret(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    ["TOKEN", "SECRET", "PASSWORD", "KEY", "CREDENTIAL"]
        .iter()
        .any(|needle| upper.contains(needle))
}

/// 버킷 실행의 최종 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BucketOutcome {
    /// 모든 테스트 통과
    Succeeded,
    /// 테스트 실패 또는 러너 오류
    Failed {
        /// 프로세스 종료 코드 (시그널 종료 시 None)
        exit_code: Option<i32>,
        reason: String,
    },
    /// 타임아웃 초과 (재시도하지 않음)
    TimedOut { timeout_secs: u64 },
    /// 운영자 취소
    Cancelled,
}

impl BucketOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// 메트릭 레이블용 고정 이름
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BucketOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed {
                exit_code: Some(code),
                reason,
            } => write!(f, "failed (exit {code}): {reason}"),
            Self::Failed {
                exit_code: None,
                reason,
            } => write!(f, "failed: {reason}"),
            Self::TimedOut { timeout_secs } => write!(f, "timed out after {timeout_secs}s"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
