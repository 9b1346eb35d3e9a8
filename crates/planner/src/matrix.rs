//! 실행 버킷 매트릭스
//!
//! 버킷은 {이름, 트리거 레벨, 마커 셀렉터, 키워드 셀렉터, 프로파일, 타임아웃,
//! 배타 그룹}으로 구성됩니다. 매트릭스는 YAML 파일 또는 내장 정의에서
//! 한 번 로드된 후 변경되지 않습니다.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use testgate_core::config::MAX_BUCKET_TIMEOUT_SECS;
use testgate_core::types::{ProvisioningProfile, TestCase, TriggerLevel};
use testgate_selector::Selector;

use crate::error::PlannerError;

/// 매트릭스 파일 최대 크기
const MAX_MATRIX_FILE_SIZE: u64 = 1024 * 1024; // 1MB
/// 매트릭스당 최대 버킷 수
const MAX_BUCKETS: usize = 256;

/// 실행 버킷
///
/// 마커 셀렉터는 태그에 대해, 키워드 셀렉터는 테스트 이름에 대해 평가되며
/// 두 조건을 모두 만족하는 테스트가 이 버킷에 선택됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    /// 버킷 이름 (매트릭스 내 고유)
    pub name: String,
    /// 이 버킷이 활성화되는 트리거 레벨
    pub level: TriggerLevel,
    /// 태그 셀렉터 (pytest `-m`)
    pub marker: Selector,
    /// 이름 키워드 셀렉터 (pytest `-k`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<Selector>,
    /// 참조하는 프로비저닝 프로파일 이름
    pub profile: String,
    /// 타임아웃 (없으면 러너 기본값)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// 배타 그룹 -- 같은 그룹의 버킷은 같은 테스트를 선택할 수 없음
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_group: Option<String>,
}

impl Bucket {
    /// 마커 표현식으로 버킷을 생성합니다.
    pub fn new(
        name: impl Into<String>,
        level: TriggerLevel,
        marker: &str,
        profile: impl Into<String>,
    ) -> Result<Self, PlannerError> {
        let name = name.into();
        let marker = parse_selector(&name, marker)?;
        Ok(Self {
            name,
            level,
            marker,
            keyword: None,
            profile: profile.into(),
            timeout_secs: None,
            exclusive_group: None,
        })
    }

    /// 키워드 셀렉터를 지정합니다.
    pub fn with_keyword(mut self, keyword: &str) -> Result<Self, PlannerError> {
        self.keyword = Some(parse_selector(&self.name, keyword)?);
        Ok(self)
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_exclusive_group(mut self, group: impl Into<String>) -> Self {
        self.exclusive_group = Some(group.into());
        self
    }

    /// 테스트가 이 버킷에 선택되는지 판정합니다.
    pub fn selects(&self, test: &TestCase) -> bool {
        self.marker.matches_tags(&test.tags)
            && self
                .keyword
                .as_ref()
                .is_none_or(|keyword| keyword.matches_keywords(&test.name))
    }

    /// 기본값을 적용한 실제 타임아웃
    pub fn effective_timeout(&self, default_secs: u64) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(default_secs))
    }

    fn validate(&self) -> Result<(), PlannerError> {
        if self.name.trim().is_empty() {
            return Err(PlannerError::InvalidBucket {
                bucket: self.name.clone(),
                reason: "name must not be empty".to_owned(),
            });
        }

        if self.profile.trim().is_empty() {
            return Err(PlannerError::InvalidBucket {
                bucket: self.name.clone(),
                reason: "profile must not be empty".to_owned(),
            });
        }

        if let Some(secs) = self.timeout_secs
            && (secs == 0 || secs > MAX_BUCKET_TIMEOUT_SECS)
        {
            return Err(PlannerError::InvalidBucket {
                bucket: self.name.clone(),
                reason: format!("timeout_secs must be 1-{MAX_BUCKET_TIMEOUT_SECS}, got {secs}"),
            });
        }

        if self
            .exclusive_group
            .as_ref()
            .is_some_and(|g| g.trim().is_empty())
        {
            return Err(PlannerError::InvalidBucket {
                bucket: self.name.clone(),
                reason: "exclusive_group must not be blank".to_owned(),
            });
        }

        Ok(())
    }
}

fn parse_selector(bucket: &str, expr: &str) -> Result<Selector, PlannerError> {
    Selector::parse(expr).map_err(|source| PlannerError::Selector {
        bucket: bucket.to_owned(),
        source,
    })
}

/// YAML 파일의 버킷 항목
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BucketDefinition {
    name: String,
    level: TriggerLevel,
    marker: String,
    #[serde(default)]
    keyword: Option<String>,
    profile: String,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    exclusive_group: Option<String>,
}

impl TryFrom<BucketDefinition> for Bucket {
    type Error = PlannerError;

    fn try_from(def: BucketDefinition) -> Result<Self, Self::Error> {
        let mut bucket = Bucket::new(def.name, def.level, &def.marker, def.profile)?;
        if let Some(keyword) = def.keyword {
            bucket = bucket.with_keyword(&keyword)?;
        }
        bucket.timeout_secs = def.timeout_secs;
        bucket.exclusive_group = def.exclusive_group;
        Ok(bucket)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MatrixFile {
    buckets: Vec<BucketDefinition>,
}

/// 검증된 버킷 매트릭스
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Matrix {
    buckets: Vec<Bucket>,
}

impl Matrix {
    /// 버킷 목록을 검증하고 매트릭스를 생성합니다.
    ///
    /// # Errors
    /// - 버킷 이름이 비어있거나 중복된 경우
    /// - 타임아웃이 허용 범위를 벗어난 경우
    /// - 버킷 수가 `MAX_BUCKETS`를 초과하는 경우
    pub fn new(buckets: Vec<Bucket>) -> Result<Self, PlannerError> {
        if buckets.len() > MAX_BUCKETS {
            return Err(PlannerError::InvalidBucket {
                bucket: "*".to_owned(),
                reason: format!("too many buckets: {} (max: {MAX_BUCKETS})", buckets.len()),
            });
        }

        let mut seen = HashSet::new();
        for bucket in &buckets {
            bucket.validate()?;
            if !seen.insert(bucket.name.as_str()) {
                return Err(PlannerError::InvalidBucket {
                    bucket: bucket.name.clone(),
                    reason: "duplicate bucket name".to_owned(),
                });
            }
        }

        Ok(Self { buckets })
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// 이름으로 버킷을 찾습니다.
    pub fn get(&self, name: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.name == name)
    }

    /// 주어진 레벨에서 활성화되는 버킷 (선언 순서 유지)
    pub fn active(&self, level: TriggerLevel) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter().filter(move |b| b.level == level)
    }

    /// 모든 버킷이 존재하는 프로파일을 참조하는지 확인합니다.
    pub fn check_profiles(&self, profiles: &[ProvisioningProfile]) -> Result<(), PlannerError> {
        for bucket in &self.buckets {
            if !profiles.iter().any(|p| p.name == bucket.profile) {
                return Err(PlannerError::InvalidBucket {
                    bucket: bucket.name.clone(),
                    reason: format!("unknown profile '{}'", bucket.profile),
                });
            }
        }
        Ok(())
    }
}

/// 매트릭스 파일 로더
pub struct MatrixLoader;

impl MatrixLoader {
    /// YAML 매트릭스 파일을 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Matrix, PlannerError> {
        let path = path.as_ref();
        let load_err = |reason: String| PlannerError::MatrixLoad {
            path: path.display().to_string(),
            reason,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| load_err(format!("failed to read file metadata: {e}")))?;

        if metadata.len() > MAX_MATRIX_FILE_SIZE {
            return Err(load_err(format!(
                "file too large: {} bytes (max: {MAX_MATRIX_FILE_SIZE})",
                metadata.len()
            )));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| load_err(format!("failed to read file: {e}")))?;

        let matrix = Self::parse_yaml(&content, &path.display().to_string())?;

        tracing::info!(
            path = %path.display(),
            buckets = matrix.len(),
            "loaded bucket matrix"
        );

        Ok(matrix)
    }

    /// YAML 문자열을 파싱하여 매트릭스를 생성합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<Matrix, PlannerError> {
        let file: MatrixFile =
            serde_yaml::from_str(yaml_str).map_err(|e| PlannerError::MatrixLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        let buckets = file
            .buckets
            .into_iter()
            .map(Bucket::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Matrix::new(buckets)
    }
}
