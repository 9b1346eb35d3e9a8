//! 실행 계획
//!
//! [`Planner`]는 트리거 이벤트를 받아 게이트 상태를 결정하고, 활성 버킷의
//! 파티션을 검증한 뒤 불변 [`Plan`]을 생성합니다. 결함이 있으면 계획을
//! 거부합니다.

use std::path::Path;

use metrics::{counter, gauge};
use serde::Serialize;
use testgate_core::config::TestgateConfig;
use testgate_core::metrics as m;
use testgate_core::types::{ProvisioningProfile, TriggerEvent, TriggerLevel};

use crate::builtin::{builtin_matrix, merge_profiles};
use crate::corpus::{Corpus, CorpusLoader};
use crate::error::PlannerError;
use crate::gate::GateState;
use crate::matrix::{Bucket, Matrix, MatrixLoader};
use crate::verify::{LintWarning, PartitionReport, verify_partition};

/// 계획된 버킷 -- 버킷 정의, 해석된 프로파일, 선택된 테스트
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedBucket {
    pub bucket: Bucket,
    pub profile: ProvisioningProfile,
    pub tests: Vec<String>,
}

/// 검증을 통과한 불변 실행 계획
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    trigger: TriggerEvent,
    gate: GateState,
    level: TriggerLevel,
    buckets: Vec<PlannedBucket>,
    leak_check: bool,
    leak_check_targets: Vec<ProvisioningProfile>,
    warnings: Vec<LintWarning>,
}

impl Plan {
    pub fn trigger(&self) -> TriggerEvent {
        self.trigger
    }

    pub fn gate(&self) -> GateState {
        self.gate
    }

    pub fn level(&self) -> TriggerLevel {
        self.level
    }

    /// 활성 버킷 (선언 순서)
    pub fn buckets(&self) -> &[PlannedBucket] {
        &self.buckets
    }

    pub fn bucket_names(&self) -> Vec<&str> {
        self.buckets.iter().map(|b| b.bucket.name.as_str()).collect()
    }

    /// 누수 검사 예약 여부
    pub fn leak_check_scheduled(&self) -> bool {
        self.leak_check
    }

    /// 누수 검사 대상 프로파일 (활성 버킷이 참조하는 클라우드 프로파일, 중복 제거)
    pub fn leak_check_targets(&self) -> &[ProvisioningProfile] {
        &self.leak_check_targets
    }

    pub fn warnings(&self) -> &[LintWarning] {
        &self.warnings
    }

    /// 출력용으로 프로파일 비밀을 가린 사본
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for planned in &mut copy.buckets {
            planned.profile = planned.profile.redacted();
        }
        for target in &mut copy.leak_check_targets {
            *target = target.redacted();
        }
        copy
    }
}

/// 계획 수립기
///
/// {분류 체계, 매트릭스, 코퍼스, 프로파일}을 보관하며, 생성 이후 변경되지 않습니다.
#[derive(Debug, Clone)]
pub struct Planner {
    taxonomy: Vec<String>,
    matrix: Matrix,
    corpus: Corpus,
    profiles: Vec<ProvisioningProfile>,
}

impl Planner {
    /// 매트릭스가 참조하는 프로파일을 확인하고 플래너를 생성합니다.
    pub fn new(
        taxonomy: Vec<String>,
        matrix: Matrix,
        corpus: Corpus,
        profiles: Vec<ProvisioningProfile>,
    ) -> Result<Self, PlannerError> {
        matrix.check_profiles(&profiles)?;
        Ok(Self {
            taxonomy,
            matrix,
            corpus,
            profiles,
        })
    }

    /// 설정에서 매트릭스, 코퍼스, 프로파일을 로드합니다.
    ///
    /// `planner.matrix_path`가 비어있으면 내장 매트릭스를 사용하고,
    /// 설정된 프로파일은 같은 이름의 기본 프로파일을 덮어씁니다.
    pub async fn from_config(config: &TestgateConfig) -> Result<Self, PlannerError> {
        let matrix = load_matrix(&config.planner.matrix_path).await?;
        let corpus = CorpusLoader::load_file(&config.planner.corpus_path).await?;
        let profiles = merge_profiles(&config.profiles);
        Self::new(config.planner.taxonomy.clone(), matrix, corpus, profiles)
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn profiles(&self) -> &[ProvisioningProfile] {
        &self.profiles
    }

    /// 주어진 레벨의 파티션을 검증합니다.
    pub fn verify(&self, level: TriggerLevel) -> PartitionReport {
        let report = verify_partition(&self.taxonomy, &self.matrix, &self.corpus, level);

        gauge!(m::PLAN_ORPHANS).set(report.orphans.len() as f64);
        gauge!(m::PLAN_DUPLICATES).set(report.duplicates.len() as f64);
        gauge!(m::PLAN_EMPTY_BUCKETS).set(report.empty_buckets.len() as f64);

        for warning in &report.warnings {
            tracing::warn!(level = %level, warning = %warning, "selector lint");
        }

        report
    }

    /// 트리거 이벤트에 대한 실행 계획을 수립합니다.
    ///
    /// # Errors
    /// 활성 버킷에 고아/중복/빈 버킷이 있으면 [`PlannerError::PartitionViolated`]
    pub fn plan(&self, trigger: TriggerEvent) -> Result<Plan, PlannerError> {
        let gate = GateState::from_trigger(trigger);
        let level = gate.level();

        let report = self.verify(level);
        if let Err(e) = report.ensure_clean() {
            tracing::error!(
                trigger = %trigger,
                orphans = ?report.orphans,
                duplicates = report.duplicates.len(),
                empty_buckets = ?report.empty_buckets,
                "plan rejected"
            );
            return Err(e);
        }

        let mut buckets = Vec::with_capacity(report.selections.len());
        let mut leak_check_targets: Vec<ProvisioningProfile> = Vec::new();

        for (bucket, selection) in self.matrix.active(level).zip(report.selections) {
            let profile = self.profile(&bucket.name, &bucket.profile)?;
            if profile.is_leak_check_target()
                && !leak_check_targets.iter().any(|p| p.name == profile.name)
            {
                leak_check_targets.push(profile.clone());
            }
            buckets.push(PlannedBucket {
                bucket: bucket.clone(),
                profile: profile.clone(),
                tests: selection.tests,
            });
        }

        counter!(m::PLANS_TOTAL, m::LABEL_LEVEL => level.as_str()).increment(1);

        tracing::info!(
            trigger = %trigger,
            gate = %gate,
            level = %level,
            buckets = buckets.len(),
            leak_check = gate.schedules_leak_check(),
            "plan accepted"
        );

        Ok(Plan {
            trigger,
            gate,
            level,
            buckets,
            leak_check: gate.schedules_leak_check(),
            leak_check_targets,
            warnings: report.warnings,
        })
    }

    fn profile(&self, bucket: &str, name: &str) -> Result<&ProvisioningProfile, PlannerError> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| PlannerError::InvalidBucket {
                bucket: bucket.to_owned(),
                reason: format!("unknown profile '{name}'"),
            })
    }
}

/// 경로가 비어있으면 내장 매트릭스를, 아니면 파일을 로드합니다.
pub async fn load_matrix(path: &str) -> Result<Matrix, PlannerError> {
    if path.trim().is_empty() {
        tracing::debug!("using builtin bucket matrix");
        return builtin_matrix();
    }
    MatrixLoader::load_file(Path::new(path)).await
}
