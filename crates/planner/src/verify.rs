//! 파티션 검증
//!
//! {분류 체계, 매트릭스, 코퍼스, 레벨}에 대한 순수 함수입니다.
//! 첫 번째 결함에서 멈추지 않고 모든 고아/중복/빈 버킷을 수집합니다.
//!
//! - 고아: 적용 대상 테스트인데 활성 버킷 어디에도 선택되지 않음
//! - 중복: 같은 배타 그룹 안에서 두 개 이상의 버킷에 선택됨
//! - 빈 버킷: 활성 버킷이 아무 테스트도 선택하지 않음
//! - 린트 경고: 분류 체계에 없는 태그 참조 (실패 아님)

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use testgate_core::types::{Tag, TriggerLevel};

use crate::corpus::Corpus;
use crate::error::PlannerError;
use crate::matrix::Matrix;

/// 버킷별 선택 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSelection {
    pub bucket: String,
    pub tests: Vec<String>,
}

/// 배타 그룹 내 중복 선택
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duplicate {
    pub test: String,
    pub group: String,
    /// 테스트를 선택한 버킷들 (선언 순서)
    pub buckets: Vec<String>,
}

impl fmt::Display for Duplicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} selected by [{}] in group '{}'",
            self.test,
            self.buckets.join(", "),
            self.group
        )
    }
}

/// 린트 경고
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LintWarning {
    /// 버킷 마커가 분류 체계에 없는 태그를 참조
    UnknownSelectorTag { bucket: String, tag: String },
    /// 테스트에 분류 체계에 없는 태그가 부여됨
    UnknownTestTag { test: String, tag: String },
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSelectorTag { bucket, tag } => {
                write!(f, "bucket '{bucket}' references unknown tag '{tag}'")
            }
            Self::UnknownTestTag { test, tag } => {
                write!(f, "test '{test}' carries unknown tag '{tag}'")
            }
        }
    }
}

/// 파티션 검증 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionReport {
    pub level: TriggerLevel,
    /// 적용 대상 테스트 수
    pub applicable: usize,
    /// 활성 버킷별 선택 결과 (선언 순서)
    pub selections: Vec<BucketSelection>,
    pub orphans: Vec<String>,
    pub duplicates: Vec<Duplicate>,
    pub empty_buckets: Vec<String>,
    pub warnings: Vec<LintWarning>,
}

impl PartitionReport {
    /// 고아/중복/빈 버킷이 없는지 여부
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty() && self.duplicates.is_empty() && self.empty_buckets.is_empty()
    }

    /// 결함이 있으면 [`PlannerError::PartitionViolated`]를 반환합니다.
    pub fn ensure_clean(&self) -> Result<(), PlannerError> {
        if self.is_clean() {
            return Ok(());
        }
        Err(PlannerError::PartitionViolated {
            level: self.level.to_string(),
            orphans: self.orphans.len(),
            duplicates: self.duplicates.len(),
            empty: self.empty_buckets.len(),
        })
    }

    /// 버킷 이름으로 선택 결과를 찾습니다.
    pub fn selection(&self, bucket: &str) -> Option<&BucketSelection> {
        self.selections.iter().find(|s| s.bucket == bucket)
    }

    /// 테스트를 선택한 버킷 이름 목록
    pub fn buckets_for(&self, test: &str) -> Vec<&str> {
        self.selections
            .iter()
            .filter(|s| s.tests.iter().any(|t| t == test))
            .map(|s| s.bucket.as_str())
            .collect()
    }
}

/// 주어진 레벨의 활성 버킷이 코퍼스를 올바르게 분할하는지 검증합니다.
pub fn verify_partition(
    taxonomy: &[String],
    matrix: &Matrix,
    corpus: &Corpus,
    level: TriggerLevel,
) -> PartitionReport {
    let active: Vec<_> = matrix.active(level).collect();
    let mut selections: Vec<BucketSelection> = active
        .iter()
        .map(|b| BucketSelection {
            bucket: b.name.clone(),
            tests: Vec::new(),
        })
        .collect();

    let mut orphans = Vec::new();
    let mut duplicates = Vec::new();
    let mut warnings = Vec::new();
    let mut applicable = 0;

    for test in corpus.applicable(level) {
        applicable += 1;

        // 배타 그룹 -> 선택한 버킷 (BTreeMap으로 출력 순서 고정)
        let mut by_group: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        let mut matched = false;

        for (bucket, selection) in active.iter().zip(selections.iter_mut()) {
            if !bucket.selects(test) {
                continue;
            }
            matched = true;
            selection.tests.push(test.name.clone());
            if let Some(group) = bucket.exclusive_group.as_deref() {
                by_group.entry(group).or_default().push(bucket.name.clone());
            }
        }

        if !matched {
            orphans.push(test.name.clone());
        }

        for (group, buckets) in by_group {
            if buckets.len() > 1 {
                duplicates.push(Duplicate {
                    test: test.name.clone(),
                    group: group.to_owned(),
                    buckets,
                });
            }
        }

        for tag in test.tags.iter().map(Tag::as_str) {
            if !taxonomy.iter().any(|t| t == tag) {
                warnings.push(LintWarning::UnknownTestTag {
                    test: test.name.clone(),
                    tag: tag.to_owned(),
                });
            }
        }
    }

    for bucket in &active {
        for tag in bucket.marker.terms() {
            if !taxonomy.iter().any(|t| t == tag) {
                warnings.push(LintWarning::UnknownSelectorTag {
                    bucket: bucket.name.clone(),
                    tag: tag.to_owned(),
                });
            }
        }
    }

    let empty_buckets = selections
        .iter()
        .filter(|s| s.tests.is_empty())
        .map(|s| s.bucket.clone())
        .collect();

    PartitionReport {
        level,
        applicable,
        selections,
        orphans,
        duplicates,
        empty_buckets,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Bucket;
    use testgate_core::types::{DEFAULT_TAXONOMY, TestCase};

    fn taxonomy() -> Vec<String> {
        DEFAULT_TAXONOMY.iter().map(|t| (*t).to_owned()).collect()
    }

    fn local_pair() -> Matrix {
        Matrix::new(vec![
            Bucket::new("not-cluster", TriggerLevel::Local, "not clustertest", "p")
                .unwrap()
                .with_exclusive_group("local"),
            Bucket::new("cluster", TriggerLevel::Local, "clustertest", "p")
                .unwrap()
                .with_exclusive_group("local"),
        ])
        .unwrap()
    }

    #[test]
    fn clean_partition() {
        let corpus = Corpus::new(vec![
            TestCase::new("a", ["moduletest"]),
            TestCase::new("b", ["clustertest"]),
        ])
        .unwrap();

        let report = verify_partition(&taxonomy(), &local_pair(), &corpus, TriggerLevel::Local);
        assert!(report.is_clean());
        assert!(report.ensure_clean().is_ok());
        assert_eq!(report.applicable, 2);
        assert_eq!(report.buckets_for("b"), vec!["cluster"]);
    }

    #[test]
    fn reports_orphans() {
        let matrix = Matrix::new(vec![
            Bucket::new("servers", TriggerLevel::Local, "servertest", "p").unwrap(),
        ])
        .unwrap();
        let corpus = Corpus::new(vec![
            TestCase::new("s", ["servertest"]),
            TestCase::new("lonely", ["moduletest"]),
            TestCase::new("lonelier", Vec::<&str>::new()),
        ])
        .unwrap();

        let report = verify_partition(&taxonomy(), &matrix, &corpus, TriggerLevel::Local);
        assert_eq!(report.orphans, vec!["lonely", "lonelier"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn reports_duplicates_only_within_group() {
        let matrix = Matrix::new(vec![
            Bucket::new("all-a", TriggerLevel::Local, "*", "p")
                .unwrap()
                .with_exclusive_group("g"),
            Bucket::new("servers-a", TriggerLevel::Local, "servertest", "p")
                .unwrap()
                .with_exclusive_group("g"),
            Bucket::new("servers-free", TriggerLevel::Local, "servertest", "p").unwrap(),
        ])
        .unwrap();
        let corpus = Corpus::new(vec![
            TestCase::new("s", ["servertest"]),
            TestCase::new("m", ["moduletest"]),
        ])
        .unwrap();

        let report = verify_partition(&taxonomy(), &matrix, &corpus, TriggerLevel::Local);
        assert_eq!(report.duplicates.len(), 1);
        let dup = &report.duplicates[0];
        assert_eq!(dup.test, "s");
        assert_eq!(dup.group, "g");
        assert_eq!(dup.buckets, vec!["all-a", "servers-a"]);
        assert!(dup.to_string().contains("all-a, servers-a"));
    }

    #[test]
    fn reports_empty_buckets() {
        let matrix = Matrix::new(vec![
            Bucket::new("all", TriggerLevel::Local, "*", "p").unwrap(),
            Bucket::new("secrets", TriggerLevel::Local, "secrettest", "p").unwrap(),
        ])
        .unwrap();
        let corpus = Corpus::new(vec![TestCase::new("m", ["moduletest"])]).unwrap();

        let report = verify_partition(&taxonomy(), &matrix, &corpus, TriggerLevel::Local);
        assert_eq!(report.empty_buckets, vec!["secrets"]);
        assert!(matches!(
            report.ensure_clean(),
            Err(PlannerError::PartitionViolated { empty: 1, .. })
        ));
    }

    #[test]
    fn inactive_levels_are_ignored() {
        let matrix = Matrix::new(vec![
            Bucket::new("local-all", TriggerLevel::Local, "*", "p").unwrap(),
            Bucket::new("release-none", TriggerLevel::Release, "secrettest", "p").unwrap(),
        ])
        .unwrap();
        let corpus = Corpus::new(vec![
            TestCase::new("m", ["moduletest"]),
            TestCase::new("r", ["ondemand"]).with_levels([TriggerLevel::Release]),
        ])
        .unwrap();

        let report = verify_partition(&taxonomy(), &matrix, &corpus, TriggerLevel::Local);
        assert!(report.is_clean());
        assert_eq!(report.applicable, 1);
        assert!(report.selection("release-none").is_none());
    }

    #[test]
    fn lint_warns_on_unknown_tags() {
        let matrix = Matrix::new(vec![
            Bucket::new("all", TriggerLevel::Local, "not gputest", "p").unwrap(),
        ])
        .unwrap();
        let corpus = Corpus::new(vec![TestCase::new("t", ["flaky"])]).unwrap();

        let report = verify_partition(&taxonomy(), &matrix, &corpus, TriggerLevel::Local);
        assert!(report.is_clean());
        assert_eq!(
            report.warnings,
            vec![
                LintWarning::UnknownTestTag {
                    test: "t".to_owned(),
                    tag: "flaky".to_owned(),
                },
                LintWarning::UnknownSelectorTag {
                    bucket: "all".to_owned(),
                    tag: "gputest".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn empty_corpus_makes_every_bucket_empty() {
        let report = verify_partition(
            &taxonomy(),
            &local_pair(),
            &Corpus::default(),
            TriggerLevel::Local,
        );
        assert_eq!(report.empty_buckets.len(), 2);
        assert!(report.orphans.is_empty());
    }
}
