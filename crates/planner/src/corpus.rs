//! 테스트 코퍼스 스냅샷
//!
//! 외부 테스트 스위트가 수집한 테스트 목록(이름, 태그, 적용 레벨)을
//! YAML 파일에서 로드합니다. 실행 중 코퍼스는 변경되지 않습니다.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use testgate_core::types::{TestCase, TriggerLevel};

use crate::error::PlannerError;

/// 코퍼스 파일 최대 크기
const MAX_CORPUS_FILE_SIZE: u64 = 16 * 1024 * 1024; // 16MB
/// 최대 테스트 수
const MAX_TESTS: usize = 100_000;

/// 테스트 코퍼스
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    tests: Vec<TestCase>,
}

impl Corpus {
    /// 테스트 목록으로 코퍼스를 생성합니다.
    ///
    /// # Errors
    /// 이름이 비어있거나 중복된 테스트가 있으면 에러를 반환합니다.
    pub fn new(tests: Vec<TestCase>) -> Result<Self, PlannerError> {
        Self::check(&tests, "<memory>")?;
        Ok(Self { tests })
    }

    fn check(tests: &[TestCase], source: &str) -> Result<(), PlannerError> {
        if tests.len() > MAX_TESTS {
            return Err(PlannerError::CorpusLoad {
                path: source.to_owned(),
                reason: format!("too many tests: {} (max: {MAX_TESTS})", tests.len()),
            });
        }

        let mut seen = HashSet::with_capacity(tests.len());
        for test in tests {
            if test.name.trim().is_empty() {
                return Err(PlannerError::CorpusLoad {
                    path: source.to_owned(),
                    reason: "test name must not be empty".to_owned(),
                });
            }
            if !seen.insert(test.name.as_str()) {
                return Err(PlannerError::CorpusLoad {
                    path: source.to_owned(),
                    reason: format!("duplicate test '{}'", test.name),
                });
            }
        }
        Ok(())
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.tests.iter().find(|t| t.name == name)
    }

    /// 주어진 레벨에 적용되는 테스트
    pub fn applicable(&self, level: TriggerLevel) -> impl Iterator<Item = &TestCase> {
        self.tests.iter().filter(move |t| t.applies_to(level))
    }
}

/// 코퍼스 파일 로더
pub struct CorpusLoader;

impl CorpusLoader {
    /// YAML 코퍼스 파일을 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Corpus, PlannerError> {
        let path = path.as_ref();
        let load_err = |reason: String| PlannerError::CorpusLoad {
            path: path.display().to_string(),
            reason,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| load_err(format!("failed to read file metadata: {e}")))?;

        if metadata.len() > MAX_CORPUS_FILE_SIZE {
            return Err(load_err(format!(
                "file too large: {} bytes (max: {MAX_CORPUS_FILE_SIZE})",
                metadata.len()
            )));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| load_err(format!("failed to read file: {e}")))?;

        let corpus = Self::parse_yaml(&content, &path.display().to_string())?;

        tracing::info!(
            path = %path.display(),
            tests = corpus.len(),
            "loaded test corpus"
        );

        Ok(corpus)
    }

    /// YAML 문자열을 파싱하여 코퍼스를 생성합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<Corpus, PlannerError> {
        let corpus: Corpus =
            serde_yaml::from_str(yaml_str).map_err(|e| PlannerError::CorpusLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        Corpus::check(&corpus.tests, source)?;
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_corpus() {
        let yaml = r#"
tests:
  - name: tests/test_obj_store.py::test_put
    tags: [moduletest]
  - name: tests/test_cluster.py::test_up[ondemand_aws_cluster]
    tags: [clustertest, ondemand]
    levels: [release]
  - name: tests/test_misc.py::test_untagged
"#;
        let corpus = CorpusLoader::parse_yaml(yaml, "corpus.yml").unwrap();
        assert_eq!(corpus.len(), 3);

        let untagged = corpus.get("tests/test_misc.py::test_untagged").unwrap();
        assert!(untagged.tags.is_empty());
        assert!(untagged.applies_to(TriggerLevel::Local));
    }

    #[test]
    fn applicable_respects_levels() {
        let corpus = Corpus::new(vec![
            TestCase::new("a", ["clustertest"]),
            TestCase::new("b", ["ondemand"]).with_levels([TriggerLevel::Release]),
        ])
        .unwrap();

        assert_eq!(corpus.applicable(TriggerLevel::Local).count(), 1);
        assert_eq!(corpus.applicable(TriggerLevel::Release).count(), 2);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let yaml = r#"
tests:
  - { name: test_a, tags: [moduletest] }
  - { name: test_a, tags: [servertest] }
"#;
        let err = CorpusLoader::parse_yaml(yaml, "corpus.yml").unwrap_err();
        assert!(err.to_string().contains("duplicate test 'test_a'"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let result = Corpus::new(vec![TestCase::new("  ", ["moduletest"])]);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_yaml_returns_error() {
        let result = CorpusLoader::parse_yaml("tests: [{{{", "bad.yml");
        assert!(matches!(result, Err(PlannerError::CorpusLoad { .. })));
    }

    #[test]
    fn tags_are_case_sensitive_strings() {
        let yaml = "tests:\n  - { name: t, tags: [ClusterTest] }\n";
        let corpus = CorpusLoader::parse_yaml(yaml, "c.yml").unwrap();
        let test = corpus.get("t").unwrap();
        assert!(test.tags.contains("ClusterTest"));
        assert!(!test.tags.contains("clustertest"));
    }

    #[tokio::test]
    async fn load_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.yml");
        tokio::fs::write(&path, "tests:\n  - { name: t1, tags: [servertest] }\n")
            .await
            .unwrap();

        let corpus = CorpusLoader::load_file(&path).await.unwrap();
        assert_eq!(corpus.len(), 1);
    }

    #[tokio::test]
    async fn load_nonexistent_file_returns_error() {
        let result = CorpusLoader::load_file("/nonexistent/corpus.yml").await;
        assert!(result.is_err());
    }
}
