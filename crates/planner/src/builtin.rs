//! 내장 매트릭스와 기본 프로파일
//!
//! 설정에 `planner.matrix_path`가 없으면 Runhouse CI 워크플로를 재현한
//! 내장 매트릭스(local 5개, release 7개 버킷)를 사용합니다.

use testgate_core::types::{AuthState, ProfileKind, ProvisioningProfile};

use crate::error::PlannerError;
use crate::matrix::{Matrix, MatrixLoader};

/// 내장 매트릭스 YAML 원문
pub const BUILTIN_MATRIX_YAML: &str = include_str!("../matrix/runhouse.yml");

/// 클라우드 자원 조회 명령
const SKY_STATUS: [&str; 3] = ["sky", "status", "--refresh"];

/// 로그인 세션용 비밀 환경변수
const DEN_SECRETS: [&str; 2] = ["DEN_TESTER_TOKEN", "DEN_TESTER_USERNAME"];

/// 내장 매트릭스를 파싱합니다.
pub fn builtin_matrix() -> Result<Matrix, PlannerError> {
    MatrixLoader::parse_yaml(BUILTIN_MATRIX_YAML, "<builtin>")
}

/// 내장 매트릭스가 참조하는 기본 프로파일
pub fn default_profiles() -> Vec<ProvisioningProfile> {
    let mut logged_in = ProvisioningProfile::new("local-logged-in", ProfileKind::Local);
    logged_in.auth = AuthState::LoggedIn;
    logged_in.secret_env = secrets(&[]);

    vec![
        ProvisioningProfile::new("local-logged-out", ProfileKind::Local),
        logged_in,
        cloud("aws", ProfileKind::Aws, "aws-ci-account", &["AWS_ROLE_ARN"]),
        cloud(
            "aws-den",
            ProfileKind::Aws,
            "den-launcher",
            &["AWS_ROLE_ARN", "API_SERVER_URL"],
        ),
        cloud(
            "gcp",
            ProfileKind::Gcp,
            "gcp-ci-project",
            &["GCP_SERVICE_ACCOUNT_KEY"],
        ),
        cloud(
            "kubernetes",
            ProfileKind::Kubernetes,
            "ci-cluster",
            &["KUBECONFIG"],
        ),
    ]
}

/// 설정된 프로파일로 기본 프로파일을 덮어씁니다.
///
/// 같은 이름은 설정값이 우선하며, 새 이름은 뒤에 추가됩니다.
pub fn merge_profiles(configured: &[ProvisioningProfile]) -> Vec<ProvisioningProfile> {
    let mut merged = default_profiles();
    for profile in configured {
        match merged.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile.clone(),
            None => merged.push(profile.clone()),
        }
    }
    merged
}

fn cloud(name: &str, kind: ProfileKind, target: &str, extra: &[&str]) -> ProvisioningProfile {
    let mut profile = ProvisioningProfile::new(name, kind);
    profile.target = target.to_owned();
    profile.auth = AuthState::LoggedIn;
    profile.status_command = SKY_STATUS.iter().map(|s| (*s).to_owned()).collect();
    profile.secret_env = secrets(extra);
    profile
}

fn secrets(extra: &[&str]) -> Vec<String> {
    extra
        .iter()
        .chain(DEN_SECRETS.iter())
        .map(|s| (*s).to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use testgate_core::types::TriggerLevel;

    #[test]
    fn builtin_matrix_parses() {
        let matrix = builtin_matrix().unwrap();
        assert_eq!(matrix.len(), 12);
    }

    #[test]
    fn builtin_matrix_has_five_local_and_seven_release_buckets() {
        let matrix = builtin_matrix().unwrap();
        assert_eq!(matrix.active(TriggerLevel::Local).count(), 5);
        assert_eq!(matrix.active(TriggerLevel::Release).count(), 7);
    }

    #[test]
    fn builtin_matrix_references_default_profiles() {
        let matrix = builtin_matrix().unwrap();
        assert!(matrix.check_profiles(&default_profiles()).is_ok());
    }

    #[test]
    fn local_buckets_never_use_cloud_profiles() {
        let matrix = builtin_matrix().unwrap();
        let profiles = default_profiles();
        for bucket in matrix.active(TriggerLevel::Local) {
            let profile = profiles.iter().find(|p| p.name == bucket.profile).unwrap();
            assert!(!profile.kind.is_cloud(), "{} uses {}", bucket.name, profile.name);
        }
    }

    #[test]
    fn cloud_profiles_are_leak_check_targets() {
        let targets: Vec<String> = default_profiles()
            .into_iter()
            .filter(ProvisioningProfile::is_leak_check_target)
            .map(|p| p.name)
            .collect();
        assert_eq!(targets, vec!["aws", "aws-den", "gcp", "kubernetes"]);
    }

    #[test]
    fn logged_out_profile_has_no_secrets() {
        let profiles = default_profiles();
        let logged_out = profiles.iter().find(|p| p.name == "local-logged-out").unwrap();
        assert_eq!(logged_out.auth, AuthState::LoggedOut);
        assert!(logged_out.secret_env.is_empty());
    }

    #[test]
    fn merge_overrides_by_name_and_appends_new() {
        let mut aws = ProvisioningProfile::new("aws", ProfileKind::Aws);
        aws.target = "other-account".to_owned();
        let extra = ProvisioningProfile::new("azure", ProfileKind::Local);

        let merged = merge_profiles(&[aws, extra]);
        assert_eq!(merged.len(), 7);
        let aws = merged.iter().find(|p| p.name == "aws").unwrap();
        assert_eq!(aws.target, "other-account");
        assert_eq!(merged.last().unwrap().name, "azure");
    }
}
