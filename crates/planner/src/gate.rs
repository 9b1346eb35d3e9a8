//! 환경/트리거 게이트
//!
//! CI 트리거 이벤트를 두 상태 중 하나로 매핑합니다.
//!
//! | 상태       | 트리거                        | 레벨      | 누수 검사 |
//! |------------|-------------------------------|-----------|-----------|
//! | Continuous | push, pull_request            | `local`   | 없음      |
//! | Nightly    | schedule, workflow_dispatch   | `release` | 예약됨    |
//!
//! 상태는 실행 시작 시 한 번 결정되며 실행 중 전이하지 않습니다.

use std::fmt;

use serde::Serialize;
use testgate_core::types::{TriggerEvent, TriggerLevel};

/// 게이트 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// push / PR -- 라이브 클라우드 계정을 사용하지 않음
    Continuous,
    /// 예약 / 수동 -- 클라우드 및 K8s 프로비저닝 포함
    Nightly,
}

impl GateState {
    /// 트리거 이벤트에 대응하는 게이트 상태
    pub fn from_trigger(trigger: TriggerEvent) -> Self {
        match trigger {
            TriggerEvent::Push | TriggerEvent::PullRequest => Self::Continuous,
            TriggerEvent::Schedule | TriggerEvent::WorkflowDispatch => Self::Nightly,
        }
    }

    /// 활성 버킷 집합을 결정하는 레벨
    pub fn level(self) -> TriggerLevel {
        match self {
            Self::Continuous => TriggerLevel::Local,
            Self::Nightly => TriggerLevel::Release,
        }
    }

    /// 누수 검사 예약 여부 (레벨이 클라우드 자원을 프로비저닝할 때)
    pub fn schedules_leak_check(self) -> bool {
        self.level().provisions_cloud()
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuous => write!(f, "continuous"),
            Self::Nightly => write!(f, "nightly"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pr_are_continuous_local() {
        for trigger in [TriggerEvent::Push, TriggerEvent::PullRequest] {
            let state = GateState::from_trigger(trigger);
            assert_eq!(state, GateState::Continuous);
            assert_eq!(state.level(), TriggerLevel::Local);
            assert!(!state.schedules_leak_check());
        }
    }

    #[test]
    fn schedule_and_manual_are_nightly_release() {
        for trigger in [TriggerEvent::Schedule, TriggerEvent::WorkflowDispatch] {
            let state = GateState::from_trigger(trigger);
            assert_eq!(state, GateState::Nightly);
            assert_eq!(state.level(), TriggerLevel::Release);
            assert!(state.schedules_leak_check());
        }
    }

    #[test]
    fn every_trigger_maps_to_exactly_one_level() {
        for trigger in TriggerEvent::ALL {
            let level = GateState::from_trigger(trigger).level();
            assert!(TriggerLevel::ALL.contains(&level));
        }
    }
}
