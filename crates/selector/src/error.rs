//! 셀렉터 에러 타입
//!
//! [`SelectorError`]는 표현식 토큰화/파싱 중 발생하는 모든 에러를 표현합니다.
//! 평가는 전역 함수(total)이므로 에러를 반환하지 않습니다.

use testgate_core::error::TestgateError;

/// 셀렉터 표현식 에러
///
/// 위치(`pos`)는 입력 문자열의 바이트 오프셋입니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    /// 빈 표현식 (전체 선택은 `*`로 명시해야 함)
    #[error("empty selector expression (use '*' to select every test)")]
    Empty,

    /// 허용되지 않는 문자
    #[error("unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar {
        /// 바이트 오프셋
        pos: usize,
        /// 문제가 된 문자
        ch: char,
    },

    /// 예상하지 못한 토큰
    #[error("unexpected {found} at offset {pos}, expected {expected}")]
    UnexpectedToken {
        pos: usize,
        found: String,
        expected: &'static str,
    },

    /// 입력이 예상보다 일찍 끝남
    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    /// 닫히지 않았거나 짝이 없는 괄호
    #[error("unbalanced parenthesis at offset {pos}")]
    UnbalancedParen { pos: usize },

    /// 중첩 깊이 초과
    #[error("expression nested deeper than {max} levels")]
    TooDeep { max: usize },

    /// 입력 길이 초과
    #[error("expression too long: {len} bytes (max: {max})")]
    TooLong { len: usize, max: usize },
}

impl From<SelectorError> for TestgateError {
    fn from(err: SelectorError) -> Self {
        TestgateError::Selector(err.to_string())
    }
}
