//! testgate-selector -- 태그 셀렉터 표현식
//!
//! pytest `-m` / `-k` 호환 불리언 표현식을 파싱하고 테스트 태그 또는
//! 테스트 이름에 대해 평가합니다.
//!
//! # 예시
//!
//! ```
//! use testgate_core::types::TagSet;
//! use testgate_selector::Selector;
//!
//! let selector = Selector::parse("clustertest and not ondemand").unwrap();
//! let tags: TagSet = ["clustertest"].into_iter().collect();
//! assert!(selector.matches_tags(&tags));
//! ```

pub mod error;
pub mod expr;
mod lexer;
pub mod parser;

pub use error::SelectorError;
pub use expr::{Expr, Selector};
pub use parser::{MAX_DEPTH, MAX_EXPRESSION_LEN};
