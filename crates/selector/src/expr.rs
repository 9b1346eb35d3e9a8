//! 셀렉터 AST와 평가
//!
//! [`Selector`]는 파싱된 표현식과 원본 문자열을 함께 보관합니다.
//! 평가는 순수 함수이며 모든 입력에 대해 정의됩니다.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use testgate_core::types::TagSet;

use crate::error::SelectorError;
use crate::parser;

/// 셀렉터 표현식 트리
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// 모든 테스트 선택 (`*`)
    All,
    /// 단일 식별자
    Term(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// 식별자 판정 함수로 표현식을 평가합니다.
    pub fn eval<F>(&self, is_match: &F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        match self {
            Self::All => true,
            Self::Term(name) => is_match(name),
            Self::Not(inner) => !inner.eval(is_match),
            Self::And(lhs, rhs) => lhs.eval(is_match) && rhs.eval(is_match),
            Self::Or(lhs, rhs) => lhs.eval(is_match) || rhs.eval(is_match),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Or(..) => 1,
            Self::And(..) => 2,
            Self::Not(_) => 3,
            Self::All | Self::Term(_) => 4,
        }
    }

    fn collect_terms<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::All => {}
            Self::Term(name) => {
                out.insert(name.as_str());
            }
            Self::Not(inner) => inner.collect_terms(out),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.collect_terms(out);
                rhs.collect_terms(out);
            }
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parenthesize: bool) -> fmt::Result {
        if parenthesize {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

/// 최소 괄호로 정규화된 표현식을 출력합니다.
///
/// 출력 결과를 다시 파싱하면 같은 트리가 됩니다. 왼쪽 결합이므로
/// 오른쪽에 같은 연산자가 오면 괄호를 유지합니다.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Term(name) => f.write_str(name),
            Self::Not(inner) => {
                f.write_str("not ")?;
                inner.fmt_operand(f, inner.precedence() < 3)
            }
            Self::And(lhs, rhs) => {
                lhs.fmt_operand(f, lhs.precedence() < 2)?;
                f.write_str(" and ")?;
                rhs.fmt_operand(f, rhs.precedence() <= 2)
            }
            Self::Or(lhs, rhs) => {
                lhs.fmt_operand(f, lhs.precedence() < 1)?;
                f.write_str(" or ")?;
                rhs.fmt_operand(f, rhs.precedence() <= 1)
            }
        }
    }
}

/// 파싱된 셀렉터
///
/// 버킷의 마커/키워드 셀렉터로 사용되며, 외부 테스트 러너에는
/// 원본 문자열(`source`)이 그대로 전달됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Selector {
    source: String,
    expr: Expr,
}

impl Selector {
    /// 표현식을 파싱합니다.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let expr = parser::parse(input)?;
        tracing::trace!(selector = input, "parsed selector");
        Ok(Self {
            source: input.trim().to_owned(),
            expr,
        })
    }

    /// 모든 테스트를 선택하는 셀렉터 (`*`)
    pub fn all() -> Self {
        Self {
            source: "*".to_owned(),
            expr: Expr::All,
        }
    }

    /// 원본 표현식 문자열 (앞뒤 공백 제거)
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// 정규화된 표현식 문자열
    pub fn canonical(&self) -> String {
        self.expr.to_string()
    }

    /// 태그 집합에 대해 평가합니다 (대소문자 구분).
    pub fn matches_tags(&self, tags: &TagSet) -> bool {
        self.expr.eval(&|name| tags.contains(name))
    }

    /// 테스트 이름에 대해 키워드 평가합니다.
    ///
    /// 각 식별자는 테스트 이름의 부분 문자열로 판정하며 대소문자를 구분하지 않습니다.
    pub fn matches_keywords(&self, test_name: &str) -> bool {
        let haystack = test_name.to_lowercase();
        self.expr
            .eval(&|name| haystack.contains(&name.to_lowercase()))
    }

    /// 표현식이 참조하는 식별자 목록 (정렬, 중복 제거)
    pub fn terms(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.expr.collect_terms(&mut out);
        out
    }

    /// `*` 단독 표현식 여부
    pub fn is_select_all(&self) -> bool {
        self.expr == Expr::All
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Selector {
    type Error = SelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.source
    }
}
