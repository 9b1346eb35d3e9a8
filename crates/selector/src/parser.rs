//! 재귀 하강 파서
//!
//! # 문법
//! ```text
//! expr     := or_expr
//! or_expr  := and_expr ( "or" and_expr )*
//! and_expr := unary ( "and" unary )*
//! unary    := "not" unary | primary
//! primary  := "(" expr ")" | "*" | IDENT
//! ```
//!
//! 우선순위는 `not` > `and` > `or` 이며, 이항 연산자는 왼쪽 결합입니다.

use crate::error::SelectorError;
use crate::expr::Expr;
use crate::lexer::{Token, TokenKind, tokenize};

/// 입력 최대 길이 (바이트)
pub const MAX_EXPRESSION_LEN: usize = 4096;

/// 최대 중첩 깊이 (괄호 및 `not` 포함)
pub const MAX_DEPTH: usize = 64;

/// 표현식 문자열을 AST로 파싱합니다.
pub(crate) fn parse(input: &str) -> Result<Expr, SelectorError> {
    if input.len() > MAX_EXPRESSION_LEN {
        return Err(SelectorError::TooLong {
            len: input.len(),
            max: MAX_EXPRESSION_LEN,
        });
    }

    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(SelectorError::Empty);
    }

    let mut parser = Parser {
        tokens: &tokens,
        cursor: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;

    if let Some(token) = parser.peek() {
        if token.kind == TokenKind::RParen {
            return Err(SelectorError::UnbalancedParen { pos: token.pos });
        }
        return Err(SelectorError::UnexpectedToken {
            pos: token.pos,
            found: token.kind.to_string(),
            expected: "'and', 'or' or end of expression",
        });
    }

    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    cursor: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.cursor);
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn enter(&mut self) -> Result<(), SelectorError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(SelectorError::TooDeep { max: MAX_DEPTH });
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expr, SelectorError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, SelectorError> {
        let mut lhs = self.parse_unary()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, SelectorError> {
        if self.eat(&TokenKind::Not) {
            self.enter()?;
            let operand = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, SelectorError> {
        const EXPECTED: &str = "tag, '*', 'not' or '('";

        let Some(token) = self.advance().cloned() else {
            return Err(SelectorError::UnexpectedEnd { expected: EXPECTED });
        };

        match token.kind {
            TokenKind::Ident(name) => Ok(Expr::Term(name)),
            TokenKind::Star => Ok(Expr::All),
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                if !self.eat(&TokenKind::RParen) {
                    return Err(SelectorError::UnbalancedParen { pos: token.pos });
                }
                Ok(inner)
            }
            TokenKind::RParen => Err(SelectorError::UnbalancedParen { pos: token.pos }),
            other => Err(SelectorError::UnexpectedToken {
                pos: token.pos,
                found: other.to_string(),
                expected: EXPECTED,
            }),
        }
    }
}
