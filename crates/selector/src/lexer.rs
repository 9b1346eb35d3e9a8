//! 셀렉터 토크나이저
//!
//! 입력 문자열을 [`Token`] 목록으로 변환합니다. 키워드(`and`, `or`, `not`)는
//! 소문자만 인식하며, 나머지 단어는 모두 식별자입니다.

use std::fmt;

use crate::error::SelectorError;

/// 위치 정보를 가진 토큰
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// 입력 내 바이트 오프셋
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    LParen,
    RParen,
    Star,
    And,
    Or,
    Not,
    Ident(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::Star => write!(f, "'*'"),
            Self::And => write!(f, "'and'"),
            Self::Or => write!(f, "'or'"),
            Self::Not => write!(f, "'not'"),
            Self::Ident(name) => write!(f, "identifier '{name}'"),
        }
    }
}

/// 식별자에 허용되는 문자
///
/// pytest 노드 ID 조각(`test_up[ondemand_aws_cluster]`, `tests/test_a.py`)도
/// 키워드 표현식에서 쓸 수 있도록 일부 구두점을 허용합니다.
pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '[' | ']' | ':' | '/')
}

/// 입력을 토큰 목록으로 분해합니다.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, SelectorError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match c {
            '(' => {
                chars.next();
                TokenKind::LParen
            }
            ')' => {
                chars.next();
                TokenKind::RParen
            }
            '*' => {
                chars.next();
                TokenKind::Star
            }
            c if is_ident_char(c) => {
                let mut end = pos;
                while let Some(&(i, c)) = chars.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                match &input[pos..end] {
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "not" => TokenKind::Not,
                    word => TokenKind::Ident(word.to_owned()),
                }
            }
            other => return Err(SelectorError::UnexpectedChar { pos, ch: other }),
        };

        tokens.push(Token { kind, pos });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_keywords_and_identifiers() {
        assert_eq!(
            kinds("clustertest and not ondemand"),
            vec![
                TokenKind::Ident("clustertest".to_owned()),
                TokenKind::And,
                TokenKind::Not,
                TokenKind::Ident("ondemand".to_owned()),
            ]
        );
    }

    #[test]
    fn keywords_are_lowercase_only() {
        assert_eq!(
            kinds("AND Not"),
            vec![
                TokenKind::Ident("AND".to_owned()),
                TokenKind::Ident("Not".to_owned()),
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_an_identifier() {
        assert_eq!(kinds("notebook"), vec![TokenKind::Ident("notebook".to_owned())]);
        assert_eq!(kinds("android"), vec![TokenKind::Ident("android".to_owned())]);
    }

    #[test]
    fn parens_and_star_without_spaces() {
        assert_eq!(
            kinds("(*)"),
            vec![TokenKind::LParen, TokenKind::Star, TokenKind::RParen]
        );
    }

    #[test]
    fn node_id_fragments_are_single_identifiers() {
        assert_eq!(
            kinds("test_up[ondemand_aws_cluster]"),
            vec![TokenKind::Ident("test_up[ondemand_aws_cluster]".to_owned())]
        );
    }

    #[test]
    fn records_byte_positions() {
        let tokens = tokenize("a  and b").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.pos).collect();
        assert_eq!(positions, vec![0, 3, 7]);
    }

    #[test]
    fn rejects_shell_operators() {
        let err = tokenize("a && b").unwrap_err();
        assert_eq!(err, SelectorError::UnexpectedChar { pos: 2, ch: '&' });
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("   ").unwrap().is_empty());
    }
}
