//! Token lexer for the SQL dialect.
//!
//! String literals take single or double quotes, with `\\` and `\<quote>`
//! escapes. Identifiers are `[A-Za-z][A-Za-z0-9_]*`; keywords are plain
//! identifiers matched case-insensitively by the parser.

use crate::types::error::{DatabaseError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    StringLiteral(String),
    IntegerLiteral(i64),
    FloatLiteral(f64),
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Asterisk,
}

fn lex_error(details: impl Into<String>) -> DatabaseError {
    DatabaseError::Parse {
        details: details.into(),
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LeftParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RightParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semicolon);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Asterisk);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Equal);
                i += 1;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::LessEqual);
                i += 2;
            }
            '<' => {
                tokens.push(Token::Less);
                i += 1;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::GreaterEqual);
                i += 2;
            }
            '>' => {
                tokens.push(Token::Greater);
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(lex_error("unterminated string literal")),
                        Some('\\') => match chars.get(i + 1) {
                            Some(&escaped) if escaped == '\\' || escaped == quote => {
                                text.push(escaped);
                                i += 2;
                            }
                            _ => {
                                text.push('\\');
                                i += 1;
                            }
                        },
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            text.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::StringLiteral(text));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Identifier(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let start = i;
                if c == '-' {
                    if !chars.get(i + 1).is_some_and(|ch| ch.is_ascii_digit()) {
                        return Err(lex_error("expected digits after '-'"));
                    }
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let mut is_float = false;
                if chars.get(i) == Some(&'.') && chars.get(i + 1).is_some_and(|ch| ch.is_ascii_digit())
                {
                    is_float = true;
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                if is_float {
                    let value = text
                        .parse()
                        .map_err(|_| lex_error(format!("invalid numeric literal: {}", text)))?;
                    tokens.push(Token::FloatLiteral(value));
                } else {
                    let value = text
                        .parse()
                        .map_err(|_| lex_error(format!("invalid numeric literal: {}", text)))?;
                    tokens.push(Token::IntegerLiteral(value));
                }
            }
            other => return Err(lex_error(format!("unexpected character: '{}'", other))),
        }
    }

    Ok(tokens)
}
