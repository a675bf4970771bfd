// ABOUTME: Logos-based tokenizer for Fortran namelist text
// ABOUTME: Produces group markers, names, literals, and separators with their byte spans

use logos::Logos;
use std::fmt;
use std::ops::Range;

use super::error::{NamelistError, Result};

/// Namelist token.
///
/// Whitespace and `!` comments are skipped. Group terminators spelled
/// `&end` / `$end` lex as [`Token::GroupStart`] and are told apart by the
/// parser.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"![^\n]*")]
pub enum Token {
    /// `&name` or `$name`
    #[regex(r"[&$][A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice()[1..].to_string())]
    GroupStart(String),

    /// `/`
    #[token("/")]
    GroupEnd,

    #[token("=")]
    Equals,

    #[token(",")]
    Comma,

    /// `n*` repeat prefix
    #[regex(r"[0-9]+\*", |lex| lex.slice().trim_end_matches('*').parse::<usize>().ok())]
    Repeat(usize),

    #[regex(r"\.(true|t)\.", |_| true, ignore(ascii_case))]
    #[regex(r"\.(false|f)\.", |_| false, ignore(ascii_case))]
    Logical(bool),

    #[regex(r"[+-]?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    #[regex(r"[+-]?([0-9]+\.[0-9]*|\.[0-9]+)([eEdD][+-]?[0-9]+)?", parse_real)]
    #[regex(r"[+-]?[0-9]+[eEdD][+-]?[0-9]+", parse_real)]
    Real(f64),

    #[regex(r"'([^']|'')*'", |lex| unquote(lex.slice(), '\''))]
    #[regex(r#""([^"]|"")*""#, |lex| unquote(lex.slice(), '"'))]
    Str(String),

    /// Variable name, including array sections and derived-type components
    #[regex(
        r"[A-Za-z_][A-Za-z0-9_]*(\([^)\n]*\))?(%[A-Za-z_][A-Za-z0-9_]*(\([^)\n]*\))?)*",
        |lex| lex.slice().to_string()
    )]
    Name(String),
}

impl Token {
    /// Check if this token closes a group (`/`, `&end`, `$end`)
    pub fn is_group_end(&self) -> bool {
        match self {
            Token::GroupEnd => true,
            Token::GroupStart(name) => name.eq_ignore_ascii_case("end"),
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::GroupStart(name) => write!(f, "'&{}'", name),
            Token::GroupEnd => write!(f, "'/'"),
            Token::Equals => write!(f, "'='"),
            Token::Comma => write!(f, "','"),
            Token::Repeat(n) => write!(f, "repeat count '{}*'", n),
            Token::Logical(b) => write!(f, "logical {}", b),
            Token::Integer(i) => write!(f, "integer {}", i),
            Token::Real(r) => write!(f, "real {}", r),
            Token::Str(s) => write!(f, "string '{}'", s),
            Token::Name(name) => write!(f, "name '{}'", name),
        }
    }
}

/// Reals that overflow to infinity are rejected; they could not be written back
fn parse_real(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    let value: f64 = lex.slice().replace(['d', 'D'], "e").parse().ok()?;
    value.is_finite().then_some(value)
}

fn unquote(slice: &str, quote: char) -> String {
    let inner = &slice[1..slice.len() - 1];
    let doubled: String = [quote, quote].iter().collect();
    inner.replace(&doubled, &quote.to_string())
}

/// 1-based line number of a byte offset
pub fn line_of(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())].matches('\n').count() + 1
}

/// Tokenize a whole namelist text
pub fn tokenize(text: &str) -> Result<Vec<(Token, Range<usize>)>> {
    let mut lexer = Token::lexer(text);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next() {
        let span = lexer.span();
        match token {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(NamelistError::DecodeError {
                    line: line_of(text, span.start),
                    message: format!("unrecognized input '{}'", lexer.slice()),
                })
            }
        }
    }

    Ok(tokens)
}
