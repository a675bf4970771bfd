// ABOUTME: Namelist decoder turning token streams into ordered documents
// ABOUTME: Handles multi-line and multi-assignment lines, repeat counts, and group terminators

use std::ops::Range;

use super::document::{Document, Group};
use super::error::{NamelistError, Result};
use super::lexer::{line_of, tokenize, Token};
use super::value::{NmlValue, Scalar};

/// Longest value list a repeat count may expand to
pub const MAX_LIST_LEN: usize = 1 << 20;

/// Decode namelist text into a document.
///
/// Groups and keys keep their first-seen order. A group that appears twice is
/// merged into its first occurrence; a key assigned twice keeps its first
/// position and its last value.
pub fn decode(text: &str) -> Result<Document> {
    let tokens = tokenize(text)?;
    Parser {
        text,
        tokens,
        pos: 0,
    }
    .parse()
}

/// Decode raw namelist bytes; text that is not UTF-8 is a decode error at
/// the line holding the first bad byte.
pub fn decode_bytes(bytes: &[u8]) -> Result<Document> {
    match std::str::from_utf8(bytes) {
        Ok(text) => decode(text),
        Err(e) => {
            let valid = &bytes[..e.valid_up_to()];
            Err(NamelistError::DecodeError {
                line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
                message: format!("invalid UTF-8 at byte {}", e.valid_up_to()),
            })
        }
    }
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse(mut self) -> Result<Document> {
        let mut document = Document::new();

        while let Some((token, span)) = self.next() {
            match token {
                token if token.is_group_end() => {
                    return Err(self.error(&span, "group terminator outside of a group"))
                }
                Token::GroupStart(name) => {
                    let group = document.add_group(name.clone());
                    self.parse_group(group, &name, &span)?;
                }
                other => {
                    return Err(self.error(&span, format!("expected group header, found {}", other)))
                }
            }
        }

        Ok(document)
    }

    fn parse_group(&mut self, group: &mut Group, name: &str, start: &Range<usize>) -> Result<()> {
        loop {
            let (token, span) = match self.next() {
                Some(next) => next,
                None => {
                    return Err(self.error(start, format!("group '{}' is not terminated", name)))
                }
            };

            match token {
                token if token.is_group_end() => return Ok(()),
                Token::Comma => continue,
                Token::Name(key) => {
                    match self.next() {
                        Some((Token::Equals, _)) => {}
                        _ => {
                            return Err(
                                self.error(&span, format!("expected '=' after '{}'", key))
                            )
                        }
                    }
                    let value = self.parse_values(&key, &span)?;
                    group.insert(key, value);
                }
                Token::GroupStart(other) => {
                    return Err(self.error(
                        &span,
                        format!("group '{}' opened before '{}' was terminated", other, name),
                    ))
                }
                other => {
                    return Err(self.error(
                        &span,
                        format!("expected variable name in group '{}', found {}", name, other),
                    ))
                }
            }
        }
    }

    fn parse_values(&mut self, key: &str, key_span: &Range<usize>) -> Result<NmlValue> {
        let mut items = Vec::new();

        while let Some((token, span)) = self.peek() {
            match token {
                token if token.is_group_end() => break,
                Token::GroupStart(_) => break,
                Token::Comma => self.pos += 1,
                Token::Name(_) if matches!(self.peek_at(1), Some(Token::Equals)) => break,
                Token::Name(word) => match bare_logical(word) {
                    Some(b) => {
                        items.push(Scalar::Bool(b));
                        self.pos += 1;
                    }
                    None => {
                        let message = format!("unquoted string '{}' in value of '{}'", word, key);
                        return Err(self.error(&span.clone(), message));
                    }
                },
                Token::Repeat(count) => {
                    let (count, span) = (*count, span.clone());
                    self.pos += 1;
                    let scalar = match self.next() {
                        Some((token, _)) => literal(&token),
                        None => None,
                    };
                    if items.len().saturating_add(count) > MAX_LIST_LEN {
                        return Err(self.error(&span, "repeat count too large"));
                    }
                    match scalar {
                        Some(scalar) if count > 0 => {
                            items.extend(std::iter::repeat(scalar).take(count))
                        }
                        Some(_) => return Err(self.error(&span, "repeat count must be positive")),
                        None => {
                            return Err(self.error(&span, "repeat count must precede a value"))
                        }
                    }
                }
                Token::Equals => {
                    let span = span.clone();
                    return Err(self.error(&span, format!("unexpected '=' in value of '{}'", key)));
                }
                other => match literal(other) {
                    Some(scalar) => {
                        items.push(scalar);
                        self.pos += 1;
                    }
                    None => {
                        let message = format!("unexpected {} in value of '{}'", other, key);
                        return Err(self.error(&span.clone(), message));
                    }
                },
            }
        }

        if items.is_empty() {
            return Err(self.error(key_span, format!("missing value for '{}'", key)));
        }

        NmlValue::from_scalars(items)
            .map_err(|reason| self.error(key_span, format!("'{}': {}", key, reason)))
    }

    fn next(&mut self) -> Option<(Token, Range<usize>)> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn peek(&self) -> Option<(&Token, &Range<usize>)> {
        self.tokens.get(self.pos).map(|(t, s)| (t, s))
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn error(&self, span: &Range<usize>, message: impl Into<String>) -> NamelistError {
        NamelistError::DecodeError {
            line: line_of(self.text, span.start),
            message: message.into(),
        }
    }
}

fn literal(token: &Token) -> Option<Scalar> {
    match token {
        Token::Logical(b) => Some(Scalar::Bool(*b)),
        Token::Integer(i) => Some(Scalar::Int(*i)),
        Token::Real(r) => Some(Scalar::Float(*r)),
        Token::Str(s) => Some(Scalar::Str(s.clone())),
        Token::Name(word) => bare_logical(word).map(Scalar::Bool),
        _ => None,
    }
}

fn bare_logical(word: &str) -> Option<bool> {
    match word.to_ascii_lowercase().as_str() {
        "t" | "true" => Some(true),
        "f" | "false" => Some(false),
        _ => None,
    }
}
