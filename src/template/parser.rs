//! Tag scanner and expression parser for default-expression templates.
//!
//! A template is literal text interleaved with `{{ ... }}` tags. A tag is
//! either an expression (a dotted path followed by an optional filter
//! pipeline), `if EXPR`, `else`, or `end`.

use super::funcs::Arg;
use thiserror::Error;

/// Errors produced while parsing a template.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("tag opened with {{{{ but never closed")]
    UnclosedTag,
    #[error("empty tag")]
    EmptyTag,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence in string literal")]
    BadEscape,
    #[error("invalid number {0:?}")]
    BadNumber(String),
    #[error("invalid reference path {0:?}")]
    BadPath(String),
    #[error("unexpected {0:?} in tag")]
    UnexpectedToken(String),
    #[error("`if` tag is missing its guard expression")]
    MissingGuard,
    #[error("`else` without an open `if` block")]
    DanglingElse,
    #[error("`end` without an open `if` block")]
    DanglingEnd,
    #[error("`if` block is never closed")]
    MissingEnd,
}

/// One parsed piece of a template.
#[derive(Debug, Clone)]
pub(crate) enum Segment {
    Literal(String),
    Expr(Expr),
    Cond(Cond),
}

/// A guarded block: the then-branch renders when the guard produces a
/// non-empty value, the else-branch otherwise (including when the guard's
/// path is absent).
#[derive(Debug, Clone)]
pub(crate) struct Cond {
    pub guard: Expr,
    pub then_body: Vec<Segment>,
    pub else_body: Vec<Segment>,
}

/// A dotted path reference with an optional filter pipeline.
#[derive(Debug, Clone)]
pub(crate) struct Expr {
    pub path: Vec<String>,
    pub filters: Vec<FilterCall>,
}

#[derive(Debug, Clone)]
pub(crate) struct FilterCall {
    pub name: String,
    pub args: Vec<Arg>,
}

struct Frame {
    guard: Option<Expr>,
    then_body: Vec<Segment>,
    else_body: Option<Vec<Segment>>,
}

impl Frame {
    fn root() -> Self {
        Frame { guard: None, then_body: Vec::new(), else_body: None }
    }

    fn cond(guard: Expr) -> Self {
        Frame { guard: Some(guard), then_body: Vec::new(), else_body: None }
    }

    fn body_mut(&mut self) -> &mut Vec<Segment> {
        match &mut self.else_body {
            Some(body) => body,
            None => &mut self.then_body,
        }
    }
}

pub(crate) fn parse(input: &str) -> Result<Vec<Segment>, ParseError> {
    let mut current = Frame::root();
    let mut stack: Vec<Frame> = Vec::new();
    let mut rest = input;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            current.body_mut().push(Segment::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            return Err(ParseError::UnclosedTag);
        };
        let inner = after[..close].trim();
        rest = &after[close + 2..];

        if inner.is_empty() {
            return Err(ParseError::EmptyTag);
        } else if inner == "end" {
            let Some(parent) = stack.pop() else {
                return Err(ParseError::DanglingEnd);
            };
            let finished = std::mem::replace(&mut current, parent);
            let Some(guard) = finished.guard else {
                return Err(ParseError::DanglingEnd);
            };
            current.body_mut().push(Segment::Cond(Cond {
                guard,
                then_body: finished.then_body,
                else_body: finished.else_body.unwrap_or_default(),
            }));
        } else if inner == "else" {
            if current.guard.is_none() || current.else_body.is_some() {
                return Err(ParseError::DanglingElse);
            }
            current.else_body = Some(Vec::new());
        } else if inner == "if" {
            return Err(ParseError::MissingGuard);
        } else if let Some(guard_text) = inner.strip_prefix("if ") {
            let guard = parse_expr(guard_text)?;
            stack.push(std::mem::replace(&mut current, Frame::cond(guard)));
        } else {
            current.body_mut().push(Segment::Expr(parse_expr(inner)?));
        }
    }

    if !rest.is_empty() {
        current.body_mut().push(Segment::Literal(rest.to_string()));
    }
    if !stack.is_empty() || current.guard.is_some() {
        return Err(ParseError::MissingEnd);
    }
    Ok(current.then_body)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Int(i64),
    Pipe,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '|' => {
                chars.next();
                tokens.push(Token::Pipe);
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped @ ('"' | '\\')) => text.push(escaped),
                            _ => return Err(ParseError::BadEscape),
                        },
                        Some(other) => text.push(other),
                        None => return Err(ParseError::UnterminatedString),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut digits = String::new();
                digits.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = digits
                    .parse::<i64>()
                    .map_err(|_| ParseError::BadNumber(digits.clone()))?;
                tokens.push(Token::Int(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&w) = chars.peek() {
                    if w.is_ascii_alphanumeric() || matches!(w, '_' | '-' | '.') {
                        word.push(w);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            other => return Err(ParseError::UnexpectedToken(other.to_string())),
        }
    }
    Ok(tokens)
}

pub(crate) fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    let mut iter = tokens.into_iter().peekable();

    let path = match iter.next() {
        Some(Token::Word(word)) => parse_path(&word)?,
        Some(other) => return Err(ParseError::UnexpectedToken(describe(&other))),
        None => return Err(ParseError::EmptyTag),
    };

    let mut filters = Vec::new();
    while let Some(token) = iter.next() {
        if token != Token::Pipe {
            return Err(ParseError::UnexpectedToken(describe(&token)));
        }
        let name = match iter.next() {
            Some(Token::Word(word)) => word,
            Some(other) => return Err(ParseError::UnexpectedToken(describe(&other))),
            None => return Err(ParseError::UnexpectedToken("|".to_string())),
        };
        let mut args = Vec::new();
        while let Some(token) = iter.peek() {
            match token {
                Token::Pipe => break,
                Token::Str(_) | Token::Int(_) => {
                    match iter.next() {
                        Some(Token::Str(text)) => args.push(Arg::Text(text)),
                        Some(Token::Int(number)) => args.push(Arg::Number(number)),
                        _ => {}
                    }
                }
                Token::Word(word) => {
                    return Err(ParseError::UnexpectedToken(word.clone()));
                }
            }
        }
        filters.push(FilterCall { name, args });
    }
    Ok(Expr { path, filters })
}

fn parse_path(word: &str) -> Result<Vec<String>, ParseError> {
    let segments: Vec<String> = word.split('.').map(str::to_string).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ParseError::BadPath(word.to_string()));
    }
    Ok(segments)
}

fn describe(token: &Token) -> String {
    match token {
        Token::Word(word) => word.clone(),
        Token::Str(text) => format!("{:?}", text),
        Token::Int(number) => number.to_string(),
        Token::Pipe => "|".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_only() {
        let segments = parse("plain text").unwrap();
        assert_eq!(segments.len(), 1);
        assert!(matches!(&segments[0], Segment::Literal(t) if t == "plain text"));
    }

    #[test]
    fn test_substitution_with_surrounding_literals() {
        let segments = parse("addr={{ server.listen }};").unwrap();
        assert_eq!(segments.len(), 3);
        let Segment::Expr(expr) = &segments[1] else {
            panic!("expected expression segment");
        };
        assert_eq!(expr.path, vec!["server", "listen"]);
        assert!(expr.filters.is_empty());
    }

    #[test]
    fn test_filter_pipeline() {
        let segments = parse("{{ listen | split \":\" | index 1 }}").unwrap();
        let Segment::Expr(expr) = &segments[0] else {
            panic!("expected expression segment");
        };
        assert_eq!(expr.filters.len(), 2);
        assert_eq!(expr.filters[0].name, "split");
        assert_eq!(expr.filters[0].args, vec![Arg::Text(":".to_string())]);
        assert_eq!(expr.filters[1].name, "index");
        assert_eq!(expr.filters[1].args, vec![Arg::Number(1)]);
    }

    #[test]
    fn test_string_escapes() {
        let segments = parse(r#"{{ a | replace "\"" "\\" }}"#).unwrap();
        let Segment::Expr(expr) = &segments[0] else {
            panic!("expected expression segment");
        };
        assert_eq!(
            expr.filters[0].args,
            vec![Arg::Text("\"".to_string()), Arg::Text("\\".to_string())]
        );
    }

    #[test]
    fn test_if_else_end() {
        let segments = parse("{{ if debug }}on{{ else }}off{{ end }}").unwrap();
        assert_eq!(segments.len(), 1);
        let Segment::Cond(cond) = &segments[0] else {
            panic!("expected conditional segment");
        };
        assert_eq!(cond.guard.path, vec!["debug"]);
        assert!(matches!(&cond.then_body[0], Segment::Literal(t) if t == "on"));
        assert!(matches!(&cond.else_body[0], Segment::Literal(t) if t == "off"));
    }

    #[test]
    fn test_nested_conditionals() {
        let segments = parse("{{ if a }}{{ if b }}x{{ end }}{{ end }}").unwrap();
        let Segment::Cond(outer) = &segments[0] else {
            panic!("expected conditional segment");
        };
        assert!(matches!(&outer.then_body[0], Segment::Cond(_)));
    }

    #[test]
    fn test_unclosed_tag() {
        assert!(matches!(parse("{{ a"), Err(ParseError::UnclosedTag)));
    }

    #[test]
    fn test_missing_end() {
        assert!(matches!(parse("{{ if a }}x"), Err(ParseError::MissingEnd)));
    }

    #[test]
    fn test_dangling_end_and_else() {
        assert!(matches!(parse("{{ end }}"), Err(ParseError::DanglingEnd)));
        assert!(matches!(parse("{{ else }}"), Err(ParseError::DanglingElse)));
        assert!(matches!(
            parse("{{ if a }}{{ else }}{{ else }}{{ end }}"),
            Err(ParseError::DanglingElse)
        ));
    }

    #[test]
    fn test_bad_paths() {
        assert!(matches!(parse("{{ .a }}"), Err(ParseError::UnexpectedToken(_))));
        assert!(matches!(parse("{{ a..b }}"), Err(ParseError::BadPath(_))));
        assert!(matches!(parse("{{ a. }}"), Err(ParseError::BadPath(_))));
    }

    #[test]
    fn test_bare_word_argument_rejected() {
        assert!(matches!(
            parse("{{ a | split here }}"),
            Err(ParseError::UnexpectedToken(_))
        ));
    }

    #[test]
    fn test_missing_guard() {
        assert!(matches!(parse("{{ if }}x{{ end }}"), Err(ParseError::MissingGuard)));
    }
}
