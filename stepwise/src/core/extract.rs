//! Fallback-chain extraction of structured data from free-form model text.
//!
//! The backend is an uncontrolled generator: it may wrap data in prose, use
//! single quotes, or emit nothing usable. Extraction never panics; it returns
//! `None` and lets callers apply their own heuristics.

use serde_json::{Map, Number, Value};
use tracing::debug;

/// Shape the caller expects from the bracketed span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractKind {
    /// Any JSON array (items may be objects).
    Array,
    /// A flat list. A single nested list (`[[...]]`) is unwrapped.
    List,
}

/// Locate the first `[ ... ]` span and parse it, stopping at first success:
/// strict JSON, then a permissive literal-expression parse.
pub fn extract_structured(text: &str, kind: ExtractKind) -> Option<Value> {
    let span = bracketed_span(text)?;
    let parsed = match serde_json::from_str::<Value>(span) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(err = %err, "strict json parse failed, trying literal parse");
            parse_literal(span)
        }
    }?;

    let Value::Array(items) = parsed else {
        return None;
    };
    match kind {
        ExtractKind::Array => Some(Value::Array(items)),
        ExtractKind::List => match items.as_slice() {
            [Value::Array(inner)] => Some(Value::Array(inner.clone())),
            _ => Some(Value::Array(items)),
        },
    }
}

/// Greedy span from the first `[` to the last `]`.
fn bracketed_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a literal expression that tolerates single-quoted strings, tuples,
/// trailing commas, and `True`/`False`/`None`.
pub fn parse_literal(text: &str) -> Option<Value> {
    let mut parser = LiteralParser::new(text);
    let value = parser.value()?;
    parser.skip_ws();
    parser.at_end().then_some(value)
}

/// Nesting limit for the literal parser, matching serde_json's recursion limit.
const MAX_DEPTH: usize = 128;

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            '[' => self.nested(|p| p.sequence(']').map(Value::Array)),
            '(' => self.nested(|p| p.sequence(')').map(Value::Array)),
            '{' => self.nested(Self::mapping),
            '\'' | '"' => self.strings().map(Value::String),
            c if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() => self.keyword(),
            _ => None,
        }
    }

    /// Consume an opening bracket and parse its contents one level deeper.
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Option<Value>) -> Option<Value> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.pos += 1;
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn sequence(&mut self, close: char) -> Option<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Some(items);
            }
            items.push(self.value()?);
            if self.eat(',') {
                continue;
            }
            return self.eat(close).then_some(items);
        }
    }

    fn mapping(&mut self) -> Option<Value> {
        let mut map = Map::new();
        loop {
            if self.eat('}') {
                return Some(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                other => other.to_string(),
            };
            if !self.eat(':') {
                return None;
            }
            let value = self.value()?;
            map.insert(key, value);
            if self.eat(',') {
                continue;
            }
            return self.eat('}').then_some(Value::Object(map));
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Option<String> {
        let mut out = self.string()?;
        loop {
            let save = self.pos;
            self.skip_ws();
            match self.peek() {
                Some('\'') | Some('"') => out.push_str(&self.string()?),
                _ => {
                    self.pos = save;
                    return Some(out);
                }
            }
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            let c = self.bump()?;
            if c == quote {
                return Some(out);
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            match self.bump()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                '\n' => {}
                'u' => {
                    let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                    let decoded = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)?;
                    out.push(decoded);
                }
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_'))
        {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        if let Ok(int) = raw.parse::<i64>() {
            return Some(Value::Number(int.into()));
        }
        let float = raw.parse::<f64>().ok()?;
        Number::from_f64(float).map(Value::Number)
    }

    fn keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Some(Value::Bool(true)),
            "False" | "false" => Some(Value::Bool(false)),
            "None" | "null" => Some(Value::Null),
            _ => None,
        }
    }
}
