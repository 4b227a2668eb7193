//! Branch condition expressions
//!
//! A small boolean language over form values and process variables:
//! `amount > 100`, `dept == "sales" && amount >= 5000`, `!archived`.
//! Expressions are parsed once into an [`Expr`] and evaluated against a
//! [`Scope`].

use crate::models::instance::Values;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Parse failure with the byte offset it was detected at
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message} at offset {position}")]
pub struct ConditionError {
    pub position: usize,
    pub message: String,
}

impl ConditionError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
        };
        f.write_str(s)
    }
}

/// Parsed condition
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Always true; the parse of an empty condition
    Always,
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
    Compare(Operand, CmpOp, Operand),
    /// Bare operand, tested for truthiness
    Test(Operand),
}

/// Leaf of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Dotted path into form values, then variables
    Path(Vec<String>),
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
    Group(Box<Expr>),
}

/// Data a condition is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// Values submitted with the instance's form, consulted first
    pub form: Option<&'a Values>,
    /// Process variables
    pub variables: &'a Values,
}

impl<'a> Scope<'a> {
    pub fn new(form: Option<&'a Values>, variables: &'a Values) -> Self {
        Self { form, variables }
    }

    /// Resolve a dotted path, form values first; missing values are null
    fn lookup(&self, path: &[String]) -> Value {
        let Some((head, rest)) = path.split_first() else {
            return Value::Null;
        };
        let root = self
            .form
            .and_then(|f| f.get(head))
            .or_else(|| self.variables.get(head));

        let mut current = match root {
            Some(v) => v,
            None => return Value::Null,
        };
        for segment in rest {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(v) => current = v,
                None => return Value::Null,
            }
        }
        current.clone()
    }
}

impl Expr {
    /// Parse a condition string; blank input is [`Expr::Always`]
    pub fn parse(input: &str) -> Result<Self, ConditionError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Ok(Expr::Always);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or()?;
        if let Some((offset, token)) = parser.tokens.get(parser.pos) {
            return Err(ConditionError::new(
                *offset,
                format!("unexpected {}", token.describe()),
            ));
        }
        Ok(expr)
    }

    /// Evaluate against the given scope
    pub fn evaluate(&self, scope: &Scope<'_>) -> bool {
        match self {
            Expr::Always => true,
            Expr::Or(items) => items.iter().any(|e| e.evaluate(scope)),
            Expr::And(items) => items.iter().all(|e| e.evaluate(scope)),
            Expr::Not(inner) => !inner.evaluate(scope),
            Expr::Compare(left, op, right) => {
                compare(&left.resolve(scope), *op, &right.resolve(scope))
            }
            Expr::Test(operand) => truthy(&operand.resolve(scope)),
        }
    }
}

impl Operand {
    fn resolve(&self, scope: &Scope<'_>) -> Value {
        match self {
            Operand::Path(path) => scope.lookup(path),
            Operand::Number(n) => Value::from(*n),
            Operand::Text(s) => Value::String(s.clone()),
            Operand::Bool(b) => Value::Bool(*b),
            Operand::Null => Value::Null,
            Operand::Group(expr) => Value::Bool(expr.evaluate(scope)),
        }
    }
}

/// Parse and evaluate in one step
pub fn matches(condition: &str, scope: &Scope<'_>) -> Result<bool, ConditionError> {
    Expr::parse(condition).map(|expr| expr.evaluate(scope))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn compare(left: &Value, op: CmpOp, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
        };
    }
    match op {
        CmpOp::Eq => left == right,
        CmpOp::Ne => left != right,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Text(String),
    Cmp(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Number(n) => format!("number {}", n),
            Token::Text(s) => format!("string \"{}\"", s),
            Token::Cmp(op) => format!("operator '{}'", op),
            Token::And => "'&&'".to_string(),
            Token::Or => "'||'".to_string(),
            Token::Not => "'!'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ConditionError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let token = match (c, next) {
            ('(', _) => Token::LParen,
            (')', _) => Token::RParen,
            ('&', Some('&')) => {
                i += 1;
                Token::And
            }
            ('|', Some('|')) => {
                i += 1;
                Token::Or
            }
            ('=', Some('=')) => {
                i += 1;
                Token::Cmp(CmpOp::Eq)
            }
            ('!', Some('=')) => {
                i += 1;
                Token::Cmp(CmpOp::Ne)
            }
            ('>', Some('=')) => {
                i += 1;
                Token::Cmp(CmpOp::Ge)
            }
            ('<', Some('=')) => {
                i += 1;
                Token::Cmp(CmpOp::Le)
            }
            ('!', _) => Token::Not,
            ('>', _) => Token::Cmp(CmpOp::Gt),
            ('<', _) => Token::Cmp(CmpOp::Lt),
            ('"', _) | ('\'', _) => {
                let (text, end) = read_string(&chars, i)?;
                tokens.push((offset, Token::Text(text)));
                i = end;
                continue;
            }
            (c, _) if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let (number, end) = read_number(input, &chars, i)?;
                tokens.push((offset, Token::Number(number)));
                i = end;
                continue;
            }
            (c, _) if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() {
                    let c = chars[i].1;
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let end = chars.get(i).map(|(o, _)| *o).unwrap_or(input.len());
                tokens.push((offset, Token::Ident(input[chars[start].0..end].to_string())));
                continue;
            }
            (c, _) => {
                return Err(ConditionError::new(
                    offset,
                    format!("unexpected character '{}'", c),
                ))
            }
        };
        tokens.push((offset, token));
        i += 1;
    }

    Ok(tokens)
}

fn read_string(chars: &[(usize, char)], start: usize) -> Result<(String, usize), ConditionError> {
    let (offset, quote) = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == '\\' {
            match chars.get(i + 1) {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, escaped)) => out.push(*escaped),
                None => break,
            }
            i += 2;
            continue;
        }
        if c == quote {
            return Ok((out, i + 1));
        }
        out.push(c);
        i += 1;
    }
    Err(ConditionError::new(offset, "unterminated string"))
}

fn read_number(
    input: &str,
    chars: &[(usize, char)],
    start: usize,
) -> Result<(f64, usize), ConditionError> {
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i].1;
        let prev = chars[i - 1].1;
        let exponent_sign = (c == '-' || c == '+') && (prev == 'e' || prev == 'E');
        if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
            i += 1;
        } else {
            break;
        }
    }
    let from = chars[start].0;
    let to = chars.get(i).map(|(o, _)| *o).unwrap_or(input.len());
    let literal = &input[from..to];
    literal
        .parse::<f64>()
        .map(|n| (n, i))
        .map_err(|_| ConditionError::new(from, format!("invalid number '{}'", literal)))
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(o, _)| *o)
            .unwrap_or(0)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn or(&mut self) -> Result<Expr, ConditionError> {
        let mut items = vec![self.and()?];
        while self.peek() == Some(&Token::Or) {
            self.bump();
            items.push(self.and()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Or(items)
        })
    }

    fn and(&mut self) -> Result<Expr, ConditionError> {
        let mut items = vec![self.unary()?];
        while self.peek() == Some(&Token::And) {
            self.bump();
            items.push(self.unary()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::And(items)
        })
    }

    fn unary(&mut self) -> Result<Expr, ConditionError> {
        if self.peek() == Some(&Token::Not) {
            self.bump();
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ConditionError> {
        let left = self.operand()?;
        if let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.bump();
            let right = self.operand()?;
            return Ok(Expr::Compare(left, op, right));
        }
        Ok(Expr::Test(left))
    }

    fn operand(&mut self) -> Result<Operand, ConditionError> {
        let offset = self.offset();
        match self.bump() {
            Some(Token::Number(n)) => Ok(Operand::Number(n)),
            Some(Token::Text(s)) => Ok(Operand::Text(s)),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Operand::Bool(true),
                "false" => Operand::Bool(false),
                "null" => Operand::Null,
                _ => {
                    if name.split('.').any(str::is_empty) {
                        return Err(ConditionError::new(
                            offset,
                            format!("invalid path '{}'", name),
                        ));
                    }
                    Operand::Path(name.split('.').map(str::to_string).collect())
                }
            }),
            Some(Token::LParen) => {
                let inner = self.or()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(Operand::Group(Box::new(inner))),
                    _ => Err(ConditionError::new(offset, "unclosed '('")),
                }
            }
            Some(other) => Err(ConditionError::new(
                offset,
                format!("expected a value, found {}", other.describe()),
            )),
            None => Err(ConditionError::new(offset, "unexpected end of condition")),
        }
    }
}
