//! Responsive rule expressions.
//!
//! `responsiveConfig` keys are small boolean expressions evaluated against
//! the [`Environment`](crate::environment::Environment) property map, e.g.
//! `width < 600 && platform == 'phone'`. This module implements the lexer
//! (logos), a recursive-descent parser, and the evaluator.
//!
//! A rule that fails to parse, references an unknown property, or mixes
//! operand types is treated by callers as a non-matching rule, not a hard
//! error; [`matches`] encodes that policy.

use logos::Logos;
use thiserror::Error;

use crate::environment::Environment;

/// Errors from rule parsing or evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    /// Unrecognized input at the given byte offset.
    #[error("Unrecognized token at offset {0}")]
    Lex(usize),

    /// Parser met a token it cannot use here.
    #[error("Unexpected token '{0}'")]
    UnexpectedToken(String),

    /// Input ended mid-expression.
    #[error("Unexpected end of rule")]
    UnexpectedEnd,

    /// Operand types do not fit the operator.
    #[error("Type mismatch in rule: {0}")]
    TypeMismatch(String),

    /// Identifier not present in the environment.
    #[error("Unknown environment property '{0}'")]
    UnknownIdent(String),
}

/// Logos-based token enum for rule lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    // Keywords (must come before identifiers)
    #[token("true")]
    True,

    #[token("false")]
    False,

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r#""[^"]*""#, |lex| trim_quotes(lex.slice()))]
    #[regex(r"'[^']*'", |lex| trim_quotes(lex.slice()))]
    Str(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("==")]
    EqEq,

    #[token("!=")]
    NotEq,

    #[token("<=")]
    Le,

    #[token(">=")]
    Ge,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token("&&")]
    AndAnd,

    #[token("||")]
    OrOr,

    #[token("!")]
    Bang,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,
}

fn trim_quotes(slice: &str) -> String {
    slice[1..slice.len() - 1].to_string()
}

/// Comparison and equality operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Parsed rule expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleExpr {
    /// Numeric literal.
    Num(f64),
    /// String literal.
    Str(String),
    /// Boolean literal.
    Bool(bool),
    /// Environment property reference.
    Ident(String),
    /// Logical negation.
    Not(Box<RuleExpr>),
    /// Comparison between two operands.
    Cmp(CmpOp, Box<RuleExpr>, Box<RuleExpr>),
    /// Logical conjunction.
    And(Box<RuleExpr>, Box<RuleExpr>),
    /// Logical disjunction.
    Or(Box<RuleExpr>, Box<RuleExpr>),
}

/// Runtime value a sub-expression evaluates to.
#[derive(Debug, Clone, PartialEq)]
enum RuleValue {
    Num(f64),
    Str(String),
    Bool(bool),
}

/// Parse a rule expression.
pub fn parse(src: &str) -> Result<RuleExpr, RuleError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(src);
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(token),
            Err(_) => return Err(RuleError::Lex(lexer.span().start)),
        }
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(RuleError::UnexpectedToken(format!(
            "{:?}",
            parser.tokens[parser.pos]
        )));
    }
    Ok(expr)
}

/// Evaluate a rule source against an environment, treating every failure
/// (parse error, unknown property, type mismatch, non-boolean result) as a
/// non-match.
pub fn matches(src: &str, env: &Environment) -> bool {
    match parse(src) {
        Ok(expr) => matches!(eval(&expr, env), Ok(RuleValue::Bool(true))),
        Err(_) => false,
    }
}

/// Evaluate a parsed rule to a boolean.
pub fn eval_bool(expr: &RuleExpr, env: &Environment) -> Result<bool, RuleError> {
    match eval(expr, env)? {
        RuleValue::Bool(b) => Ok(b),
        other => Err(RuleError::TypeMismatch(format!(
            "rule evaluated to {:?}, expected boolean",
            other
        ))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, RuleError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(RuleError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn or_expr(&mut self) -> Result<RuleExpr, RuleError> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::OrOr) {
            self.pos += 1;
            let right = self.and_expr()?;
            left = RuleExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<RuleExpr, RuleError> {
        let mut left = self.unary_expr()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.pos += 1;
            let right = self.unary_expr()?;
            left = RuleExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<RuleExpr, RuleError> {
        if self.peek() == Some(&Token::Bang) {
            self.pos += 1;
            let inner = self.unary_expr()?;
            return Ok(RuleExpr::Not(Box::new(inner)));
        }
        self.cmp_expr()
    }

    fn cmp_expr(&mut self) -> Result<RuleExpr, RuleError> {
        let left = self.primary()?;
        let op = match self.peek() {
            Some(Token::EqEq) => CmpOp::Eq,
            Some(Token::NotEq) => CmpOp::Ne,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.primary()?;
        Ok(RuleExpr::Cmp(op, Box::new(left), Box::new(right)))
    }

    fn primary(&mut self) -> Result<RuleExpr, RuleError> {
        match self.next()? {
            Token::Number(n) => Ok(RuleExpr::Num(n)),
            Token::Str(s) => Ok(RuleExpr::Str(s)),
            Token::True => Ok(RuleExpr::Bool(true)),
            Token::False => Ok(RuleExpr::Bool(false)),
            Token::Ident(name) => Ok(RuleExpr::Ident(name)),
            Token::LParen => {
                let inner = self.or_expr()?;
                match self.next()? {
                    Token::RParen => Ok(inner),
                    other => Err(RuleError::UnexpectedToken(format!("{:?}", other))),
                }
            }
            other => Err(RuleError::UnexpectedToken(format!("{:?}", other))),
        }
    }
}

fn eval(expr: &RuleExpr, env: &Environment) -> Result<RuleValue, RuleError> {
    match expr {
        RuleExpr::Num(n) => Ok(RuleValue::Num(*n)),
        RuleExpr::Str(s) => Ok(RuleValue::Str(s.clone())),
        RuleExpr::Bool(b) => Ok(RuleValue::Bool(*b)),
        RuleExpr::Ident(name) => {
            let value = env
                .prop(name)
                .ok_or_else(|| RuleError::UnknownIdent(name.clone()))?;
            match value {
                serde_json::Value::Number(n) => n
                    .as_f64()
                    .map(RuleValue::Num)
                    .ok_or_else(|| RuleError::TypeMismatch(name.clone())),
                serde_json::Value::String(s) => Ok(RuleValue::Str(s)),
                serde_json::Value::Bool(b) => Ok(RuleValue::Bool(b)),
                other => Err(RuleError::TypeMismatch(format!(
                    "property '{}' has unsupported type {:?}",
                    name, other
                ))),
            }
        }
        RuleExpr::Not(inner) => {
            let value = eval_bool(inner, env)?;
            Ok(RuleValue::Bool(!value))
        }
        RuleExpr::And(left, right) => {
            // Short-circuit
            if !eval_bool(left, env)? {
                return Ok(RuleValue::Bool(false));
            }
            Ok(RuleValue::Bool(eval_bool(right, env)?))
        }
        RuleExpr::Or(left, right) => {
            if eval_bool(left, env)? {
                return Ok(RuleValue::Bool(true));
            }
            Ok(RuleValue::Bool(eval_bool(right, env)?))
        }
        RuleExpr::Cmp(op, left, right) => {
            let lhs = eval(left, env)?;
            let rhs = eval(right, env)?;
            eval_cmp(*op, lhs, rhs)
        }
    }
}

fn eval_cmp(op: CmpOp, lhs: RuleValue, rhs: RuleValue) -> Result<RuleValue, RuleError> {
    let result = match (op, &lhs, &rhs) {
        (CmpOp::Eq, _, _) => lhs == rhs,
        (CmpOp::Ne, _, _) => lhs != rhs,
        (_, RuleValue::Num(a), RuleValue::Num(b)) => match op {
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
            CmpOp::Eq | CmpOp::Ne => unreachable!(),
        },
        _ => {
            return Err(RuleError::TypeMismatch(format!(
                "cannot order {:?} and {:?}",
                lhs, rhs
            )))
        }
    };
    Ok(RuleValue::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn phone_env() -> Environment {
        Environment::new("phone")
            .with_prop("width", json!(320))
            .with_prop("height", json!(568))
            .with_prop("landscape", json!(false))
    }

    #[test]
    fn test_numeric_comparison() {
        let env = phone_env();
        assert!(matches("width < 600", &env));
        assert!(!matches("width >= 600", &env));
        assert!(matches("height > 500", &env));
    }

    #[test]
    fn test_string_equality() {
        let env = phone_env();
        assert!(matches("platform == 'phone'", &env));
        assert!(matches("platform != \"desktop\"", &env));
    }

    #[test]
    fn test_boolean_props_and_negation() {
        let env = phone_env();
        assert!(matches("!landscape", &env));
        assert!(!matches("landscape", &env));
    }

    #[test]
    fn test_conjunction_and_precedence() {
        let env = phone_env();
        assert!(matches("width < 600 && platform == 'phone'", &env));
        assert!(matches("width > 600 || height > 500", &env));
        // && binds tighter than ||
        assert!(matches("width > 600 && landscape || height > 500", &env));
    }

    #[test]
    fn test_parenthesized() {
        let env = phone_env();
        assert!(!matches("width > 600 && (landscape || height > 500)", &env));
    }

    #[test]
    fn test_unknown_property_is_non_match() {
        let env = phone_env();
        assert!(!matches("dpi > 100", &env));
    }

    #[test]
    fn test_type_mismatch_is_non_match() {
        let env = phone_env();
        assert!(!matches("platform < 600", &env));
    }

    #[test]
    fn test_parse_error_is_non_match() {
        let env = phone_env();
        assert!(!matches("width <", &env));
        assert!(!matches("width # 600", &env));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(parse("width < 600 )").is_err());
    }

    #[test]
    fn test_non_boolean_rule_is_non_match() {
        let env = phone_env();
        assert!(!matches("width", &env));
    }
}
