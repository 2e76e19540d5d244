//! Safe rule-expression evaluator
//!
//! Requirement rules are stored as text in the catalog
//! (e.g. `abs(SOC_BMS - SOC_Affiche) <= 5`). They are parsed into a
//! small closed AST and interpreted over a scalar scope mapping each
//! signal name to the mean of its samples. No general-purpose code
//! execution is possible: the grammar covers arithmetic, comparisons,
//! boolean connectives and the `abs`/`min`/`max` functions, nothing
//! else.
//!
//! Grammar (precedence low → high):
//!
//! ```text
//! or     := and ("or" | "||") and ...
//! and    := not ("and" | "&&") not ...
//! not    := ("not" | "!") not | cmp
//! cmp    := sum (("<" | "<=" | ">" | ">=" | "==" | "!=") sum)?
//! sum    := term (("+" | "-") term) ...
//! term   := unary (("*" | "/") unary) ...
//! unary  := "-" unary | primary
//! primary := number | ident | ident "(" args ")" | "(" or ")"
//! ```

use std::collections::HashMap;
use std::fmt;

/// Errors produced while parsing or evaluating a rule
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum RuleError {
    #[error("Unexpected character '{0}' in rule")]
    UnexpectedChar(char),

    #[error("Unexpected end of rule")]
    UnexpectedEnd,

    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function {name} expects {expected} argument(s), got {got}")]
    BadArity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Not,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(v) => write!(f, "{}", v),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::Eq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Parsed rule expression
#[derive(Debug, Clone)]
pub enum RuleExpr {
    Number(f64),
    Variable(String),
    Neg(Box<RuleExpr>),
    Not(Box<RuleExpr>),
    Binary {
        op: BinaryOp,
        left: Box<RuleExpr>,
        right: Box<RuleExpr>,
    },
    Compare {
        op: CompareOp,
        left: Box<RuleExpr>,
        right: Box<RuleExpr>,
    },
    Logic {
        op: LogicOp,
        left: Box<RuleExpr>,
        right: Box<RuleExpr>,
    },
    Call {
        name: String,
        args: Vec<RuleExpr>,
    },
}

/// Result of evaluating a (sub)expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
        }
    }

    fn as_number(&self) -> Result<f64, RuleError> {
        match self {
            Value::Number(v) => Ok(*v),
            Value::Bool(_) => Err(RuleError::TypeMismatch {
                expected: "number",
                got: "boolean",
            }),
        }
    }

    fn as_bool(&self) -> Result<bool, RuleError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Number(_) => Err(RuleError::TypeMismatch {
                expected: "boolean",
                got: "number",
            }),
        }
    }
}

fn tokenize(rule: &str) -> Result<Vec<Token>, RuleError> {
    let mut tokens = Vec::new();
    let mut chars = rule.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| RuleError::UnexpectedToken(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match ident.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(ident),
                });
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Eq);
                } else {
                    return Err(RuleError::UnexpectedChar('='));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '&' => {
                chars.next();
                if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push(Token::And);
                } else {
                    return Err(RuleError::UnexpectedChar('&'));
                }
            }
            '|' => {
                chars.next();
                if chars.peek() == Some(&'|') {
                    chars.next();
                    tokens.push(Token::Or);
                } else {
                    return Err(RuleError::UnexpectedChar('|'));
                }
            }
            other => return Err(RuleError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct RuleParser {
    tokens: Vec<Token>,
    index: usize,
}

impl RuleParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    fn parse(mut self) -> Result<RuleExpr, RuleError> {
        let expr = self.parse_or()?;
        if self.index != self.tokens.len() {
            return Err(RuleError::UnexpectedToken(
                self.tokens[self.index].to_string(),
            ));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<RuleExpr, RuleError> {
        let mut expr = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            let _ = self.consume();
            let rhs = self.parse_and()?;
            expr = RuleExpr::Logic {
                op: LogicOp::Or,
                left: Box::new(expr),
                right: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<RuleExpr, RuleError> {
        let mut expr = self.parse_not()?;
        while matches!(self.peek(), Some(Token::And)) {
            let _ = self.consume();
            let rhs = self.parse_not()?;
            expr = RuleExpr::Logic {
                op: LogicOp::And,
                left: Box::new(expr),
                right: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<RuleExpr, RuleError> {
        if matches!(self.peek(), Some(Token::Not)) {
            let _ = self.consume();
            return Ok(RuleExpr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<RuleExpr, RuleError> {
        let expr = self.parse_add_sub()?;
        let op = match self.peek() {
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Ge) => CompareOp::Ge,
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Ne) => CompareOp::Ne,
            _ => return Ok(expr),
        };
        let _ = self.consume();
        let rhs = self.parse_add_sub()?;
        Ok(RuleExpr::Compare {
            op,
            left: Box::new(expr),
            right: Box::new(rhs),
        })
    }

    fn parse_add_sub(&mut self) -> Result<RuleExpr, RuleError> {
        let mut expr = self.parse_mul_div()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            let _ = self.consume();
            let rhs = self.parse_mul_div()?;
            expr = RuleExpr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_mul_div(&mut self) -> Result<RuleExpr, RuleError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            let _ = self.consume();
            let rhs = self.parse_unary()?;
            expr = RuleExpr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<RuleExpr, RuleError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            let _ = self.consume();
            return Ok(RuleExpr::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<RuleExpr, RuleError> {
        match self.consume() {
            Some(Token::Number(value)) => Ok(RuleExpr::Number(value)),
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    let _ = self.consume();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Token::RParen)) {
                        loop {
                            args.push(self.parse_or()?);
                            if matches!(self.peek(), Some(Token::Comma)) {
                                let _ = self.consume();
                                continue;
                            }
                            break;
                        }
                    }
                    if !matches!(self.consume(), Some(Token::RParen)) {
                        return Err(RuleError::UnexpectedEnd);
                    }
                    Ok(RuleExpr::Call { name, args })
                } else {
                    Ok(RuleExpr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                if !matches!(self.consume(), Some(Token::RParen)) {
                    return Err(RuleError::UnexpectedEnd);
                }
                Ok(expr)
            }
            Some(other) => Err(RuleError::UnexpectedToken(other.to_string())),
            None => Err(RuleError::UnexpectedEnd),
        }
    }
}

/// Parse a rule expression string into its AST
pub fn parse(rule: &str) -> Result<RuleExpr, RuleError> {
    let tokens = tokenize(rule)?;
    if tokens.is_empty() {
        return Err(RuleError::UnexpectedEnd);
    }
    RuleParser::new(tokens).parse()
}

/// Evaluate an AST against a scalar scope
pub fn evaluate(expr: &RuleExpr, scope: &HashMap<String, f64>) -> Result<Value, RuleError> {
    match expr {
        RuleExpr::Number(v) => Ok(Value::Number(*v)),
        RuleExpr::Variable(name) => scope
            .get(name)
            .map(|v| Value::Number(*v))
            .ok_or_else(|| RuleError::UnknownVariable(name.clone())),
        RuleExpr::Neg(inner) => {
            let v = evaluate(inner, scope)?.as_number()?;
            Ok(Value::Number(-v))
        }
        RuleExpr::Not(inner) => {
            let b = evaluate(inner, scope)?.as_bool()?;
            Ok(Value::Bool(!b))
        }
        RuleExpr::Binary { op, left, right } => {
            let lhs = evaluate(left, scope)?.as_number()?;
            let rhs = evaluate(right, scope)?.as_number()?;
            let result = match op {
                BinaryOp::Add => lhs + rhs,
                BinaryOp::Sub => lhs - rhs,
                BinaryOp::Mul => lhs * rhs,
                BinaryOp::Div => lhs / rhs,
            };
            Ok(Value::Number(result))
        }
        RuleExpr::Compare { op, left, right } => {
            let lhs = evaluate(left, scope)?.as_number()?;
            let rhs = evaluate(right, scope)?.as_number()?;
            let result = match op {
                CompareOp::Lt => lhs < rhs,
                CompareOp::Le => lhs <= rhs,
                CompareOp::Gt => lhs > rhs,
                CompareOp::Ge => lhs >= rhs,
                CompareOp::Eq => lhs == rhs,
                CompareOp::Ne => lhs != rhs,
            };
            Ok(Value::Bool(result))
        }
        RuleExpr::Logic { op, left, right } => {
            let lhs = evaluate(left, scope)?.as_bool()?;
            // Short-circuit: the right side is only evaluated when needed
            match op {
                LogicOp::And if !lhs => Ok(Value::Bool(false)),
                LogicOp::Or if lhs => Ok(Value::Bool(true)),
                _ => Ok(Value::Bool(evaluate(right, scope)?.as_bool()?)),
            }
        }
        RuleExpr::Call { name, args } => {
            let values: Vec<f64> = args
                .iter()
                .map(|a| evaluate(a, scope)?.as_number())
                .collect::<Result<_, _>>()?;
            match name.as_str() {
                "abs" => {
                    expect_arity(name, 1, values.len())?;
                    Ok(Value::Number(values[0].abs()))
                }
                "min" => {
                    expect_arity(name, 2, values.len())?;
                    Ok(Value::Number(values[0].min(values[1])))
                }
                "max" => {
                    expect_arity(name, 2, values.len())?;
                    Ok(Value::Number(values[0].max(values[1])))
                }
                _ => Err(RuleError::UnknownFunction(name.clone())),
            }
        }
    }
}

fn expect_arity(name: &str, expected: usize, got: usize) -> Result<(), RuleError> {
    if expected != got {
        return Err(RuleError::BadArity {
            name: name.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

/// Parse and evaluate a rule, requiring a boolean result.
///
/// This is the entry point the verifier uses: the rule text must form
/// a condition, not a bare arithmetic expression.
pub fn evaluate_condition(rule: &str, scope: &HashMap<String, f64>) -> Result<bool, RuleError> {
    let expr = parse(rule)?;
    evaluate(&expr, scope)?.as_bool()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_soc_deviation_rule() {
        let scope = scope(&[("SOC_BMS", 81.0), ("SOC_Affiche", 80.5)]);
        let result = evaluate_condition("abs(SOC_BMS - SOC_Affiche) <= 5", &scope).unwrap();
        assert!(result);
    }

    #[test]
    fn test_temperature_band_rule() {
        let scope = scope(&[("Temperature_Battery", 71.0)]);
        let result = evaluate_condition(
            "(Temperature_Battery >= -20) and (Temperature_Battery <= 60)",
            &scope,
        )
        .unwrap();
        assert!(!result);
    }

    #[test]
    fn test_or_and_symbolic_operators() {
        let scope = scope(&[("A", 1.0), ("B", 10.0)]);
        assert!(evaluate_condition("A > 5 or B > 5", &scope).unwrap());
        assert!(evaluate_condition("A < 5 && B > 5", &scope).unwrap());
        assert!(!evaluate_condition("!(A < 5)", &scope).unwrap());
    }

    #[test]
    fn test_arithmetic_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(evaluate(&expr, &HashMap::new()).unwrap(), Value::Number(7.0));

        let expr = parse("(1 + 2) * 3").unwrap();
        assert_eq!(evaluate(&expr, &HashMap::new()).unwrap(), Value::Number(9.0));

        let expr = parse("-2 * 3").unwrap();
        assert_eq!(
            evaluate(&expr, &HashMap::new()).unwrap(),
            Value::Number(-6.0)
        );
    }

    #[test]
    fn test_unknown_variable_is_error() {
        let err = evaluate_condition("Missing_Signal > 0", &HashMap::new()).unwrap_err();
        assert_eq!(err, RuleError::UnknownVariable("Missing_Signal".to_string()));
    }

    #[test]
    fn test_non_boolean_rule_is_error() {
        let scope = scope(&[("A", 1.0)]);
        let err = evaluate_condition("A + 1", &scope).unwrap_err();
        assert!(matches!(err, RuleError::TypeMismatch { .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("A <").is_err());
        assert!(parse("abs(A").is_err());
        assert!(parse("A # B").is_err());
        assert!(parse("A = 1").is_err());
    }

    #[test]
    fn test_unknown_function() {
        let scope = scope(&[("A", 1.0)]);
        let err = evaluate_condition("exec(A) > 0", &scope).unwrap_err();
        assert_eq!(err, RuleError::UnknownFunction("exec".to_string()));
    }

    #[test]
    fn test_min_max() {
        let scope = scope(&[("A", 3.0), ("B", 7.0)]);
        assert!(evaluate_condition("min(A, B) == 3", &scope).unwrap());
        assert!(evaluate_condition("max(A, B) == 7", &scope).unwrap());
    }
}
