//! Argument expressions.
//!
//! Grammar:
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := '-' unary | primary
//! primary := number | 'string' | true | false | @component | '(' expr ')'
//! ```
//! Integer arithmetic stays integral; mixing in a float widens to float.
//! `+` with a string operand concatenates.

use super::{ArgValue, ComponentRegistry};
use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Component(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '\'' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&c| c == '\'')
                    .map(|p| start + p)
                    .ok_or("unterminated string literal")?;
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '@' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                if end == start {
                    return Err("expected component name after '@'".into());
                }
                tokens.push(Token::Component(chars[start..end].iter().collect()));
                i = end;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if text.contains('.') {
                    let v = text
                        .parse::<f64>()
                        .map_err(|_| format!("invalid number '{}'", text))?;
                    tokens.push(Token::Float(v));
                } else {
                    let v = text
                        .parse::<i64>()
                        .map_err(|_| format!("invalid number '{}'", text))?;
                    tokens.push(Token::Int(v));
                }
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    components: &'a ComponentRegistry,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<ArgValue, String> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => '+',
                Some(Token::Minus) => '-',
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = binary(op, left, right)?;
        }
    }

    fn term(&mut self) -> Result<ArgValue, String> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => '*',
                Some(Token::Slash) => '/',
                Some(Token::Percent) => '%',
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = binary(op, left, right)?;
        }
    }

    fn unary(&mut self) -> Result<ArgValue, String> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return match self.unary()? {
                ArgValue::Int(i) => i
                    .checked_neg()
                    .map(ArgValue::Int)
                    .ok_or_else(|| "integer overflow".to_string()),
                ArgValue::Float(v) => Ok(ArgValue::Float(-v)),
                other => Err(format!("cannot negate {}", other.type_name())),
            };
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<ArgValue, String> {
        match self.next() {
            Some(Token::Int(i)) => Ok(ArgValue::Int(i)),
            Some(Token::Float(v)) => Ok(ArgValue::Float(v)),
            Some(Token::Str(s)) => Ok(ArgValue::Str(s)),
            Some(Token::Ident(id)) => match id.as_str() {
                "true" => Ok(ArgValue::Bool(true)),
                "false" => Ok(ArgValue::Bool(false)),
                _ => Err(format!("unknown identifier '{}'", id)),
            },
            Some(Token::Component(name)) => self
                .components
                .get(&name)
                .cloned()
                .ok_or_else(|| format!("no component named '{}'", name)),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("expected ')'".into()),
                }
            }
            Some(other) => Err(format!("unexpected token {:?}", other)),
            None => Err("unexpected end of expression".into()),
        }
    }
}

fn binary(op: char, left: ArgValue, right: ArgValue) -> Result<ArgValue, String> {
    use ArgValue::{Float, Int, Str};

    match (op, left, right) {
        ('+', Str(a), b) => Ok(Str(format!("{}{}", a, b))),
        ('+', a @ (Int(_) | Float(_) | ArgValue::Bool(_)), Str(b)) => Ok(Str(format!("{}{}", a, b))),
        (_, Int(a), Int(b)) => {
            let result = match op {
                '+' => a.checked_add(b),
                '-' => a.checked_sub(b),
                '*' => a.checked_mul(b),
                '/' if b == 0 => return Err("division by zero".into()),
                '/' => a.checked_div(b),
                '%' if b == 0 => return Err("division by zero".into()),
                _ => a.checked_rem(b),
            };
            result.map(Int).ok_or_else(|| "integer overflow".to_string())
        }
        (_, a @ (Int(_) | Float(_)), b @ (Int(_) | Float(_))) => {
            let (a, b) = (as_f64(&a), as_f64(&b));
            Ok(Float(match op {
                '+' => a + b,
                '-' => a - b,
                '*' => a * b,
                '/' => a / b,
                _ => a % b,
            }))
        }
        (op, a, b) => Err(format!(
            "operator '{}' not supported for {} and {}",
            op,
            a.type_name(),
            b.type_name()
        )),
    }
}

fn as_f64(value: &ArgValue) -> f64 {
    match value {
        ArgValue::Int(i) => *i as f64,
        ArgValue::Float(v) => *v,
        _ => f64::NAN,
    }
}

/// Evaluate the body of a `#{...}` argument.
pub fn evaluate(expression: &str, components: &ComponentRegistry) -> GatewayResult<ArgValue> {
    let error = |reason: String| GatewayError::Expression {
        expression: expression.to_string(),
        reason,
    };

    let tokens = tokenize(expression).map_err(error)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        components,
    };
    let value = parser.expr().map_err(error)?;
    if parser.pos < parser.tokens.len() {
        return Err(error(format!(
            "unexpected trailing input at token {}",
            parser.pos
        )));
    }
    Ok(value)
}
