//! Tokenizer and recursive-descent parser for rule source.
//!
//! Precedence, lowest first: `||`, `&&`, equality, comparison, additive,
//! multiplicative, unary, primary.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::ast::{BinaryOp, Expr, Function, UnaryOp};
use super::error::RuleError;
use super::value::RuleValue;

/// Maximum nesting of the expression tree.
///
/// Parsing, evaluation and drop all recurse over the tree, so caller-supplied
/// rules are bounded before they can exhaust the stack.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Decimal),
    Str(String),
    Ident(String),
    Dot,
    Comma,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Token {
    fn text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Str(s) => format!("'{s}'"),
            Self::Ident(name) => name.clone(),
            Self::Dot => ".".into(),
            Self::Comma => ",".into(),
            Self::LParen => "(".into(),
            Self::RParen => ")".into(),
            Self::Plus => "+".into(),
            Self::Minus => "-".into(),
            Self::Star => "*".into(),
            Self::Slash => "/".into(),
            Self::Bang => "!".into(),
            Self::AndAnd => "&&".into(),
            Self::OrOr => "||".into(),
            Self::EqEq => "==".into(),
            Self::NotEq => "!=".into(),
            Self::Lt => "<".into(),
            Self::Le => "<=".into(),
            Self::Gt => ">".into(),
            Self::Ge => ">=".into(),
        }
    }
}

/// Token with its byte offset in the source.
type Spanned = (Token, usize);

fn tokenize(source: &str) -> Result<Vec<Spanned>, RuleError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |idx: usize| chars.get(idx).map(|&(_, c)| c);

    while let Some(&(pos, c)) = chars.get(i) {
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && peek(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            while peek(i).is_some_and(|n| n.is_ascii_digit() || n == '.') {
                i += 1;
            }
            let end = chars.get(i).map_or(source.len(), |&(p, _)| p);
            let text = &source[pos..end];
            let number =
                Decimal::from_str(text).map_err(|_| RuleError::InvalidNumber(text.to_string()))?;
            tokens.push((Token::Number(number), pos));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            let mut name = String::new();
            while let Some(n) = peek(i).filter(|n| n.is_ascii_alphanumeric() || *n == '_' || *n == '$') {
                name.push(n);
                i += 1;
            }
            tokens.push((Token::Ident(name), pos));
            continue;
        }

        if c == '\'' || c == '"' {
            let quote = c;
            let mut text = String::new();
            i += 1;
            loop {
                match peek(i) {
                    None => return Err(RuleError::UnterminatedString(pos)),
                    Some('\\') => {
                        match peek(i + 1) {
                            Some(escaped) => text.push(escaped),
                            None => return Err(RuleError::UnterminatedString(pos)),
                        }
                        i += 2;
                    }
                    Some(n) if n == quote => {
                        i += 1;
                        break;
                    }
                    Some(n) => {
                        text.push(n);
                        i += 1;
                    }
                }
            }
            tokens.push((Token::Str(text), pos));
            continue;
        }

        let next = peek(i + 1);
        let (token, width) = match (c, next) {
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('=', Some('=')) if peek(i + 2) == Some('=') => (Token::EqEq, 3),
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) if peek(i + 2) == Some('=') => (Token::NotEq, 3),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('!', _) => (Token::Bang, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            ('.', _) => (Token::Dot, 1),
            _ => return Err(RuleError::UnexpectedCharacter { ch: c, position: pos }),
        };
        tokens.push((token, pos));
        i += width;
    }

    Ok(tokens)
}

/// Parses rule source into an expression tree.
///
/// # Errors
///
/// Returns `RuleError` on any syntax error or unknown function.
pub fn parse(source: &str) -> Result<Expr, RuleError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(RuleError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some((token, position)) => Err(RuleError::UnexpectedToken {
            found: token.text(),
            position: *position,
        }),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn descend(&mut self) -> Result<(), RuleError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(RuleError::TooDeep { max: MAX_DEPTH });
        }
        Ok(())
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<Expr, RuleError>) -> Result<Expr, RuleError> {
        self.descend()?;
        let expr = parse(self)?;
        self.depth -= 1;
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), RuleError> {
        match self.advance() {
            Some((ref token, _)) if token == expected => Ok(()),
            Some((token, position)) => Err(RuleError::UnexpectedToken {
                found: token.text(),
                position,
            }),
            None => Err(RuleError::UnexpectedEnd),
        }
    }

    /// Parses a left-associative chain of binary operators.
    fn binary_chain(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, RuleError>,
        op_for: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, RuleError> {
        let mut left = next(self)?;
        let mut folds = 0;
        // Each fold deepens the left spine of the tree.
        while let Some(op) = self.peek().and_then(op_for) {
            self.pos += 1;
            self.descend()?;
            folds += 1;
            let right = next(self)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth -= folds;
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, RuleError> {
        self.binary_chain(Self::parse_and, |t| (*t == Token::OrOr).then_some(BinaryOp::Or))
    }

    fn parse_and(&mut self) -> Result<Expr, RuleError> {
        self.binary_chain(Self::parse_equality, |t| {
            (*t == Token::AndAnd).then_some(BinaryOp::And)
        })
    }

    fn parse_equality(&mut self) -> Result<Expr, RuleError> {
        self.binary_chain(Self::parse_comparison, |t| match t {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::NotEq),
            _ => None,
        })
    }

    fn parse_comparison(&mut self) -> Result<Expr, RuleError> {
        self.binary_chain(Self::parse_additive, |t| match t {
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, RuleError> {
        self.binary_chain(Self::parse_multiplicative, |t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, RuleError> {
        self.binary_chain(Self::parse_unary, |t| match t {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, RuleError> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.nested(Self::parse_unary)?)));
        }
        if self.eat(&Token::Minus) {
            return Ok(Expr::Unary(UnaryOp::Negate, Box::new(self.nested(Self::parse_unary)?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, RuleError> {
        let Some((token, position)) = self.advance() else {
            return Err(RuleError::UnexpectedEnd);
        };

        match token {
            Token::Number(n) => Ok(Expr::Literal(RuleValue::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(RuleValue::Str(s))),
            Token::LParen => {
                let inner = self.nested(Self::parse_or)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => self.parse_identifier(name),
            other => Err(RuleError::UnexpectedToken {
                found: other.text(),
                position,
            }),
        }
    }

    fn parse_identifier(&mut self, name: String) -> Result<Expr, RuleError> {
        if self.eat(&Token::LParen) {
            let function =
                Function::from_name(&name).ok_or_else(|| RuleError::UnknownFunction(name.clone()))?;
            let mut args = Vec::new();
            if !self.eat(&Token::RParen) {
                loop {
                    args.push(self.nested(Self::parse_or)?);
                    if self.eat(&Token::RParen) {
                        break;
                    }
                    self.expect(&Token::Comma)?;
                }
            }
            return Ok(Expr::Call(function, args));
        }

        if self.peek() != Some(&Token::Dot) {
            match name.as_str() {
                "true" => return Ok(Expr::Literal(RuleValue::Bool(true))),
                "false" => return Ok(Expr::Literal(RuleValue::Bool(false))),
                "null" | "undefined" => return Ok(Expr::Literal(RuleValue::Undefined)),
                _ => {}
            }
        }

        let mut path = vec![name];
        while self.eat(&Token::Dot) {
            match self.advance() {
                Some((Token::Ident(segment), _)) => path.push(segment),
                Some((token, position)) => {
                    return Err(RuleError::UnexpectedToken {
                        found: token.text(),
                        position,
                    });
                }
                None => return Err(RuleError::UnexpectedEnd),
            }
        }

        // Method calls on fields are not part of the grammar.
        if let Some(&(Token::LParen, position)) = self.tokens.get(self.pos) {
            return Err(RuleError::UnexpectedToken {
                found: "(".into(),
                position,
            });
        }

        Ok(Expr::Path(path))
    }
}
