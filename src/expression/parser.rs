use super::ast::{BinaryOp, Expression, Literal, UnaryOp};
use super::lexer::{Spanned, Token, tokenize};
use crate::error::ExpressionError;

/// Maximum nesting of sub-expressions accepted by the parser.
pub const MAX_EXPRESSION_DEPTH: usize = 64;

const TERNARY_BINDING: u8 = 1;
const PREFIX_BINDING: u8 = 19;

/// Parses a single expression.
pub fn parse(source: &str) -> Result<Expression, ExpressionError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens);
    let expression = parser.parse_expression(0)?;
    match parser.peek() {
        Some(extra) => Err(parser.unexpected(extra, "end of expression")),
        None => Ok(expression),
    }
}

/// A Pratt parser over the token stream. Nesting is depth-capped so that
/// pathological input cannot exhaust the stack.
struct Parser<'a> {
    tokens: &'a [Spanned],
    position: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.position)
    }

    fn peek_token(&self) -> Option<&'a Token> {
        self.peek().map(|s| &s.token)
    }

    fn peek_second(&self) -> Option<&'a Token> {
        self.tokens.get(self.position + 1).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let spanned = self.tokens.get(self.position);
        if spanned.is_some() {
            self.position += 1;
        }
        spanned
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExpressionError> {
        match self.advance() {
            Some(spanned) if &spanned.token == expected => Ok(()),
            Some(spanned) => Err(self.unexpected(spanned, &format!("'{}'", expected))),
            None => Err(ExpressionError::UnexpectedEnd(format!("'{}'", expected))),
        }
    }

    fn unexpected(&self, spanned: &Spanned, expected: &str) -> ExpressionError {
        ExpressionError::UnexpectedToken {
            found: spanned.token.to_string(),
            expected: expected.to_string(),
            offset: spanned.offset,
        }
    }

    fn parse_expression(&mut self, min_binding: u8) -> Result<Expression, ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_DEPTH {
            return Err(ExpressionError::DepthExceeded(MAX_EXPRESSION_DEPTH));
        }

        let mut lhs = self.parse_prefix()?;
        let mut chained = 0;

        loop {
            lhs = match self.peek_token() {
                Some(Token::Dot) => {
                    self.advance();
                    match self.advance() {
                        Some(Spanned {
                            token: Token::Identifier(name),
                            ..
                        }) => Expression::Member(Box::new(lhs), name.clone()),
                        Some(other) => return Err(self.unexpected(other, "property name")),
                        None => return Err(ExpressionError::UnexpectedEnd("property name".into())),
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expression(0)?;
                    self.expect(&Token::RBracket)?;
                    Expression::Index(Box::new(lhs), Box::new(index))
                }
                Some(Token::Question) => {
                    if TERNARY_BINDING < min_binding {
                        break;
                    }
                    self.advance();
                    let then = self.parse_expression(0)?;
                    self.expect(&Token::Colon)?;
                    let otherwise = self.parse_expression(TERNARY_BINDING)?;
                    Expression::Conditional(Box::new(lhs), Box::new(then), Box::new(otherwise))
                }
                _ => {
                    let Some((op, width)) = self.peek_binary_operator() else {
                        break;
                    };
                    let (left_binding, right_binding) = binding_power(op);
                    if left_binding < min_binding {
                        break;
                    }
                    self.position += width;
                    let rhs = self.parse_expression(right_binding)?;
                    Expression::Binary(op, Box::new(lhs), Box::new(rhs))
                }
            };

            // Left-nested chains (`a.b.c`, `a + b + c`) deepen the tree too.
            chained += 1;
            if self.depth + chained > MAX_EXPRESSION_DEPTH {
                return Err(ExpressionError::DepthExceeded(MAX_EXPRESSION_DEPTH));
            }
        }

        self.depth -= 1;
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expression, ExpressionError> {
        let Some(spanned) = self.advance() else {
            return Err(ExpressionError::UnexpectedEnd("an operand".into()));
        };

        match &spanned.token {
            Token::Number(n) => Ok(Expression::Literal(Literal::Number(*n))),
            Token::Str(s) => Ok(Expression::Literal(Literal::String(s.clone()))),
            Token::Hash => Ok(Expression::Pointer),
            Token::Operator("-") => Ok(Expression::Unary(
                UnaryOp::Negate,
                Box::new(self.parse_expression(PREFIX_BINDING)?),
            )),
            Token::Operator("!") => Ok(Expression::Unary(
                UnaryOp::Not,
                Box::new(self.parse_expression(PREFIX_BINDING)?),
            )),
            Token::LParen => {
                let inner = self.parse_expression(0)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => Ok(Expression::Array(self.parse_list(&Token::RBracket)?)),
            Token::LBrace => self.parse_object(),
            Token::Identifier(name) => self.parse_identifier(name),
            _ => Err(self.unexpected(spanned, "an operand")),
        }
    }

    fn parse_identifier(&mut self, name: &str) -> Result<Expression, ExpressionError> {
        match name {
            "true" => Ok(Expression::Literal(Literal::Bool(true))),
            "false" => Ok(Expression::Literal(Literal::Bool(false))),
            "null" => Ok(Expression::Literal(Literal::Null)),
            "not" => Ok(Expression::Unary(
                UnaryOp::Not,
                Box::new(self.parse_expression(PREFIX_BINDING)?),
            )),
            _ if self.peek_token() == Some(&Token::LParen) => {
                self.advance();
                let args = self.parse_list(&Token::RParen)?;
                Ok(Expression::Call(name.to_string(), args))
            }
            _ => Ok(Expression::Identifier(name.to_string())),
        }
    }

    /// Parses comma-separated expressions up to and including `close`.
    fn parse_list(&mut self, close: &Token) -> Result<Vec<Expression>, ExpressionError> {
        let mut items = Vec::new();
        if self.peek_token() == Some(close) {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression(0)?);
            match self.advance() {
                Some(Spanned {
                    token: Token::Comma,
                    ..
                }) => continue,
                Some(spanned) if &spanned.token == close => return Ok(items),
                Some(spanned) => return Err(self.unexpected(spanned, &format!("',' or '{}'", close))),
                None => return Err(ExpressionError::UnexpectedEnd(format!("'{}'", close))),
            }
        }
    }

    fn parse_object(&mut self) -> Result<Expression, ExpressionError> {
        let mut fields = Vec::new();
        if self.peek_token() == Some(&Token::RBrace) {
            self.advance();
            return Ok(Expression::Object(fields));
        }
        loop {
            let key = match self.advance() {
                Some(Spanned {
                    token: Token::Identifier(name) | Token::Str(name),
                    ..
                }) => name.clone(),
                Some(other) => return Err(self.unexpected(other, "object key")),
                None => return Err(ExpressionError::UnexpectedEnd("object key".into())),
            };
            self.expect(&Token::Colon)?;
            fields.push((key, self.parse_expression(0)?));
            match self.advance() {
                Some(Spanned {
                    token: Token::Comma,
                    ..
                }) => continue,
                Some(Spanned {
                    token: Token::RBrace,
                    ..
                }) => return Ok(Expression::Object(fields)),
                Some(other) => return Err(self.unexpected(other, "',' or '}'")),
                None => return Err(ExpressionError::UnexpectedEnd("'}'".into())),
            }
        }
    }

    /// Recognizes a binary operator at the cursor without consuming it.
    /// Returns the operator and the number of tokens it spans.
    fn peek_binary_operator(&self) -> Option<(BinaryOp, usize)> {
        let op = match self.peek_token()? {
            Token::Operator(symbol) => match *symbol {
                "+" => BinaryOp::Add,
                "-" => BinaryOp::Subtract,
                "*" => BinaryOp::Multiply,
                "/" => BinaryOp::Divide,
                "%" => BinaryOp::Modulo,
                "^" => BinaryOp::Power,
                "==" => BinaryOp::Equal,
                "!=" => BinaryOp::NotEqual,
                "<" => BinaryOp::Less,
                "<=" => BinaryOp::LessOrEqual,
                ">" => BinaryOp::Greater,
                ">=" => BinaryOp::GreaterOrEqual,
                "&&" => BinaryOp::And,
                "||" => BinaryOp::Or,
                "??" => BinaryOp::Coalesce,
                _ => return None,
            },
            Token::Identifier(word) => match word.as_str() {
                "and" => BinaryOp::And,
                "or" => BinaryOp::Or,
                "in" => BinaryOp::In,
                "not" if matches!(self.peek_second(), Some(Token::Identifier(w)) if w == "in") => {
                    return Some((BinaryOp::NotIn, 2));
                }
                _ => return None,
            },
            _ => return None,
        };
        Some((op, 1))
    }
}

/// Left and right binding powers. Power is right-associative.
fn binding_power(op: BinaryOp) -> (u8, u8) {
    let level = op.precedence() * 2;
    match op {
        BinaryOp::Power => (level, level - 1),
        _ => (level, level + 1),
    }
}
