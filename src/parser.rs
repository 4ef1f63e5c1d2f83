use crate::ast::{BlockStatement, Expr, Identifier, InfixOp, PrefixOp, Program, Stmt};
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenKind};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace_span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

impl Precedence {
    pub fn of(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Equal | TokenKind::NotEqual => Precedence::Equals,
            TokenKind::Less
            | TokenKind::Greater
            | TokenKind::LessEqual
            | TokenKind::GreaterEqual => Precedence::LessGreater,
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
            TokenKind::LeftParen => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }
}

type PrefixParseFn = fn(&mut Parser) -> Option<Expr>;
type InfixParseFn = fn(&mut Parser, Expr) -> Option<Expr>;

/// Pratt parser over a [`Lexer`].
///
/// Malformed input never aborts the parse: each failed expectation is pushed
/// onto [`Parser::errors`] and the construct being parsed is dropped. Callers
/// must check the error list before trusting the returned program.
pub struct Parser {
    lexer: Lexer,
    cur_token: Token,
    peek_token: Token,
    errors: Vec<ParseError>,
    prefix_parse_fns: HashMap<TokenKind, PrefixParseFn>,
    infix_parse_fns: HashMap<TokenKind, InfixParseFn>,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let cur_token = lexer.next_token();
        let peek_token = lexer.next_token();

        let mut parser = Self {
            lexer,
            cur_token,
            peek_token,
            errors: Vec::new(),
            prefix_parse_fns: HashMap::new(),
            infix_parse_fns: HashMap::new(),
        };

        parser.register_prefix(TokenKind::Identifier, Parser::parse_identifier);
        parser.register_prefix(TokenKind::Integer, Parser::parse_integer_literal);
        parser.register_prefix(TokenKind::True, Parser::parse_boolean);
        parser.register_prefix(TokenKind::False, Parser::parse_boolean);
        parser.register_prefix(TokenKind::Bang, Parser::parse_prefix_expression);
        parser.register_prefix(TokenKind::Minus, Parser::parse_prefix_expression);
        parser.register_prefix(TokenKind::LeftParen, Parser::parse_grouped_expression);
        parser.register_prefix(TokenKind::If, Parser::parse_if_expression);
        parser.register_prefix(TokenKind::Function, Parser::parse_function_literal);

        for kind in [
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Asterisk,
            TokenKind::Slash,
            TokenKind::Equal,
            TokenKind::NotEqual,
            TokenKind::Less,
            TokenKind::Greater,
            TokenKind::LessEqual,
            TokenKind::GreaterEqual,
        ] {
            parser.register_infix(kind, Parser::parse_infix_expression);
        }
        parser.register_infix(TokenKind::LeftParen, Parser::parse_call_expression);

        parser
    }

    /// Convenience for `Parser::new(Lexer::new(source))`.
    pub fn from_source(source: &str) -> Self {
        Self::new(Lexer::new(source))
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn source(&self) -> &str {
        self.lexer.source()
    }

    fn register_prefix(&mut self, kind: TokenKind, func: PrefixParseFn) {
        self.prefix_parse_fns.insert(kind, func);
    }

    fn register_infix(&mut self, kind: TokenKind, func: InfixParseFn) {
        self.infix_parse_fns.insert(kind, func);
    }

    pub fn parse_program(&mut self) -> Program {
        let _span = trace_span!("parse_program").entered();
        let mut statements = Vec::new();

        while !self.cur_token_is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.next_token();
        }

        Program { statements }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.cur_token.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Stmt> {
        let _span = trace_span!("parse_let_statement").entered();
        let token = self.cur_token.clone();

        self.expect_peek(TokenKind::Identifier)?;
        let name = Identifier::new(self.cur_token.clone());

        self.expect_peek(TokenKind::Assign)?;
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }

        Some(Stmt::Let { token, name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Stmt> {
        let _span = trace_span!("parse_return_statement").entered();
        let token = self.cur_token.clone();

        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }

        Some(Stmt::Return { token, value })
    }

    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let _span = trace_span!("parse_expression_statement").entered();
        let token = self.cur_token.clone();
        let expr = self.parse_expression(Precedence::Lowest)?;

        // Semicolon is optional
        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }

        Some(Stmt::Expression { token, expr })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let _span = trace_span!(
            "parse_expression",
            ?precedence,
            token = %self.cur_token.literal
        )
        .entered();

        let Some(prefix) = self.prefix_parse_fns.get(&self.cur_token.kind).copied() else {
            self.no_prefix_parse_fn_error();
            return None;
        };
        let mut left = prefix(self)?;

        while !self.peek_token_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            let Some(infix) = self.infix_parse_fns.get(&self.peek_token.kind).copied() else {
                return Some(left);
            };
            self.next_token();
            left = infix(self, left)?;
        }

        Some(left)
    }

    fn parse_identifier(&mut self) -> Option<Expr> {
        Some(Expr::Identifier(Identifier::new(self.cur_token.clone())))
    }

    fn parse_integer_literal(&mut self) -> Option<Expr> {
        let token = self.cur_token.clone();
        match token.literal.parse::<i64>() {
            Ok(value) => Some(Expr::Integer { token, value }),
            Err(_) => {
                self.errors.push(ParseError::with_help(
                    token.span,
                    format!("could not parse {} as integer", token.literal),
                    format!("Integer literals must not exceed {}.", i64::MAX),
                ));
                None
            }
        }
    }

    fn parse_boolean(&mut self) -> Option<Expr> {
        Some(Expr::Boolean {
            token: self.cur_token.clone(),
            value: self.cur_token_is(TokenKind::True),
        })
    }

    fn parse_prefix_expression(&mut self) -> Option<Expr> {
        let _span = trace_span!("parse_prefix_expression").entered();
        let token = self.cur_token.clone();
        let operator = PrefixOp::from_token(token.kind)?;

        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;

        Some(Expr::Prefix {
            token,
            operator,
            right: Box::new(right),
        })
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        let _span = trace_span!("parse_infix_expression").entered();
        let token = self.cur_token.clone();
        let operator = InfixOp::from_token(token.kind)?;
        let precedence = self.cur_precedence();

        self.next_token();
        let right = self.parse_expression(precedence)?;

        Some(Expr::Infix {
            token,
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expr> {
        self.next_token();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;
        Some(expr)
    }

    fn parse_if_expression(&mut self) -> Option<Expr> {
        let _span = trace_span!("parse_if_expression").entered();
        let token = self.cur_token.clone();

        self.expect_peek_with_help(
            TokenKind::LeftParen,
            "If expressions require parentheses around the condition: if (condition) { ... }",
        )?;
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek_with_help(
            TokenKind::RightParen,
            "If conditions must be enclosed in parentheses: if (condition) { ... }",
        )?;
        self.expect_peek_with_help(
            TokenKind::LeftBrace,
            "The body of an if expression must be a block: if (condition) { ... }",
        )?;
        let consequence = self.parse_block_statement()?;

        let alternative = if self.peek_token_is(TokenKind::Else) {
            self.next_token();
            self.expect_peek_with_help(
                TokenKind::LeftBrace,
                "The else branch must be a block: if (condition) { ... } else { ... }",
            )?;
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        Some(Expr::If {
            token,
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_block_statement(&mut self) -> Option<BlockStatement> {
        let _span = trace_span!("parse_block_statement").entered();
        let token = self.cur_token.clone();
        let mut statements = Vec::new();

        self.next_token();

        while !self.cur_token_is(TokenKind::RightBrace) && !self.cur_token_is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.next_token();
        }

        if self.cur_token_is(TokenKind::Eof) {
            self.errors.push(ParseError::with_help(
                self.cur_token.span,
                format!(
                    "expected next token to be {}, got {} instead",
                    TokenKind::RightBrace,
                    TokenKind::Eof
                ),
                format!("The block opened at offset {} is never closed.", token.span.start),
            ));
            return None;
        }

        Some(BlockStatement { token, statements })
    }

    fn parse_function_literal(&mut self) -> Option<Expr> {
        let _span = trace_span!("parse_function_literal").entered();
        let token = self.cur_token.clone();

        self.expect_peek_with_help(
            TokenKind::LeftParen,
            "Function literals list their parameters in parentheses: fn(x, y) { ... }",
        )?;
        let parameters = self.parse_function_parameters()?;
        self.expect_peek_with_help(
            TokenKind::LeftBrace,
            "The body of a function literal must be a block: fn(x, y) { ... }",
        )?;
        let body = self.parse_block_statement()?;

        Some(Expr::Function {
            token,
            parameters: parameters.into(),
            body: Rc::new(body),
        })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut identifiers = Vec::new();

        if self.peek_token_is(TokenKind::RightParen) {
            self.next_token();
            return Some(identifiers);
        }

        self.expect_peek(TokenKind::Identifier)?;
        identifiers.push(Identifier::new(self.cur_token.clone()));

        while self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            self.expect_peek(TokenKind::Identifier)?;
            identifiers.push(Identifier::new(self.cur_token.clone()));
        }

        self.expect_peek(TokenKind::RightParen)?;
        Some(identifiers)
    }

    fn parse_call_expression(&mut self, function: Expr) -> Option<Expr> {
        let _span = trace_span!("parse_call_expression").entered();
        let token = self.cur_token.clone();
        let arguments = self.parse_call_arguments()?;

        Some(Expr::Call {
            token,
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_call_arguments(&mut self) -> Option<Vec<Expr>> {
        let mut args = Vec::new();

        if self.peek_token_is(TokenKind::RightParen) {
            self.next_token();
            return Some(args);
        }

        self.next_token();
        args.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            args.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek_with_help(
            TokenKind::RightParen,
            "Call arguments must be closed with ')'. Example: add(1, 2)",
        )?;
        Some(args)
    }

    fn next_token(&mut self) {
        let next = self.lexer.next_token();
        self.cur_token = std::mem::replace(&mut self.peek_token, next);
    }

    fn cur_token_is(&self, kind: TokenKind) -> bool {
        self.cur_token.kind == kind
    }

    fn peek_token_is(&self, kind: TokenKind) -> bool {
        self.peek_token.kind == kind
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.peek_token.kind)
    }

    fn cur_precedence(&self) -> Precedence {
        Precedence::of(self.cur_token.kind)
    }

    /// Advances only when the next token has the wanted kind; otherwise records
    /// an error and returns `None` so the caller can bail out with `?`.
    fn expect_peek(&mut self, kind: TokenKind) -> Option<()> {
        if self.peek_token_is(kind) {
            self.next_token();
            Some(())
        } else {
            self.peek_error(kind, None);
            None
        }
    }

    fn expect_peek_with_help(&mut self, kind: TokenKind, help: &str) -> Option<()> {
        if self.peek_token_is(kind) {
            self.next_token();
            Some(())
        } else {
            self.peek_error(kind, Some(help.to_string()));
            None
        }
    }

    fn peek_error(&mut self, kind: TokenKind, help: Option<String>) {
        let message = format!(
            "expected next token to be {}, got {} instead",
            kind, self.peek_token.kind
        );
        let span = self.peek_token.span;
        self.errors.push(match help {
            Some(help) => ParseError::with_help(span, message, help),
            None => ParseError::new(span, message),
        });
    }

    fn no_prefix_parse_fn_error(&mut self) {
        let token = &self.cur_token;
        let help = match token.kind {
            TokenKind::Eof => "The input ended where an expression was expected.".to_string(),
            _ => format!("'{}' cannot start an expression.", token.literal),
        };
        self.errors.push(ParseError::with_help(
            token.span,
            format!("no prefix parse function for {} found", token.kind),
            help,
        ));
    }
}
