//! AST nodes keep the token they were parsed from, which gives every node a
//! source span and its literal text. `Display` produces the canonical,
//! fully parenthesised rendering of a node.

use crate::error::Span;
use crate::lexer::{Token, TokenKind};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn token_literal(&self) -> &str {
        self.statements
            .first()
            .map(|stmt| stmt.token().literal.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        token: Token,
        name: Identifier,
        value: Expr,
    },
    Return {
        token: Token,
        value: Expr,
    },
    Expression {
        token: Token,
        expr: Expr,
    },
}

impl Stmt {
    pub fn token(&self) -> &Token {
        match self {
            Stmt::Let { token, .. } => token,
            Stmt::Return { token, .. } => token,
            Stmt::Expression { token, .. } => token,
        }
    }

    pub fn span(&self) -> Span {
        self.token().span
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub token: Token,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub token: Token,
    pub name: String,
}

impl Identifier {
    pub fn new(token: Token) -> Self {
        let name = token.literal.clone();
        Self { token, name }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(Identifier),
    Integer {
        token: Token,
        value: i64,
    },
    Boolean {
        token: Token,
        value: bool,
    },
    Prefix {
        token: Token,
        operator: PrefixOp,
        right: Box<Expr>,
    },
    Infix {
        token: Token,
        left: Box<Expr>,
        operator: InfixOp,
        right: Box<Expr>,
    },
    If {
        token: Token,
        condition: Box<Expr>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    /// Parameters and body sit behind `Rc` so function objects created at
    /// runtime can point at them after the program tree is gone.
    Function {
        token: Token,
        parameters: Rc<[Identifier]>,
        body: Rc<BlockStatement>,
    },
    Call {
        token: Token,
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
}

impl Expr {
    pub fn token(&self) -> &Token {
        match self {
            Expr::Identifier(ident) => &ident.token,
            Expr::Integer { token, .. } => token,
            Expr::Boolean { token, .. } => token,
            Expr::Prefix { token, .. } => token,
            Expr::Infix { token, .. } => token,
            Expr::If { token, .. } => token,
            Expr::Function { token, .. } => token,
            Expr::Call { token, .. } => token,
        }
    }

    pub fn span(&self) -> Span {
        self.token().span
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Not,
    Negate,
}

impl PrefixOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Bang => Some(PrefixOp::Not),
            TokenKind::Minus => Some(PrefixOp::Negate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl InfixOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(InfixOp::Add),
            TokenKind::Minus => Some(InfixOp::Subtract),
            TokenKind::Asterisk => Some(InfixOp::Multiply),
            TokenKind::Slash => Some(InfixOp::Divide),
            TokenKind::Less => Some(InfixOp::Less),
            TokenKind::Greater => Some(InfixOp::Greater),
            TokenKind::LessEqual => Some(InfixOp::LessEqual),
            TokenKind::GreaterEqual => Some(InfixOp::GreaterEqual),
            TokenKind::Equal => Some(InfixOp::Equal),
            TokenKind::NotEqual => Some(InfixOp::NotEqual),
            _ => None,
        }
    }
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrefixOp::Not => write!(f, "!"),
            PrefixOp::Negate => write!(f, "-"),
        }
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            InfixOp::Add => "+",
            InfixOp::Subtract => "-",
            InfixOp::Multiply => "*",
            InfixOp::Divide => "/",
            InfixOp::Less => "<",
            InfixOp::Greater => ">",
            InfixOp::LessEqual => "<=",
            InfixOp::GreaterEqual => ">=",
            InfixOp::Equal => "==",
            InfixOp::NotEqual => "!=",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stmt::Let { token, name, value } => {
                write!(f, "{} {} = {};", token.literal, name, value)
            }
            Stmt::Return { token, value } => write!(f, "{} {};", token.literal, value),
            Stmt::Expression { expr, .. } => write!(f, "{}", expr),
        }
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Identifier(ident) => write!(f, "{}", ident),
            Expr::Integer { token, .. } => write!(f, "{}", token.literal),
            Expr::Boolean { token, .. } => write!(f, "{}", token.literal),
            Expr::Prefix {
                operator, right, ..
            } => write!(f, "({}{})", operator, right),
            Expr::Infix {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator, right),
            Expr::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                write!(f, "if ({}) {{ {} }}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {{ {} }}", alternative)?;
                }
                Ok(())
            }
            Expr::Function {
                token,
                parameters,
                body,
            } => {
                write!(
                    f,
                    "{}({}) {{ {} }}",
                    token.literal,
                    join(parameters.iter()),
                    body
                )
            }
            Expr::Call {
                function,
                arguments,
                ..
            } => write!(f, "{}({})", function, join(arguments.iter())),
        }
    }
}

pub(crate) fn join<T: fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
