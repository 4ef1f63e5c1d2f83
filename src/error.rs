use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }
}

/// A syntax error recorded by the parser. Parsing keeps going after one is
/// recorded, so a program usually comes back with a list of these.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl ParseError {
    pub fn new(span: Span, message: String) -> Self {
        Self {
            span,
            message,
            help: None,
        }
    }

    pub fn with_help(span: Span, message: String, help: String) -> Self {
        Self {
            span,
            message,
            help: Some(help),
        }
    }

    pub fn report(&self, source: &str, filename: Option<&str>) -> std::io::Result<()> {
        let filename = filename.unwrap_or("<repl>");
        let color = Color::Yellow;

        let mut report_builder = Report::build(ReportKind::Error, filename, self.span.start)
            .with_message(format!("{}: {}", "Parse Error".fg(color), self.message))
            .with_label(
                Label::new((filename, self.span.start..self.span.end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        report_builder
            .finish()
            .eprint((filename, Source::from(source)))
    }
}

/// Failures raised while walking the tree. The `Display` text is the message
/// carried by the `Error` object the caller finally sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("identifier not found: {0}")]
    IdentifierNotFound(String),

    #[error("type mismatch: {left} {operator} {right}")]
    TypeMismatch {
        left: &'static str,
        operator: String,
        right: &'static str,
    },

    #[error("unknown operator: {operator}{operand}")]
    UnknownPrefixOperator {
        operator: String,
        operand: &'static str,
    },

    #[error("unknown operator: {left} {operator} {right}")]
    UnknownInfixOperator {
        left: &'static str,
        operator: String,
        right: &'static str,
    },

    #[error("not a function: {0}")]
    NotAFunction(&'static str),

    #[error("wrong number of arguments: want={want}, got={got}")]
    WrongArgumentCount { want: usize, got: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow: {0}")]
    IntegerOverflow(String),
}
