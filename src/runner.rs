use crate::evaluator::Evaluator;
use crate::parser::Parser;
use crate::value::Object;
use std::rc::Rc;

/// Outcome of running one piece of source text.
#[derive(Debug)]
pub enum RunOutcome {
    /// The parser rejected the input; nothing was evaluated.
    SyntaxErrors,
    Value(Option<Rc<Object>>),
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        match self {
            RunOutcome::SyntaxErrors => true,
            RunOutcome::Value(Some(value)) => value.is_error(),
            RunOutcome::Value(None) => false,
        }
    }
}

/// Runs a whole script against a fresh top-level environment and prints its
/// final value.
pub fn run(source: &str, filename: Option<&str>) -> RunOutcome {
    let evaluator = Evaluator::new();
    let outcome = run_with(&evaluator, source, filename);

    if let RunOutcome::Value(Some(ref value)) = outcome {
        if value.is_error() {
            eprintln!("{}", value.inspect());
        } else {
            println!("{}", value.inspect());
        }
    }

    outcome
}

/// Parses `source` and, if it is free of syntax errors, evaluates it with
/// `evaluator`. Syntax errors are reported to stderr.
pub fn run_with(evaluator: &Evaluator, source: &str, filename: Option<&str>) -> RunOutcome {
    let mut parser = Parser::from_source(source);
    let program = parser.parse_program();

    if !parser.errors().is_empty() {
        for error in parser.errors() {
            if let Err(io_error) = error.report(source, filename) {
                tracing::warn!(%io_error, "failed to render diagnostic");
                eprintln!("{}", error);
            }
        }
        return RunOutcome::SyntaxErrors;
    }

    RunOutcome::Value(evaluator.evaluate_program(&program))
}
