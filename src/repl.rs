use crate::evaluator::Evaluator;
use crate::runner::{run_with, RunOutcome};
use std::io::{self, BufRead, Write};

const PROMPT: &str = ">> ";

/// Interactive loop. One evaluator lives for the whole session, so `let`
/// bindings carry over from one line to the next.
pub fn start() {
    println!("CloudLang Interpreter v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl+D to quit");
    println!();

    let evaluator = Evaluator::new();
    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        print!("{}", PROMPT);
        if let Err(error) = io::stdout().flush() {
            eprintln!("Error writing prompt: {}", error);
            break;
        }

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => {
                // EOF (Ctrl+D or piped input ended)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("exit") {
                    break;
                }

                run_repl_command(line, &evaluator);
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

fn run_repl_command(source: &str, evaluator: &Evaluator) {
    if let RunOutcome::Value(Some(value)) = run_with(evaluator, source, None) {
        println!("{}", value.inspect());
    }
}
