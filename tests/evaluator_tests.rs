use cloudlang::environment::Environment;
use cloudlang::evaluator::{evaluate, Evaluator};
use cloudlang::parser::Parser;
use cloudlang::runner::{run_with, RunOutcome};
use cloudlang::value::{native_bool, null, Object};
use cloudlang::{Expr, Stmt};
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn eval(input: &str) -> Option<Rc<Object>> {
    let mut parser = Parser::from_source(input);
    let program = parser.parse_program();
    assert!(
        parser.errors().is_empty(),
        "parse errors for {:?}: {:?}",
        input,
        parser.errors()
    );
    Evaluator::new().evaluate_program(&program)
}

fn eval_value(input: &str) -> Rc<Object> {
    eval(input).unwrap_or_else(|| panic!("{:?} produced no value", input))
}

fn assert_integer(input: &str, expected: i64) {
    match &*eval_value(input) {
        Object::Integer(value) => assert_eq!(*value, expected, "input: {}", input),
        other => panic!("{:?}: expected integer {}, got {:?}", input, expected, other),
    }
}

fn assert_boolean(input: &str, expected: bool) {
    let value = eval_value(input);
    assert!(
        Rc::ptr_eq(&value, &native_bool(expected)),
        "{:?}: expected shared {} object, got {:?}",
        input,
        expected,
        value
    );
}

fn assert_null(input: &str) {
    let value = eval_value(input);
    assert!(
        Rc::ptr_eq(&value, &null()),
        "{:?}: expected null, got {:?}",
        input,
        value
    );
}

fn assert_error(input: &str, expected: &str) {
    match &*eval_value(input) {
        Object::Error(message) => assert_eq!(message, expected, "input: {}", input),
        other => panic!("{:?}: expected error {:?}, got {:?}", input, expected, other),
    }
}

#[test]
fn integer_arithmetic() {
    let cases = [
        ("5", 5),
        ("10", 10),
        ("-5", -5),
        ("-10", -10),
        ("5 + 5 + 5 + 5 - 10", 10),
        ("2 * 2 * 2 * 2 * 2", 32),
        ("-50 + 100 + -50", 0),
        ("5 * 2 + 10", 20),
        ("5 + 2 * 10", 25),
        ("20 + 2 * -10", 0),
        ("50 / 2 * 2 + 10", 60),
        ("2 * (5 + 10)", 30),
        ("3 * 3 * 3 + 10", 37),
        ("3 * (3 * 3) + 10", 37),
        ("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50),
        ("7 / 2", 3),
        ("-7 / 2", -3),
    ];

    for (input, expected) in cases {
        assert_integer(input, expected);
    }
}

#[test]
fn boolean_expressions() {
    let cases = [
        ("true", true),
        ("false", false),
        ("1 < 2", true),
        ("1 > 2", false),
        ("1 < 1", false),
        ("1 > 1", false),
        ("1 <= 1", true),
        ("2 <= 1", false),
        ("1 >= 1", true),
        ("1 >= 2", false),
        ("1 == 1", true),
        ("1 != 1", false),
        ("1 == 2", false),
        ("1 != 2", true),
        ("true == true", true),
        ("false == false", true),
        ("true == false", false),
        ("true != false", true),
        ("false != true", true),
        ("(1 < 2) == true", true),
        ("(1 < 2) == false", false),
        ("(1 > 2) == true", false),
        ("(1 > 2) == false", true),
    ];

    for (input, expected) in cases {
        assert_boolean(input, expected);
    }
}

#[test]
fn bang_operator() {
    let cases = [
        ("!true", false),
        ("!false", true),
        ("!5", false),
        ("!!true", true),
        ("!!false", false),
        ("!!5", true),
        ("!0", false),
    ];

    for (input, expected) in cases {
        assert_boolean(input, expected);
    }
}

#[test]
fn if_else_expressions() {
    assert_integer("if (true) { 10 }", 10);
    assert_integer("if (1) { 10 }", 10);
    assert_integer("if (1 < 2) { 10 }", 10);
    assert_integer("if (1 > 2) { 10 } else { 20 }", 20);
    assert_integer("if (1 < 2) { 10 } else { 20 }", 10);
    assert_integer("if (0) { 10 } else { 20 }", 10);

    assert_null("if (false) { 10 }");
    assert_null("if (1 > 2) { 10 }");
    assert_null("if (true) { }");
    assert_null("if (true) { let x = 1; }");
}

#[test]
fn null_is_falsy_and_equal_to_itself() {
    assert_integer("if (if (false) { 1 }) { 10 } else { 20 }", 20);
    assert_boolean("if (false) { 1 } == if (false) { 2 }", true);
    assert_boolean("!if (false) { 1 }", true);
}

#[test]
fn return_statements() {
    let cases = [
        ("return 10;", 10),
        ("return 10; 9;", 10),
        ("return 2 * 5; 9;", 10),
        ("9; return 2 * 5; 9;", 10),
        (
            r#"
if (10 > 1) {
  if (10 > 1) {
    return 10;
  }

  return 1;
}
"#,
            10,
        ),
    ];

    for (input, expected) in cases {
        assert_integer(input, expected);
    }
}

#[test]
fn error_handling() {
    let cases = [
        ("5 + true;", "type mismatch: INTEGER + BOOL"),
        ("5 + true; 5;", "type mismatch: INTEGER + BOOL"),
        ("-true", "unknown operator: -BOOL"),
        ("true + false;", "unknown operator: BOOL + BOOL"),
        ("5; true + false; 5", "unknown operator: BOOL + BOOL"),
        ("if (10 > 1) { true + false; }", "unknown operator: BOOL + BOOL"),
        (
            r#"
if (10 > 1) {
  if (10 > 1) {
    return true + false;
  }

  return 1;
}
"#,
            "unknown operator: BOOL + BOOL",
        ),
        ("foobar", "identifier not found: foobar"),
        ("true < false", "unknown operator: BOOL < BOOL"),
        ("1 == true", "type mismatch: INTEGER == BOOL"),
        ("-fn(x) { x }", "unknown operator: -FUNCTION"),
    ];

    for (input, expected) in cases {
        assert_error(input, expected);
    }
}

#[test]
fn runtime_arithmetic_errors() {
    assert_error("10 / 0", "division by zero");
    assert_error("let x = 0; 1 + 10 / x", "division by zero");
    assert_error(
        "9223372036854775807 + 1",
        "integer overflow: 9223372036854775807 + 1",
    );
    assert_error(
        "-9223372036854775807 - 2",
        "integer overflow: -9223372036854775807 - 2",
    );
    assert_error(
        "4611686018427387904 * 2",
        "integer overflow: 4611686018427387904 * 2",
    );
    assert_error(
        "(-9223372036854775807 - 1) / -1",
        "integer overflow: -9223372036854775808 / -1",
    );
    assert_error(
        "-(-9223372036854775807 - 1)",
        "integer overflow: --9223372036854775808",
    );
}

#[test]
fn errors_stop_evaluation() {
    assert_error("let a = foo; a", "identifier not found: foo");
    assert_error(
        "let f = fn(x) { x }; f(missing, 1 + true)",
        "identifier not found: missing",
    );
    assert_error(
        "let f = fn(x) { x + true; 10 }; f(1)",
        "type mismatch: INTEGER + BOOL",
    );
}

#[test]
fn let_statements() {
    assert_integer("let a = 5; a;", 5);
    assert_integer("let a = 5 * 5; a;", 25);
    assert_integer("let a = 5; let b = a; b;", 5);
    assert_integer("let a = 5; let b = a; let c = a + b + 5; c;", 15);
    assert_integer("let a = 1; let a = a + 1; a", 2);
}

#[test]
fn program_ending_in_let_has_no_value() {
    assert!(eval("let a = 5;").is_none());
    assert!(eval("1; let a = 5;").is_none());
    assert!(eval("").is_none());
}

#[test]
fn function_object() {
    let value = eval_value("fn(x) { x + 2; };");
    match &*value {
        Object::Function(function) => {
            let names: Vec<&str> = function.parameters.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["x"]);
            assert_eq!(function.body.to_string(), "(x + 2)");
        }
        other => panic!("expected function, got {:?}", other),
    }
    assert_eq!(value.inspect(), "fn(x) {\n(x + 2)\n}");
}

#[test]
fn function_application() {
    let cases = [
        ("let identity = fn(x) { x; }; identity(5);", 5),
        ("let identity = fn(x) { return x; }; identity(5);", 5),
        ("let double = fn(x) { x * 2; }; double(5);", 10),
        ("let add = fn(x, y) { x + y; }; add(5, 5);", 10),
        ("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", 20),
        ("fn(x) { x; }(5)", 5),
        ("let f = fn() { return 1; 2 }; f() + 10", 11),
    ];

    for (input, expected) in cases {
        assert_integer(input, expected);
    }

    assert_null("let f = fn() { }; f()");
}

#[test]
fn closures() {
    assert_integer(
        r#"
let newAdder = fn(x) {
  fn(y) { x + y };
};

let addTwo = newAdder(2);
addTwo(2);
"#,
        4,
    );
}

#[test]
fn closures_see_later_bindings_in_their_scope() {
    assert_integer("let f = fn() { g }; let g = 3; f()", 3);
}

#[test]
fn parameters_shadow_outer_bindings() {
    assert_integer("let x = 10; let f = fn(x) { x * 2 }; f(3) + x", 16);
    assert_integer("let x = 10; let f = fn() { let x = 1; x }; f() + x", 11);
}

#[test]
fn recursion() {
    assert_integer(
        r#"
let fib = fn(n) {
  if (n < 2) { return n; }
  fib(n - 1) + fib(n - 2)
};
fib(15)
"#,
        610,
    );
}

#[test]
fn higher_order_functions() {
    assert_integer(
        r#"
let twice = fn(f, x) { f(f(x)) };
let inc = fn(x) { x + 1 };
twice(inc, 5)
"#,
        7,
    );
}

#[test]
fn call_errors() {
    assert_error(
        "let add = fn(a, b) { a + b }; add(1)",
        "wrong number of arguments: want=2, got=1",
    );
    assert_error(
        "fn() { 1 }(1, 2)",
        "wrong number of arguments: want=0, got=2",
    );
    assert_error("let x = 5; x(1)", "not a function: INTEGER");
    assert_error("true()", "not a function: BOOL");
}

#[test]
fn returned_value_used_as_operand_is_a_mismatch() {
    assert_error(
        "1 + if (true) { return 2; }",
        "type mismatch: INTEGER + RETURN",
    );
}

#[test]
fn bindings_persist_across_programs() {
    let evaluator = Evaluator::new();

    let first = Parser::from_source("let x = 40; let add = fn(a) { a + x };").parse_program();
    assert!(evaluator.evaluate_program(&first).is_none());

    let second = Parser::from_source("add(2)").parse_program();
    match evaluator.evaluate_program(&second).as_deref() {
        Some(Object::Integer(value)) => assert_eq!(*value, 42),
        other => panic!("expected 42, got {:?}", other),
    }

    assert!(evaluator.environment().borrow().contains_local("add"));
}

#[test]
fn evaluate_accepts_any_node() {
    let env = Environment::new();
    let program = Parser::from_source("let y = 2; y * 21").parse_program();
    assert!(evaluate(&program.statements[0], &env).is_none());

    let Stmt::Expression { expr, .. } = &program.statements[1] else {
        panic!("expected expression statement");
    };
    match evaluate(expr, &env).as_deref() {
        Some(Object::Integer(value)) => assert_eq!(*value, 42),
        other => panic!("expected 42, got {:?}", other),
    }

    match evaluate(&program, &env).as_deref() {
        Some(Object::Integer(value)) => assert_eq!(*value, 42),
        other => panic!("expected 42, got {:?}", other),
    }
}

#[test]
fn blocks_hand_back_the_raw_return() {
    let program = Parser::from_source("if (true) { return 7; 8 }").parse_program();
    let Stmt::Expression {
        expr: Expr::If { consequence, .. },
        ..
    } = &program.statements[0]
    else {
        panic!("expected if expression");
    };

    let env = Environment::new();
    let value = evaluate(consequence, &env).expect("block value");
    match &*value {
        Object::Return(inner) => assert!(matches!(**inner, Object::Integer(7))),
        other => panic!("expected wrapped return, got {:?}", other),
    }

    match evaluate(&program, &env).as_deref() {
        Some(Object::Integer(value)) => assert_eq!(*value, 7),
        other => panic!("expected unwrapped 7, got {:?}", other),
    }
}

#[test]
fn inspect_formats() {
    assert_eq!(eval_value("42").inspect(), "42");
    assert_eq!(eval_value("-42").inspect(), "-42");
    assert_eq!(eval_value("1 < 2").inspect(), "true");
    assert_eq!(eval_value("if (false) { 1 }").inspect(), "null");
    assert_eq!(
        eval_value("5 + true").inspect(),
        "Error: type mismatch: INTEGER + BOOL"
    );
    assert_eq!(eval_value("5 + true").type_name(), "ERROR");
    assert_eq!(eval_value("fn() { 1 }").type_name(), "FUNCTION");
}

#[test]
fn run_outcome_reflects_failures() {
    let evaluator = Evaluator::new();

    assert!(matches!(
        run_with(&evaluator, "let = 5;", None),
        RunOutcome::SyntaxErrors
    ));
    assert!(run_with(&evaluator, "let = 5;", None).is_failure());
    assert!(run_with(&evaluator, "1 + true", None).is_failure());
    assert!(!run_with(&evaluator, "let a = 1;", None).is_failure());
    assert!(!run_with(&evaluator, "a + 1", None).is_failure());
}

#[test]
fn evaluator_can_start_from_a_prepared_environment() {
    let env = Environment::new();
    env.borrow_mut().set("answer", Rc::new(Object::Integer(42)));

    let evaluator = Evaluator::with_environment(Rc::clone(&env));
    let program = Parser::from_source("answer / 2").parse_program();
    match evaluator.evaluate_program(&program).as_deref() {
        Some(Object::Integer(value)) => assert_eq!(*value, 21),
        other => panic!("expected 21, got {:?}", other),
    }
    assert!(Rc::ptr_eq(evaluator.environment(), &env));
}
