use crate::ast::{BlockStatement, Expr, InfixOp, PrefixOp, Program, Stmt};
use crate::environment::{Env, Environment};
use crate::error::EvalError;
use crate::value::{native_bool, null, Function, Object};
use std::rc::Rc;
use tracing::{debug, trace};

pub type EvalResult = Result<Rc<Object>, EvalError>;

/// Borrowed view of any AST node that can be handed to [`evaluate`].
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Program(&'a Program),
    Statement(&'a Stmt),
    Block(&'a BlockStatement),
    Expression(&'a Expr),
}

impl<'a> From<&'a Program> for Node<'a> {
    fn from(program: &'a Program) -> Self {
        Node::Program(program)
    }
}

impl<'a> From<&'a Stmt> for Node<'a> {
    fn from(stmt: &'a Stmt) -> Self {
        Node::Statement(stmt)
    }
}

impl<'a> From<&'a BlockStatement> for Node<'a> {
    fn from(block: &'a BlockStatement) -> Self {
        Node::Block(block)
    }
}

impl<'a> From<&'a Expr> for Node<'a> {
    fn from(expr: &'a Expr) -> Self {
        Node::Expression(expr)
    }
}

/// Evaluates any node against `env`.
///
/// Failures come back as an `Object::Error`. `None` means the node produced
/// no value at all, e.g. a program whose last statement is a `let`. A program
/// unwraps `return`; a block or a return statement hands back the raw
/// `Object::Return`.
pub fn evaluate<'a>(node: impl Into<Node<'a>>, env: &Env) -> Option<Rc<Object>> {
    let result = match node.into() {
        Node::Program(program) => return eval_program(program, env),
        Node::Statement(stmt) => eval_statement(stmt, env),
        Node::Block(block) => eval_block(block, env).map(Some),
        Node::Expression(expr) => eval_expression(expr, env).map(Some),
    };

    result.unwrap_or_else(|error| Some(error_object(error)))
}

/// Holds the top-level environment so bindings survive across programs,
/// which is what the REPL relies on.
pub struct Evaluator {
    environment: Env,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_environment(Environment::new())
    }

    pub fn with_environment(environment: Env) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> &Env {
        &self.environment
    }

    pub fn evaluate_program(&self, program: &Program) -> Option<Rc<Object>> {
        eval_program(program, &self.environment)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn eval_program(program: &Program, env: &Env) -> Option<Rc<Object>> {
    let mut result = None;

    for stmt in &program.statements {
        match eval_statement(stmt, env) {
            Ok(Some(value)) => {
                if let Object::Return(inner) = &*value {
                    return Some(Rc::clone(inner));
                }
                result = Some(value);
            }
            Ok(None) => result = None,
            Err(error) => return Some(error_object(error)),
        }
    }

    result
}

/// Runs the statements of a block in `env`. A `return` stops the block and is
/// passed up still wrapped; only a function call unwraps it.
pub fn eval_block(block: &BlockStatement, env: &Env) -> EvalResult {
    let mut result = None;

    for stmt in &block.statements {
        let value = eval_statement(stmt, env)?;
        if let Some(ref value) = value {
            if matches!(**value, Object::Return(_)) {
                return Ok(Rc::clone(value));
            }
        }
        result = value;
    }

    Ok(result.unwrap_or_else(null))
}

pub fn eval_statement(stmt: &Stmt, env: &Env) -> Result<Option<Rc<Object>>, EvalError> {
    trace!(statement = %stmt, "evaluating statement");

    match stmt {
        Stmt::Let { name, value, .. } => {
            let value = eval_expression(value, env)?;
            env.borrow_mut().set(name.name.clone(), value);
            Ok(None)
        }
        Stmt::Return { value, .. } => {
            let value = eval_expression(value, env)?;
            Ok(Some(Rc::new(Object::Return(value))))
        }
        Stmt::Expression { expr, .. } => eval_expression(expr, env).map(Some),
    }
}

pub fn eval_expression(expr: &Expr, env: &Env) -> EvalResult {
    match expr {
        Expr::Integer { value, .. } => Ok(Rc::new(Object::Integer(*value))),
        Expr::Boolean { value, .. } => Ok(native_bool(*value)),
        Expr::Identifier(ident) => env
            .borrow()
            .get(&ident.name)
            .ok_or_else(|| EvalError::IdentifierNotFound(ident.name.clone())),
        Expr::Prefix {
            operator, right, ..
        } => {
            let right = eval_expression(right, env)?;
            eval_prefix_expression(*operator, &right)
        }
        Expr::Infix {
            left,
            operator,
            right,
            ..
        } => {
            let left = eval_expression(left, env)?;
            let right = eval_expression(right, env)?;
            eval_infix_expression(*operator, &left, &right)
        }
        Expr::If {
            condition,
            consequence,
            alternative,
            ..
        } => {
            let condition = eval_expression(condition, env)?;
            if condition.is_truthy() {
                eval_block(consequence, env)
            } else if let Some(alternative) = alternative {
                eval_block(alternative, env)
            } else {
                Ok(null())
            }
        }
        Expr::Function {
            parameters, body, ..
        } => Ok(Rc::new(Object::Function(Function {
            parameters: Rc::clone(parameters),
            body: Rc::clone(body),
            env: Rc::clone(env),
        }))),
        Expr::Call {
            function,
            arguments,
            ..
        } => {
            let function = eval_expression(function, env)?;
            let args = eval_expressions(arguments, env)?;
            apply_function(&function, args)
        }
    }
}

// Left to right; the first error wins and the remaining arguments are skipped.
fn eval_expressions(exprs: &[Expr], env: &Env) -> Result<Vec<Rc<Object>>, EvalError> {
    exprs.iter().map(|expr| eval_expression(expr, env)).collect()
}

fn apply_function(callee: &Rc<Object>, args: Vec<Rc<Object>>) -> EvalResult {
    let Object::Function(function) = &**callee else {
        return Err(EvalError::NotAFunction(callee.type_name()));
    };

    if function.parameters.len() != args.len() {
        return Err(EvalError::WrongArgumentCount {
            want: function.parameters.len(),
            got: args.len(),
        });
    }

    debug!(arity = args.len(), "applying function");

    // The new scope hangs off the environment captured at definition time,
    // not off the caller's.
    let scope = Environment::new_enclosed(Rc::clone(&function.env));
    {
        let mut scope = scope.borrow_mut();
        for (param, arg) in function.parameters.iter().zip(args) {
            scope.set(param.name.clone(), arg);
        }
    }

    let evaluated = eval_block(&function.body, &scope)?;
    Ok(unwrap_return_value(evaluated))
}

fn unwrap_return_value(value: Rc<Object>) -> Rc<Object> {
    match &*value {
        Object::Return(inner) => Rc::clone(inner),
        _ => value,
    }
}

fn eval_prefix_expression(operator: PrefixOp, right: &Rc<Object>) -> EvalResult {
    match operator {
        PrefixOp::Not => Ok(native_bool(!right.is_truthy())),
        PrefixOp::Negate => match **right {
            Object::Integer(value) => value
                .checked_neg()
                .map(|negated| Rc::new(Object::Integer(negated)))
                .ok_or_else(|| EvalError::IntegerOverflow(format!("-{}", value))),
            _ => Err(EvalError::UnknownPrefixOperator {
                operator: operator.to_string(),
                operand: right.type_name(),
            }),
        },
    }
}

fn eval_infix_expression(operator: InfixOp, left: &Rc<Object>, right: &Rc<Object>) -> EvalResult {
    if left.type_name() != right.type_name() {
        return Err(EvalError::TypeMismatch {
            left: left.type_name(),
            operator: operator.to_string(),
            right: right.type_name(),
        });
    }

    if let (Object::Integer(l), Object::Integer(r)) = (&**left, &**right) {
        return eval_integer_infix_expression(operator, *l, *r);
    }

    // Booleans and null are shared singletons, so identity is equality.
    match operator {
        InfixOp::Equal => Ok(native_bool(Rc::ptr_eq(left, right))),
        InfixOp::NotEqual => Ok(native_bool(!Rc::ptr_eq(left, right))),
        _ => Err(EvalError::UnknownInfixOperator {
            left: left.type_name(),
            operator: operator.to_string(),
            right: right.type_name(),
        }),
    }
}

fn eval_integer_infix_expression(operator: InfixOp, left: i64, right: i64) -> EvalResult {
    let overflow = || EvalError::IntegerOverflow(format!("{} {} {}", left, operator, right));

    let value = match operator {
        InfixOp::Add => left.checked_add(right).ok_or_else(overflow)?,
        InfixOp::Subtract => left.checked_sub(right).ok_or_else(overflow)?,
        InfixOp::Multiply => left.checked_mul(right).ok_or_else(overflow)?,
        InfixOp::Divide => {
            if right == 0 {
                return Err(EvalError::DivisionByZero);
            }
            left.checked_div(right).ok_or_else(overflow)?
        }
        InfixOp::Less => return Ok(native_bool(left < right)),
        InfixOp::Greater => return Ok(native_bool(left > right)),
        InfixOp::LessEqual => return Ok(native_bool(left <= right)),
        InfixOp::GreaterEqual => return Ok(native_bool(left >= right)),
        InfixOp::Equal => return Ok(native_bool(left == right)),
        InfixOp::NotEqual => return Ok(native_bool(left != right)),
    };

    Ok(Rc::new(Object::Integer(value)))
}

fn error_object(error: EvalError) -> Rc<Object> {
    Rc::new(Object::Error(error.to_string()))
}
