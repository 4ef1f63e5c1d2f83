use crate::ast::{join, BlockStatement, Identifier};
use crate::environment::Env;
use std::fmt;
use std::rc::Rc;

pub const INTEGER: &str = "INTEGER";
pub const BOOL: &str = "BOOL";
pub const NULL: &str = "NULL";
pub const FUNCTION: &str = "FUNCTION";
pub const RETURN: &str = "RETURN";
pub const ERROR: &str = "ERROR";

/// Runtime values. `Return` and `Error` are signals used while walking the
/// tree; only `Error` ever escapes to the caller, as the result of a failed
/// program.
#[derive(Debug)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Null,
    Function(Function),
    Return(Rc<Object>),
    Error(String),
}

pub struct Function {
    pub parameters: Rc<[Identifier]>,
    pub body: Rc<BlockStatement>,
    pub env: Env,
}

// The captured environment can hold this very function, so it is left out.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Function")
            .field("parameters", &self.parameters)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

thread_local! {
    static TRUE: Rc<Object> = Rc::new(Object::Boolean(true));
    static FALSE: Rc<Object> = Rc::new(Object::Boolean(false));
    static NULL_OBJECT: Rc<Object> = Rc::new(Object::Null);
}

/// The shared `true`/`false` object. Booleans are never allocated anywhere
/// else, so two booleans are equal exactly when they are the same `Rc`.
pub fn native_bool(value: bool) -> Rc<Object> {
    if value {
        TRUE.with(Rc::clone)
    } else {
        FALSE.with(Rc::clone)
    }
}

pub fn null() -> Rc<Object> {
    NULL_OBJECT.with(Rc::clone)
}

impl Object {
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Null | Object::Boolean(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Integer(_) => INTEGER,
            Object::Boolean(_) => BOOL,
            Object::Null => NULL,
            Object::Function(_) => FUNCTION,
            Object::Return(_) => RETURN,
            Object::Error(_) => ERROR,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Object::Error(_))
    }

    pub fn inspect(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Object::Integer(n) => write!(f, "{}", n),
            Object::Boolean(b) => write!(f, "{}", b),
            Object::Null => write!(f, "null"),
            Object::Function(function) => write!(
                f,
                "fn({}) {{\n{}\n}}",
                join(function.parameters.iter()),
                function.body
            ),
            Object::Return(value) => write!(f, "{}", value),
            Object::Error(message) => write!(f, "Error: {}", message),
        }
    }
}
