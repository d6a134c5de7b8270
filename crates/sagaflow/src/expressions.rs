use serde::{Deserialize, Serialize};

use crate::{environment::Environment, path::VariablePath, value::Value};

/// Expressions evaluated against the variable environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Value),
    /// Value at a variable path; `Void` when unbound.
    Path(VariablePath),
    /// String concatenation of the rendered operands.
    Concat(Vec<Expr>),
}

impl Expr {
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn eval(&self, env: &Environment) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Path(path) => env.value(path),
            Self::Concat(parts) => {
                let mut out = String::new();
                for part in parts {
                    out.push_str(&part.eval(env).to_string());
                }
                Value::Str(out)
            }
        }
    }
}

impl From<VariablePath> for Expr {
    fn from(path: VariablePath) -> Self {
        Self::Path(path)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_renders_paths_and_literals() {
        let mut env = Environment::new();
        let name: VariablePath = "user.name".parse().unwrap();
        env.write(&name, Value::from("ada")).unwrap();
        let expr = Expr::Concat(vec![Expr::literal("hello "), Expr::Path(name), Expr::literal(1_i64)]);
        assert_eq!(expr.eval(&env), Value::from("hello ada1"));
    }

    #[test]
    fn concat_renders_unbound_operands_as_empty() {
        let env = Environment::new();
        let expr = Expr::Concat(vec![Expr::Path(VariablePath::root("missing")), Expr::literal("x")]);
        assert_eq!(expr.eval(&env), Value::from("x"));
    }

    #[test]
    fn unbound_path_is_void() {
        let env = Environment::new();
        assert_eq!(Expr::Path(VariablePath::root("nope")).eval(&env), Value::Void);
    }
}
