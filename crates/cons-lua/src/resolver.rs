//! Flag resolution.
//!
//! Turns a host value into an integer flag:
//!
//! | Value | Single flag | Combination |
//! |-------|-------------|-------------|
//! | `nil` | 0 | 0 |
//! | integer | itself | itself |
//! | float | truncated | truncated |
//! | string | table lookup | table lookup |
//! | array | fails | bitwise OR of its elements |
//! | anything else | fails | fails |
//!
//! Array elements are read from index 1 upward and stop at the first `nil`,
//! so anything past a gap is ignored. Each element is resolved as a single
//! flag; one unresolvable element fails the whole combination.

use crate::args::type_name;
use cons_core::{ConsError, FlagTable};
use mlua::Value;
use std::sync::Arc;

/// Resolves flag names and combinations against a shared [`FlagTable`].
#[derive(Debug, Clone)]
pub struct FlagResolver {
    table: Arc<FlagTable>,
}

impl FlagResolver {
    #[must_use]
    pub fn new(table: Arc<FlagTable>) -> Self {
        Self { table }
    }

    /// The table names are looked up in.
    #[must_use]
    pub fn table(&self) -> &FlagTable {
        &self.table
    }

    /// Resolves a single flag. `None` means the value is not a flag.
    #[must_use]
    pub fn resolve_flag(&self, value: &Value) -> Option<i64> {
        match value {
            Value::Nil => Some(0),
            Value::Integer(i) => Some(*i),
            Value::Number(n) => Some(*n as i64),
            Value::String(s) => {
                let name = s.to_str().ok()?;
                let name: &str = &name;
                let resolved = self.table.get(name);
                if resolved.is_none() {
                    tracing::debug!(name, "Unknown flag name");
                }
                resolved
            }
            _ => None,
        }
    }

    /// Resolves a flag or an array of flags OR-ed together.
    #[must_use]
    pub fn resolve(&self, value: &Value) -> Option<i64> {
        let Value::Table(items) = value else {
            return self.resolve_flag(value);
        };

        let mut combined = 0i64;
        for index in 1.. {
            let item = match items.get::<Value>(index) {
                Ok(Value::Nil) => break,
                Ok(item) => item,
                Err(e) => {
                    tracing::debug!(index, error = %e, "Flag array element unreadable");
                    return None;
                }
            };
            match item {
                Value::Integer(_) | Value::Number(_) | Value::String(_) => {
                    combined |= self.resolve_flag(&item)?;
                }
                other => {
                    tracing::debug!(index, kind = type_name(&other), "Flag array element is not a flag");
                    return None;
                }
            }
        }
        Some(combined)
    }

    /// Looks up a symbolic name.
    ///
    /// # Errors
    ///
    /// [`ConsError::UnknownFlag`] if the table has no such name.
    pub fn lookup(&self, name: &str) -> Result<i64, ConsError> {
        self.table
            .get(name)
            .ok_or_else(|| ConsError::UnknownFlag(name.to_string()))
    }

    /// Strict single flag: failure is a fatal argument error.
    pub fn check_flag(&self, value: &Value, function: &str, position: usize) -> Result<i64, ConsError> {
        match value {
            Value::String(s) => self
                .lookup(&s.to_string_lossy())
                .map_err(|e| e.at(function, position)),
            other => self
                .resolve_flag(other)
                .ok_or_else(|| ConsError::bad_argument(function, position, "invalid flag")),
        }
    }

    /// Strict combination: failure is a fatal argument error.
    pub fn check_flags(&self, value: &Value, function: &str, position: usize) -> Result<i64, ConsError> {
        self.resolve(value)
            .ok_or_else(|| ConsError::bad_argument(function, position, "invalid flag combination"))
    }
}

impl Default for FlagResolver {
    fn default() -> Self {
        Self::new(Arc::new(FlagTable::standard()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Lua;

    fn resolver() -> FlagResolver {
        let table = FlagTable::from_entries([
            ("A".to_string(), 1),
            ("B".to_string(), 2),
            ("C".to_string(), 4),
        ]);
        FlagResolver::new(Arc::new(table))
    }

    fn eval(lua: &Lua, src: &str) -> Value {
        lua.load(src).eval::<Value>().expect("eval")
    }

    #[test]
    fn single_flag_kinds() {
        let lua = Lua::new();
        let r = resolver();
        assert_eq!(r.resolve_flag(&Value::Nil), Some(0));
        assert_eq!(r.resolve_flag(&Value::Integer(7)), Some(7));
        assert_eq!(r.resolve_flag(&Value::Number(2.9)), Some(2));
        assert_eq!(r.resolve_flag(&eval(&lua, "'B'")), Some(2));
        assert_eq!(r.resolve_flag(&eval(&lua, "'NOPE'")), None);
        assert_eq!(r.resolve_flag(&Value::Boolean(true)), None);
        assert_eq!(r.resolve_flag(&eval(&lua, "{'A'}")), None);
    }

    #[test]
    fn combination_ors_elements() {
        let lua = Lua::new();
        let r = resolver();
        assert_eq!(r.resolve(&eval(&lua, "{'A', 'C'}")), Some(5));
        assert_eq!(r.resolve(&eval(&lua, "{'A', 8, 'B'}")), Some(11));
        assert_eq!(r.resolve(&eval(&lua, "{}")), Some(0));
        assert_eq!(r.resolve(&eval(&lua, "'C'")), Some(4));
    }

    #[test]
    fn combination_with_unknown_fails() {
        let lua = Lua::new();
        let r = resolver();
        assert_eq!(r.resolve(&eval(&lua, "{'A', 'NOPE'}")), None);
        assert_eq!(r.resolve(&eval(&lua, "{'A', true}")), None);
        assert_eq!(r.resolve(&eval(&lua, "{'A', {'B'}}")), None);
    }

    #[test]
    fn combination_stops_at_gap() {
        let lua = Lua::new();
        let r = resolver();
        assert_eq!(r.resolve(&eval(&lua, "{'A', nil, 'NOPE'}")), Some(1));
        assert_eq!(r.resolve(&eval(&lua, "{[2] = 'B'}")), Some(0));
    }

    #[test]
    fn strict_variants_name_the_argument() {
        let lua = Lua::new();
        let r = resolver();
        let err = r.check_flag(&eval(&lua, "'NOPE'"), "GetStdHandle", 1).unwrap_err();
        assert_eq!(err.to_string(), "bad argument #1 to 'GetStdHandle' (invalid flag)");
        let err = r
            .check_flags(&eval(&lua, "{'A', 'NOPE'}"), "SetConsoleMode", 2)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "bad argument #2 to 'SetConsoleMode' (invalid flag combination)"
        );
        assert_eq!(r.check_flags(&eval(&lua, "{'A', 'B'}"), "SetConsoleMode", 2), Ok(3));
    }

    #[test]
    fn lookup_reports_unknown_name() {
        let r = resolver();
        assert_eq!(r.lookup("B"), Ok(2));
        assert_eq!(r.lookup("NOPE"), Err(ConsError::UnknownFlag("NOPE".into())));
        let lua = Lua::new();
        let err = r.check_flag(&eval(&lua, "'NOPE'"), "GenerateConsoleCtrlEvent", 1).unwrap_err();
        assert_eq!(err, ConsError::UnknownFlag("NOPE".into()).at("GenerateConsoleCtrlEvent", 1));
        let err = r.check_flag(&Value::Boolean(true), "GetStdHandle", 1).unwrap_err();
        assert_eq!(err.to_string(), "bad argument #1 to 'GetStdHandle' (invalid flag)");
    }

    #[test]
    fn standard_table_by_default() {
        let lua = Lua::new();
        let r = FlagResolver::default();
        assert_eq!(r.resolve_flag(&eval(&lua, "'STD_OUTPUT_HANDLE'")), Some(-11));
        assert_eq!(
            r.resolve(&eval(&lua, "{'FOREGROUND_RED', 'FOREGROUND_INTENSITY'}")),
            Some(0x4 | 0x8)
        );
    }
}
