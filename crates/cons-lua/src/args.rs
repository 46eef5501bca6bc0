//! Argument checks for host-facing functions.
//!
//! Each check names the function and the 1-based argument position so a
//! failure reads like a Lua argument error:
//! `bad argument #2 to 'ReadConsoleInput' (number expected, got string)`.
//! All failures are fatal input errors ([`ConsError::BadArgument`]).

use cons_core::{ConsError, Coord};
use mlua::{Table, Value};

/// Coerces a number or numeric string to an integer.
///
/// Floats convert only when they have an exact integer value.
pub(crate) fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Number(n) => float_to_integer(*n),
        Value::String(s) => {
            let s = s.to_str().ok()?;
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_integer))
        }
        _ => None,
    }
}

fn float_to_integer(n: f64) -> Option<i64> {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Lua truthiness: everything except `nil` and `false`.
pub(crate) fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Nil | Value::Boolean(false))
}

/// Required integer argument.
pub(crate) fn check_integer(value: &Value, function: &str, position: usize) -> Result<i64, ConsError> {
    coerce_integer(value).ok_or_else(|| {
        let reason = match value {
            Value::Number(_) => "number has no integer representation".to_string(),
            other => format!("number expected, got {}", type_name(other)),
        };
        ConsError::bad_argument(function, position, reason)
    })
}

/// Optional integer argument; `nil` yields `default`.
pub(crate) fn opt_integer(
    value: &Value,
    default: i64,
    function: &str,
    position: usize,
) -> Result<i64, ConsError> {
    match value {
        Value::Nil => Ok(default),
        other => check_integer(other, function, position),
    }
}

/// Required non-negative length argument, capped at `max`.
pub(crate) fn check_length(
    value: &Value,
    max: usize,
    function: &str,
    position: usize,
) -> Result<usize, ConsError> {
    let n = check_integer(value, function, position)?;
    usize::try_from(n)
        .ok()
        .filter(|n| *n <= max)
        .ok_or_else(|| ConsError::bad_argument(function, position, "invalid length"))
}

/// Required positive count, capped at `max`.
pub(crate) fn check_count(
    value: &Value,
    max: usize,
    reason: &str,
    function: &str,
    position: usize,
) -> Result<usize, ConsError> {
    let n = check_integer(value, function, position)?;
    usize::try_from(n)
        .ok()
        .filter(|n| (1..=max).contains(n))
        .ok_or_else(|| ConsError::bad_argument(function, position, reason))
}

/// Two required integer arguments forming a coordinate at `position`
/// and `position + 1`. Values truncate to 16 bits.
pub(crate) fn check_coord(x: &Value, y: &Value, function: &str, position: usize) -> Result<Coord, ConsError> {
    Ok(Coord::new(
        check_integer(x, function, position)? as i16,
        check_integer(y, function, position + 1)? as i16,
    ))
}

/// Required string argument as raw bytes. Numbers convert to their
/// decimal text, as `luaL_checklstring` does.
pub(crate) fn check_bytes(value: &Value, function: &str, position: usize) -> Result<Vec<u8>, ConsError> {
    match value {
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        Value::Integer(i) => Ok(i.to_string().into_bytes()),
        Value::Number(n) => Ok(n.to_string().into_bytes()),
        other => Err(ConsError::bad_argument(
            function,
            position,
            format!("string expected, got {}", type_name(other)),
        )),
    }
}

/// Required table argument.
pub(crate) fn check_table<'a>(
    value: &'a Value,
    function: &str,
    position: usize,
) -> Result<&'a Table, ConsError> {
    match value {
        Value::Table(t) => Ok(t),
        other => Err(ConsError::bad_argument(
            function,
            position,
            format!("table expected, got {}", type_name(other)),
        )),
    }
}

/// Lua-facing type name (`no value` is reported as `nil`).
pub(crate) fn type_name(value: &Value) -> &'static str {
    value.type_name()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Lua;

    #[test]
    fn coerce_integer_accepts_numeric_forms() {
        let lua = Lua::new();
        assert_eq!(coerce_integer(&Value::Integer(7)), Some(7));
        assert_eq!(coerce_integer(&Value::Number(3.0)), Some(3));
        assert_eq!(coerce_integer(&Value::Number(3.5)), None);
        let s = Value::String(lua.create_string(" 42 ").unwrap());
        assert_eq!(coerce_integer(&s), Some(42));
        let s = Value::String(lua.create_string("KEY_EVENT").unwrap());
        assert_eq!(coerce_integer(&s), None);
        assert_eq!(coerce_integer(&Value::Boolean(true)), None);
    }

    #[test]
    fn check_integer_reports_position() {
        let err = check_integer(&Value::Boolean(true), "SetConsoleCP", 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "bad argument #1 to 'SetConsoleCP' (number expected, got boolean)"
        );
        let err = check_integer(&Value::Number(0.5), "SetConsoleCP", 1).unwrap_err();
        assert!(err.to_string().contains("no integer representation"));
    }

    #[test]
    fn opt_integer_defaults_on_nil() {
        assert_eq!(opt_integer(&Value::Nil, 512, "f", 1).unwrap(), 512);
        assert_eq!(opt_integer(&Value::Integer(9), 512, "f", 1).unwrap(), 9);
        assert!(opt_integer(&Value::Boolean(false), 512, "f", 1).is_err());
    }

    #[test]
    fn check_count_rejects_non_positive() {
        for bad in [0, -1] {
            let err = check_count(&Value::Integer(bad), 100, "invalid number of records", "ReadConsoleInput", 2)
                .unwrap_err();
            assert!(err.to_string().contains("invalid number of records"));
        }
        assert!(check_count(&Value::Integer(101), 100, "too many", "f", 2).is_err());
        assert_eq!(check_count(&Value::Integer(3), 100, "x", "f", 2).unwrap(), 3);
    }

    #[test]
    fn check_length_allows_zero() {
        assert_eq!(check_length(&Value::Integer(0), 10, "f", 2).unwrap(), 0);
        assert!(check_length(&Value::Integer(-1), 10, "f", 2).is_err());
    }

    #[test]
    fn check_coord_positions() {
        let c = check_coord(&Value::Integer(3), &Value::Integer(4), "f", 3).unwrap();
        assert_eq!(c, Coord::new(3, 4));
        let err = check_coord(&Value::Integer(3), &Value::Nil, "SetConsoleCursorPosition", 2).unwrap_err();
        assert!(err.to_string().starts_with("bad argument #3 to 'SetConsoleCursorPosition'"));
    }

    #[test]
    fn check_bytes_converts_numbers() {
        let lua = Lua::new();
        let s = Value::String(lua.create_string(b"a\0b").unwrap());
        assert_eq!(check_bytes(&s, "f", 1).unwrap(), b"a\0b");
        assert_eq!(check_bytes(&Value::Integer(12), "f", 1).unwrap(), b"12");
        assert!(check_bytes(&Value::Nil, "f", 1).is_err());
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(&Value::Nil));
        assert!(!truthy(&Value::Boolean(false)));
        assert!(truthy(&Value::Integer(0)));
        assert!(truthy(&Value::Boolean(true)));
    }
}
