//! Shared table-marshalling helpers.
//!
//! Structures cross the boundary as flat tables whose keys are the native
//! field names with nested members appended (`dwSizeX`, `srWindowLeft`).
//! Reads are lenient: a missing or non-numeric field takes its default and a
//! fractional number is truncated toward zero.

use crate::args::{coerce_integer, truthy};
use cons_core::{Coord, ScreenBufferInfo, SmallRect};
use mlua::{Lua, Table, Value};

/// Integer field, `default` when absent or not a number.
pub(crate) fn get_opt_int(table: &Table, key: &str, default: i64) -> mlua::Result<i64> {
    match table.get::<Value>(key)? {
        Value::Number(n) if n.is_finite() => Ok(n.trunc() as i64),
        value => Ok(coerce_integer(&value).unwrap_or(default)),
    }
}

/// Boolean field: `default` when absent, Lua truthiness otherwise.
pub(crate) fn get_opt_bool(table: &Table, key: &str, default: bool) -> mlua::Result<bool> {
    match table.get::<Value>(key)? {
        Value::Nil => Ok(default),
        value => Ok(truthy(&value)),
    }
}

/// `{prefix}X` / `{prefix}Y`.
pub(crate) fn get_coord(table: &Table, prefix: &str) -> mlua::Result<Coord> {
    Ok(Coord::new(
        get_opt_int(table, &format!("{prefix}X"), 0)? as i16,
        get_opt_int(table, &format!("{prefix}Y"), 0)? as i16,
    ))
}

pub(crate) fn put_coord(table: &Table, prefix: &str, coord: Coord) -> mlua::Result<()> {
    table.set(format!("{prefix}X"), coord.x)?;
    table.set(format!("{prefix}Y"), coord.y)
}

/// `{prefix}Left` / `Top` / `Right` / `Bottom`.
pub(crate) fn get_rect(table: &Table, prefix: &str) -> mlua::Result<SmallRect> {
    Ok(SmallRect::new(
        get_opt_int(table, &format!("{prefix}Left"), 0)? as i16,
        get_opt_int(table, &format!("{prefix}Top"), 0)? as i16,
        get_opt_int(table, &format!("{prefix}Right"), 0)? as i16,
        get_opt_int(table, &format!("{prefix}Bottom"), 0)? as i16,
    ))
}

pub(crate) fn put_rect(table: &Table, prefix: &str, rect: SmallRect) -> mlua::Result<()> {
    table.set(format!("{prefix}Left"), rect.left)?;
    table.set(format!("{prefix}Top"), rect.top)?;
    table.set(format!("{prefix}Right"), rect.right)?;
    table.set(format!("{prefix}Bottom"), rect.bottom)
}

/// Region table returned by `WriteConsoleOutput`.
pub(crate) fn rect_table(lua: &Lua, prefix: &str, rect: SmallRect) -> mlua::Result<Table> {
    let table = lua.create_table_with_capacity(0, 4)?;
    put_rect(&table, prefix, rect)?;
    Ok(table)
}

pub(crate) fn screen_buffer_info_table(lua: &Lua, info: &ScreenBufferInfo) -> mlua::Result<Table> {
    let table = lua.create_table_with_capacity(0, 11)?;
    put_coord(&table, "dwSize", info.size)?;
    put_coord(&table, "dwCursorPosition", info.cursor_position)?;
    table.set("wAttributes", info.attributes)?;
    put_rect(&table, "srWindow", info.window)?;
    put_coord(&table, "dwMaximumWindowSize", info.maximum_window_size)?;
    Ok(table)
}
