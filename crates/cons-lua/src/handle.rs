//! Console handle userdata.
//!
//! Every handle method takes the handle as argument #1 and checks it is
//! still open before reading any other argument. `close` is the exception:
//! it is idempotent and accepts closed handles.

use crate::args::{
    check_bytes, check_coord, check_count, check_integer, check_length, check_table, coerce_integer,
    truthy,
};
use crate::binding::{soft, ConsoleBinding};
use crate::table::{get_coord, get_rect, put_rect, rect_table, screen_buffer_info_table};
use cons_core::{CharInfo, ConsError, ConsoleChar, ConsoleHandle, CursorInfo, InputRecord, RawHandle, SmallRect};
use mlua::{
    ExternalResult, IntoLuaMulti, Lua, MetaMethod, MultiValue, Table, UserData, UserDataMethods, Value,
};
use std::sync::Arc;

/// Largest record count accepted by `ReadConsoleInput`/`PeekConsoleInput`.
pub const MAX_INPUT_RECORDS: usize = 1 << 16;
/// Largest length accepted by the character/attribute readers.
pub const MAX_READ_LENGTH: usize = 1 << 20;
/// Largest cell count accepted by `ReadConsoleOutput`.
pub const MAX_OUTPUT_CELLS: usize = 1 << 22;

/// A [`ConsoleHandle`] exposed to Lua.
pub struct LuaConsoleHandle {
    handle: ConsoleHandle,
    binding: Arc<ConsoleBinding>,
}

impl LuaConsoleHandle {
    pub(crate) fn borrowed(binding: Arc<ConsoleBinding>, raw: RawHandle) -> Self {
        Self {
            handle: ConsoleHandle::borrowed(binding.api.clone(), raw),
            binding,
        }
    }

    pub(crate) fn owned(binding: Arc<ConsoleBinding>, raw: RawHandle) -> Self {
        Self {
            handle: ConsoleHandle::owned(binding.api.clone(), raw),
            binding,
        }
    }

    #[must_use]
    pub fn handle(&self) -> &ConsoleHandle {
        &self.handle
    }

    fn live(&self, function: &str) -> mlua::Result<RawHandle> {
        self.handle.validate().map_err(|e| e.at(function, 1)).into_lua_err()
    }

    fn flags(&self, value: &Value, function: &str, position: usize) -> mlua::Result<i64> {
        self.binding
            .resolver
            .check_flags(value, function, position)
            .into_lua_err()
    }

    fn read_input(&self, lua: &Lua, count: &Value, function: &'static str, peek: bool) -> mlua::Result<Option<Table>> {
        let h = self.live(function)?;
        let n = check_count(count, MAX_INPUT_RECORDS, "invalid number of records", function, 2).into_lua_err()?;
        let mut buffer = vec![InputRecord::default(); n];
        let api = &self.binding.api;
        let result = if peek {
            api.peek_console_input(h, &mut buffer)
        } else {
            api.read_console_input(h, &mut buffer)
        };
        soft(function, result)
            .map(|read| self.binding.codec.encode_batch(lua, &buffer[..read]))
            .transpose()
    }

    fn write_output(&self, lua: &Lua, chars: &Value, attrs: &Value, params: &Value) -> mlua::Result<Option<Table>> {
        const F: &str = "WriteConsoleOutput";
        let h = self.live(F)?;
        let chars = check_table(chars, F, 2).into_lua_err()?;
        let len = chars.raw_len();
        if len == 0 {
            return Err(ConsError::bad_argument(F, 2, "empty array")).into_lua_err();
        }
        let attrs = check_table(attrs, F, 3).into_lua_err()?;
        if attrs.raw_len() != len {
            return Err(ConsError::bad_argument(
                F,
                3,
                "different sizes of character and attribute arrays",
            ))
            .into_lua_err();
        }
        let params = check_table(params, F, 4).into_lua_err()?;
        let size = get_coord(params, "dwBufferSize")?;
        if i64::from(size.x) * i64::from(size.y) > len as i64 {
            return Err(ConsError::bad_argument(
                F,
                4,
                "SizeX*SizeY is greater than character array size",
            ))
            .into_lua_err();
        }
        let coord = get_coord(params, "dwBufferCoord")?;
        let mut region = get_rect(params, "WriteRegion")?;

        let mut cells = Vec::with_capacity(len);
        for i in 1..=len {
            let ch = match chars.raw_get::<Value>(i)? {
                v @ (Value::String(_) | Value::Integer(_) | Value::Number(_)) => {
                    check_bytes(&v, F, 2).into_lua_err()?.first().copied().unwrap_or(0)
                }
                _ => return Err(ConsError::bad_argument(F, 2, "non-string in the array")).into_lua_err(),
            };
            let Some(attr) = coerce_integer(&attrs.raw_get::<Value>(i)?) else {
                return Err(ConsError::bad_argument(F, 3, "non-number in the array")).into_lua_err();
            };
            cells.push(CharInfo::new(ConsoleChar::Narrow(ch), attr as u16));
        }

        soft(F, self.binding.api.write_console_output(h, &cells, size, coord, &mut region))
            .map(|()| rect_table(lua, "WriteRegion", region))
            .transpose()
    }

    fn read_output(&self, lua: &Lua, params: &Value) -> mlua::Result<Option<Table>> {
        const F: &str = "ReadConsoleOutput";
        let h = self.live(F)?;
        let params = check_table(params, F, 2).into_lua_err()?;
        let size = get_coord(params, "dwBufferSize")?;
        let cell_count = usize::try_from(size.x).unwrap_or(0) * usize::try_from(size.y).unwrap_or(0);
        if cell_count == 0 || cell_count > MAX_OUTPUT_CELLS {
            return Err(ConsError::bad_argument(F, 2, "invalid buffer size")).into_lua_err();
        }
        let coord = get_coord(params, "dwBufferCoord")?;
        let mut region = get_rect(params, "ReadRegion")?;
        let mut cells = vec![CharInfo::default(); cell_count];

        let Some(()) = soft(F, self.binding.api.read_console_output(h, &mut cells, size, coord, &mut region)) else {
            return Ok(None);
        };
        let chars = lua.create_table_with_capacity(cell_count, 0)?;
        let attributes = lua.create_table_with_capacity(cell_count, 0)?;
        for (i, cell) in cells.iter().enumerate() {
            chars.raw_set(i + 1, lua.create_string([cell.ch.as_byte()])?)?;
            attributes.raw_set(i + 1, cell.attributes)?;
        }
        let result = lua.create_table_with_capacity(0, 6)?;
        result.set("Chars", chars)?;
        result.set("Attributes", attributes)?;
        put_rect(&result, "ReadRegion", region)?;
        Ok(Some(result))
    }

    fn write_attributes(&self, attrs: &Value, x: &Value, y: &Value) -> mlua::Result<Option<u32>> {
        const F: &str = "WriteConsoleOutputAttribute";
        let h = self.live(F)?;
        let attributes: Vec<u16> = match attrs {
            Value::Table(t) => {
                let mut out = Vec::with_capacity(t.raw_len());
                for i in 1..=t.raw_len() {
                    let Some(attr) = coerce_integer(&t.raw_get::<Value>(i)?) else {
                        return Err(ConsError::bad_argument(F, 2, "non-number in the array")).into_lua_err();
                    };
                    out.push(attr as u16);
                }
                out
            }
            // Packed little-endian WORDs; a trailing odd byte is ignored.
            Value::String(s) => s
                .as_bytes()
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect(),
            other => {
                return Err(ConsError::bad_argument(
                    F,
                    2,
                    format!("table or string expected, got {}", other.type_name()),
                ))
                .into_lua_err();
            }
        };
        let coord = check_coord(x, y, F, 3).into_lua_err()?;
        Ok(soft(F, self.binding.api.write_console_output_attribute(h, &attributes, coord)))
    }
}

impl std::fmt::Debug for LuaConsoleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LuaConsoleHandle").field(&self.handle).finish()
    }
}

impl UserData for LuaConsoleHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.handle.describe()));

        // h:close(), idempotent
        methods.add_method_mut("close", |_, this, ()| {
            this.handle.close();
            Ok(())
        });

        methods.add_method(
            "FillConsoleOutputAttribute",
            |_, this, (attr, n, x, y): (Value, Value, Value, Value)| {
                const F: &str = "FillConsoleOutputAttribute";
                let h = this.live(F)?;
                let attr = this.flags(&attr, F, 2)? as u16;
                let n = check_integer(&n, F, 3).into_lua_err()? as u32;
                let coord = check_coord(&x, &y, F, 4).into_lua_err()?;
                Ok(soft(F, this.binding.api.fill_console_output_attribute(h, attr, n, coord)))
            },
        );

        methods.add_method(
            "FillConsoleOutputCharacter",
            |_, this, (ch, n, x, y): (Value, Value, Value, Value)| {
                const F: &str = "FillConsoleOutputCharacter";
                let h = this.live(F)?;
                let ch = check_bytes(&ch, F, 2).into_lua_err()?.first().copied().unwrap_or(0);
                let n = check_integer(&n, F, 3).into_lua_err()? as u32;
                let coord = check_coord(&x, &y, F, 4).into_lua_err()?;
                Ok(soft(F, this.binding.api.fill_console_output_character(h, ch, n, coord)))
            },
        );

        methods.add_method("FlushConsoleInputBuffer", |_, this, ()| {
            const F: &str = "FlushConsoleInputBuffer";
            let h = this.live(F)?;
            Ok(soft(F, this.binding.api.flush_console_input_buffer(h)).is_some())
        });

        // h:GetConsoleCursorInfo() -> size, visible | nil
        methods.add_method("GetConsoleCursorInfo", |lua, this, ()| -> mlua::Result<MultiValue> {
            const F: &str = "GetConsoleCursorInfo";
            let h = this.live(F)?;
            match soft(F, this.binding.api.get_console_cursor_info(h)) {
                Some(info) => (info.size, info.visible).into_lua_multi(lua),
                None => Value::Nil.into_lua_multi(lua),
            }
        });

        methods.add_method("SetConsoleCursorInfo", |_, this, (size, visible): (Value, Value)| {
            const F: &str = "SetConsoleCursorInfo";
            let h = this.live(F)?;
            let info = CursorInfo {
                size: check_integer(&size, F, 2).into_lua_err()? as u32,
                visible: truthy(&visible),
            };
            Ok(soft(F, this.binding.api.set_console_cursor_info(h, info)).is_some())
        });

        methods.add_method("SetConsoleCursorPosition", |_, this, (x, y): (Value, Value)| {
            const F: &str = "SetConsoleCursorPosition";
            let h = this.live(F)?;
            let coord = check_coord(&x, &y, F, 2).into_lua_err()?;
            Ok(soft(F, this.binding.api.set_console_cursor_position(h, coord)).is_some())
        });

        methods.add_method("GetConsoleMode", |_, this, ()| {
            const F: &str = "GetConsoleMode";
            let h = this.live(F)?;
            Ok(soft(F, this.binding.api.get_console_mode(h)))
        });

        methods.add_method("SetConsoleMode", |_, this, mode: Value| {
            const F: &str = "SetConsoleMode";
            let h = this.live(F)?;
            let mode = this.flags(&mode, F, 2)? as u32;
            Ok(soft(F, this.binding.api.set_console_mode(h, mode)).is_some())
        });

        methods.add_method("GetConsoleScreenBufferInfo", |lua, this, ()| {
            const F: &str = "GetConsoleScreenBufferInfo";
            let h = this.live(F)?;
            soft(F, this.binding.api.get_console_screen_buffer_info(h))
                .map(|info| screen_buffer_info_table(lua, &info))
                .transpose()
        });

        methods.add_method("GetLargestConsoleWindowSize", |_, this, ()| {
            let h = this.live("GetLargestConsoleWindowSize")?;
            let size = this.binding.api.get_largest_console_window_size(h);
            Ok((size.x, size.y))
        });

        methods.add_method("GetNumberOfConsoleInputEvents", |_, this, ()| {
            const F: &str = "GetNumberOfConsoleInputEvents";
            let h = this.live(F)?;
            Ok(soft(F, this.binding.api.get_number_of_console_input_events(h)))
        });

        methods.add_method("ReadConsoleInput", |lua, this, n: Value| {
            this.read_input(lua, &n, "ReadConsoleInput", false)
        });

        methods.add_method("PeekConsoleInput", |lua, this, n: Value| {
            this.read_input(lua, &n, "PeekConsoleInput", true)
        });

        methods.add_method("WriteConsoleInput", |_, this, records: Value| {
            const F: &str = "WriteConsoleInput";
            let h = this.live(F)?;
            let records = check_table(&records, F, 2).into_lua_err()?;
            let records = this.binding.codec.decode_batch(records, F, 2)?;
            Ok(soft(F, this.binding.api.write_console_input(h, &records)))
        });

        methods.add_method("ReadConsole", |lua, this, n: Value| {
            const F: &str = "ReadConsole";
            let h = this.live(F)?;
            let n = check_count(&n, MAX_READ_LENGTH, "invalid number of characters", F, 2).into_lua_err()?;
            let mut buffer = vec![0u8; n];
            soft(F, this.binding.api.read_console(h, &mut buffer))
                .map(|read| lua.create_string(&buffer[..read]))
                .transpose()
        });

        methods.add_method("WriteConsole", |_, this, text: Value| {
            const F: &str = "WriteConsole";
            let h = this.live(F)?;
            let text = check_bytes(&text, F, 2).into_lua_err()?;
            Ok(soft(F, this.binding.api.write_console(h, &text)))
        });

        methods.add_method("ReadConsoleOutput", |lua, this, params: Value| this.read_output(lua, &params));

        methods.add_method(
            "WriteConsoleOutput",
            |lua, this, (chars, attrs, params): (Value, Value, Value)| {
                this.write_output(lua, &chars, &attrs, &params)
            },
        );

        methods.add_method(
            "ReadConsoleOutputAttribute",
            |lua, this, (n, x, y): (Value, Value, Value)| {
                const F: &str = "ReadConsoleOutputAttribute";
                let h = this.live(F)?;
                let n = check_length(&n, MAX_READ_LENGTH, F, 2).into_lua_err()?;
                let coord = check_coord(&x, &y, F, 3).into_lua_err()?;
                let mut buffer = vec![0u16; n];
                soft(F, this.binding.api.read_console_output_attribute(h, &mut buffer, coord))
                    .map(|read| lua.create_sequence_from(buffer[..read].iter().copied()))
                    .transpose()
            },
        );

        methods.add_method(
            "ReadConsoleOutputCharacter",
            |lua, this, (n, x, y): (Value, Value, Value)| {
                const F: &str = "ReadConsoleOutputCharacter";
                let h = this.live(F)?;
                let n = check_length(&n, MAX_READ_LENGTH, F, 2).into_lua_err()?;
                let coord = check_coord(&x, &y, F, 3).into_lua_err()?;
                let mut buffer = vec![0u8; n];
                soft(F, this.binding.api.read_console_output_character(h, &mut buffer, coord))
                    .map(|read| lua.create_string(&buffer[..read]))
                    .transpose()
            },
        );

        methods.add_method(
            "WriteConsoleOutputAttribute",
            |_, this, (attrs, x, y): (Value, Value, Value)| this.write_attributes(&attrs, &x, &y),
        );

        methods.add_method(
            "WriteConsoleOutputCharacter",
            |_, this, (text, x, y): (Value, Value, Value)| {
                const F: &str = "WriteConsoleOutputCharacter";
                let h = this.live(F)?;
                let text = check_bytes(&text, F, 2).into_lua_err()?;
                let coord = check_coord(&x, &y, F, 3).into_lua_err()?;
                Ok(soft(F, this.binding.api.write_console_output_character(h, &text, coord)))
            },
        );

        methods.add_method("SetConsoleActiveScreenBuffer", |_, this, ()| {
            const F: &str = "SetConsoleActiveScreenBuffer";
            let h = this.live(F)?;
            Ok(soft(F, this.binding.api.set_console_active_screen_buffer(h)).is_some())
        });

        methods.add_method("SetConsoleScreenBufferSize", |_, this, (x, y): (Value, Value)| {
            const F: &str = "SetConsoleScreenBufferSize";
            let h = this.live(F)?;
            let size = check_coord(&x, &y, F, 2).into_lua_err()?;
            Ok(soft(F, this.binding.api.set_console_screen_buffer_size(h, size)).is_some())
        });

        methods.add_method("SetConsoleTextAttribute", |_, this, attr: Value| {
            const F: &str = "SetConsoleTextAttribute";
            let h = this.live(F)?;
            let attr = this.flags(&attr, F, 2)? as u16;
            Ok(soft(F, this.binding.api.set_console_text_attribute(h, attr)).is_some())
        });

        methods.add_method(
            "SetConsoleWindowInfo",
            |_, this, (absolute, left, top, right, bottom): (Value, Value, Value, Value, Value)| {
                const F: &str = "SetConsoleWindowInfo";
                let h = this.live(F)?;
                let absolute = truthy(&absolute);
                let window = SmallRect::new(
                    check_integer(&left, F, 3).into_lua_err()? as i16,
                    check_integer(&top, F, 4).into_lua_err()? as i16,
                    check_integer(&right, F, 5).into_lua_err()? as i16,
                    check_integer(&bottom, F, 6).into_lua_err()? as i16,
                );
                Ok(soft(F, this.binding.api.set_console_window_info(h, absolute, window)).is_some())
            },
        );
    }
}
