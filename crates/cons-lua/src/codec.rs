//! Input record codec.
//!
//! Converts between flat event tables and [`InputRecord`]s.
//!
//! Decoding resolves `EventType` strictly: a missing or unknown tag, or a
//! numeric tag that is not one of the five event kinds, is a fatal input
//! error. The record then starts zeroed and each field takes its table value
//! or its default. For key events a present `UnicodeChar` wins over
//! `AsciiChar`.
//!
//! Encoding writes the symbolic `EventType` and the fields of the matching
//! variant. A record of an unknown kind encodes to an empty table.

use crate::resolver::FlagResolver;
use crate::table::{get_opt_bool, get_opt_int};
use cons_core::record::{
    FocusEventRecord, KeyEventRecord, MenuEventRecord, MouseEventRecord, WindowBufferSizeRecord,
};
use cons_core::{ConsError, ConsoleChar, Coord, InputRecord};
use mlua::{ExternalResult, Lua, Table, Value};

/// Event table ⇄ [`InputRecord`] conversion.
#[derive(Debug, Clone, Default)]
pub struct RecordCodec {
    resolver: FlagResolver,
}

impl RecordCodec {
    #[must_use]
    pub fn new(resolver: FlagResolver) -> Self {
        Self { resolver }
    }

    /// Decodes one event table.
    ///
    /// `function`/`position` identify the argument in error messages.
    pub fn decode(&self, value: &Value, function: &str, position: usize) -> mlua::Result<InputRecord> {
        let Value::Table(table) = value else {
            return Err(ConsError::bad_argument(
                function,
                position,
                format!("event table expected, got {}", value.type_name()),
            ))
            .into_lua_err();
        };
        self.decode_table(table, function, position, None)
    }

    /// Decodes a non-empty array of event tables, in order.
    pub fn decode_batch(&self, table: &Table, function: &str, position: usize) -> mlua::Result<Vec<InputRecord>> {
        let len = table.raw_len();
        if len == 0 {
            return Err(ConsError::bad_argument(function, position, "empty array")).into_lua_err();
        }
        let mut records = Vec::with_capacity(len);
        for index in 1..=len {
            let item = match table.raw_get::<Value>(index)? {
                Value::Table(item) => item,
                other => {
                    return Err(ConsError::bad_argument(
                        function,
                        position,
                        format!("record {index}: event table expected, got {}", other.type_name()),
                    ))
                    .into_lua_err();
                }
            };
            let record = self.decode_table(&item, function, position, Some(index))?;
            records.push(record);
        }
        Ok(records)
    }

    fn decode_table(
        &self,
        table: &Table,
        function: &str,
        position: usize,
        index: Option<usize>,
    ) -> mlua::Result<InputRecord> {
        let tag = table.get::<Value>("EventType")?;
        let record = self
            .resolver
            .resolve_flag(&tag)
            .and_then(|tag| u16::try_from(tag).ok())
            .and_then(InputRecord::zeroed);
        let Some(record) = record else {
            let reason = match index {
                Some(index) => format!("record {index}: EventType field is missing or invalid"),
                None => "EventType field is missing or invalid".to_string(),
            };
            return Err(ConsError::bad_argument(function, position, reason)).into_lua_err();
        };
        fill(table, record)
    }

    /// Encodes one record.
    pub fn encode(&self, lua: &Lua, record: &InputRecord) -> mlua::Result<Table> {
        let table = lua.create_table()?;
        let Some(name) = record.event_name() else {
            return Ok(table);
        };
        table.set("EventType", name)?;
        match record {
            InputRecord::Key(key) => {
                table.set("bKeyDown", key.key_down)?;
                table.set("wRepeatCount", key.repeat_count)?;
                table.set("wVirtualKeyCode", key.virtual_key_code)?;
                table.set("wVirtualScanCode", key.virtual_scan_code)?;
                match key.ch {
                    ConsoleChar::Wide(c) => table.set("UnicodeChar", c)?,
                    ConsoleChar::Narrow(c) => table.set("AsciiChar", c)?,
                }
                table.set("dwControlKeyState", key.control_key_state)?;
            }
            InputRecord::Mouse(mouse) => {
                table.set("dwMousePositionX", mouse.position.x)?;
                table.set("dwMousePositionY", mouse.position.y)?;
                table.set("dwButtonState", mouse.button_state)?;
                table.set("dwControlKeyState", mouse.control_key_state)?;
                table.set("dwEventFlags", mouse.event_flags)?;
            }
            InputRecord::WindowBufferSize(window) => {
                table.set("dwSizeX", window.size.x)?;
                table.set("dwSizeY", window.size.y)?;
            }
            InputRecord::Menu(menu) => table.set("dwCommandId", menu.command_id)?,
            InputRecord::Focus(focus) => table.set("bSetFocus", focus.set_focus)?,
            InputRecord::Other(_) => {}
        }
        Ok(table)
    }

    /// Encodes records into an array, preserving order.
    pub fn encode_batch(&self, lua: &Lua, records: &[InputRecord]) -> mlua::Result<Table> {
        let array = lua.create_table_with_capacity(records.len(), 0)?;
        for (i, record) in records.iter().enumerate() {
            array.raw_set(i + 1, self.encode(lua, record)?)?;
        }
        Ok(array)
    }
}

fn fill(table: &Table, record: InputRecord) -> mlua::Result<InputRecord> {
    Ok(match record {
        InputRecord::Key(_) => {
            let ch = if table.get::<Value>("UnicodeChar")?.is_nil() {
                ConsoleChar::Narrow(get_opt_int(table, "AsciiChar", 0)? as u8)
            } else {
                ConsoleChar::Wide(get_opt_int(table, "UnicodeChar", 0)? as u16)
            };
            InputRecord::Key(KeyEventRecord {
                key_down: get_opt_bool(table, "bKeyDown", false)?,
                repeat_count: get_opt_int(table, "wRepeatCount", 1)? as u16,
                virtual_key_code: get_opt_int(table, "wVirtualKeyCode", 0)? as u16,
                virtual_scan_code: get_opt_int(table, "wVirtualScanCode", 0)? as u16,
                ch,
                control_key_state: get_opt_int(table, "dwControlKeyState", 0)? as u32,
            })
        }
        InputRecord::Mouse(_) => InputRecord::Mouse(MouseEventRecord {
            position: Coord::new(
                get_opt_int(table, "dwMousePositionX", 0)? as i16,
                get_opt_int(table, "dwMousePositionY", 0)? as i16,
            ),
            button_state: get_opt_int(table, "dwButtonState", 0)? as u32,
            control_key_state: get_opt_int(table, "dwControlKeyState", 0)? as u32,
            event_flags: get_opt_int(table, "dwEventFlags", 0)? as u32,
        }),
        InputRecord::WindowBufferSize(_) => InputRecord::WindowBufferSize(WindowBufferSizeRecord {
            size: Coord::new(
                get_opt_int(table, "dwSizeX", 0)? as i16,
                get_opt_int(table, "dwSizeY", 0)? as i16,
            ),
        }),
        InputRecord::Menu(_) => InputRecord::Menu(MenuEventRecord {
            command_id: get_opt_int(table, "dwCommandId", 0)? as u32,
        }),
        InputRecord::Focus(_) => InputRecord::Focus(FocusEventRecord {
            set_focus: get_opt_bool(table, "bSetFocus", false)?,
        }),
        other @ InputRecord::Other(_) => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(lua: &Lua, src: &str) -> mlua::Result<InputRecord> {
        let value = lua.load(src).eval::<Value>()?;
        RecordCodec::default().decode(&value, "WriteConsoleInput", 2)
    }

    #[test]
    fn focus_round_trip_is_exact() {
        let lua = Lua::new();
        let record = decode(&lua, "{ EventType = 'FOCUS_EVENT', bSetFocus = true }").unwrap();
        assert_eq!(record, InputRecord::Focus(FocusEventRecord { set_focus: true }));

        let table = RecordCodec::default().encode(&lua, &record).unwrap();
        assert_eq!(table.get::<String>("EventType").unwrap(), "FOCUS_EVENT");
        assert!(table.get::<bool>("bSetFocus").unwrap());
        assert_eq!(table.pairs::<Value, Value>().count(), 2);
    }

    #[test]
    fn key_defaults() {
        let lua = Lua::new();
        let record = decode(&lua, "{ EventType = 'KEY_EVENT' }").unwrap();
        assert_eq!(record, InputRecord::Key(KeyEventRecord::default()));
    }

    #[test]
    fn wide_char_wins_over_narrow() {
        let lua = Lua::new();
        let record = decode(
            &lua,
            "{ EventType = 'KEY_EVENT', UnicodeChar = 0x263A, AsciiChar = 65 }",
        )
        .unwrap();
        let InputRecord::Key(key) = record else {
            panic!("expected key record, got {record:?}");
        };
        assert_eq!(key.ch, ConsoleChar::Wide(0x263A));
    }

    #[test]
    fn narrow_char_when_wide_absent() {
        let lua = Lua::new();
        let record = decode(&lua, "{ EventType = 1, AsciiChar = 65, bKeyDown = 1 }").unwrap();
        let InputRecord::Key(key) = record else {
            panic!("expected key record, got {record:?}");
        };
        assert_eq!(key.ch, ConsoleChar::Narrow(b'A'));
        assert!(key.key_down);
    }

    #[test]
    fn wide_key_encodes_without_narrow_field() {
        let lua = Lua::new();
        let codec = RecordCodec::default();
        let record = InputRecord::Key(KeyEventRecord {
            ch: ConsoleChar::Wide(0x00E9),
            ..KeyEventRecord::default()
        });
        let table = codec.encode(&lua, &record).unwrap();
        assert_eq!(table.get::<i64>("UnicodeChar").unwrap(), 0xE9);
        assert!(table.get::<Value>("AsciiChar").unwrap().is_nil());

        let back = codec.decode(&Value::Table(table), "f", 1).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn mouse_and_window_fields() {
        let lua = Lua::new();
        let record = decode(
            &lua,
            "{ EventType = 'MOUSE_EVENT', dwMousePositionX = 4, dwMousePositionY = 2, dwButtonState = 1 }",
        )
        .unwrap();
        assert_eq!(
            record,
            InputRecord::Mouse(MouseEventRecord {
                position: Coord::new(4, 2),
                button_state: 1,
                ..MouseEventRecord::default()
            })
        );

        let record = decode(&lua, "{ EventType = 'WINDOW_BUFFER_SIZE_EVENT', dwSizeX = 100 }").unwrap();
        let table = RecordCodec::default().encode(&lua, &record).unwrap();
        assert_eq!(table.get::<i64>("dwSizeX").unwrap(), 100);
        assert_eq!(table.get::<i64>("dwSizeY").unwrap(), 0);
    }

    #[test]
    fn bad_event_type_is_fatal() {
        let lua = Lua::new();
        for src in [
            "{}",
            "{ EventType = 'BOGUS' }",
            "{ EventType = 0x20 }",
            "{ EventType = 0x10001 }",
            "{ EventType = true }",
        ] {
            let err = decode(&lua, src).unwrap_err();
            assert!(
                err.to_string().contains("EventType field is missing or invalid"),
                "{src}: {err}"
            );
        }
    }

    #[test]
    fn non_table_is_fatal() {
        let err = RecordCodec::default()
            .decode(&Value::Integer(1), "WriteConsoleInput", 2)
            .unwrap_err();
        assert!(err.to_string().contains("bad argument #2 to 'WriteConsoleInput'"));
    }

    #[test]
    fn other_records_encode_empty() {
        let lua = Lua::new();
        let table = RecordCodec::default().encode(&lua, &InputRecord::Other(0x40)).unwrap();
        assert_eq!(table.raw_len(), 0);
        assert_eq!(table.pairs::<Value, Value>().count(), 0);
    }

    #[test]
    fn batch_preserves_order() {
        let lua = Lua::new();
        let codec = RecordCodec::default();
        let array: Table = lua
            .load(
                "{ { EventType = 'MENU_EVENT', dwCommandId = 1 },
                   { EventType = 'FOCUS_EVENT' },
                   { EventType = 'MENU_EVENT', dwCommandId = 3 } }",
            )
            .eval()
            .unwrap();
        let records = codec.decode_batch(&array, "WriteConsoleInput", 2).unwrap();
        assert_eq!(
            records,
            vec![
                InputRecord::Menu(MenuEventRecord { command_id: 1 }),
                InputRecord::Focus(FocusEventRecord::default()),
                InputRecord::Menu(MenuEventRecord { command_id: 3 }),
            ]
        );

        let encoded = codec.encode_batch(&lua, &records).unwrap();
        assert_eq!(encoded.raw_len(), 3);
        let third: Table = encoded.get(3).unwrap();
        assert_eq!(third.get::<i64>("dwCommandId").unwrap(), 3);
    }

    #[test]
    fn batch_rejects_empty_and_bad_elements() {
        let lua = Lua::new();
        let codec = RecordCodec::default();
        let empty = lua.create_table().unwrap();
        let err = codec.decode_batch(&empty, "WriteConsoleInput", 2).unwrap_err();
        assert!(err.to_string().contains("empty array"));

        let array: Table = lua
            .load("{ { EventType = 'FOCUS_EVENT' }, { EventType = 'NOPE' } }")
            .eval()
            .unwrap();
        let err = codec.decode_batch(&array, "WriteConsoleInput", 2).unwrap_err();
        assert!(err.to_string().contains("record 2"), "{err}");
    }
}
