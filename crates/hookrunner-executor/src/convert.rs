//! `serde_json::Value` <-> Lua value conversion (§4.4): strings, numbers and
//! booleans map directly; JSON arrays become 1-indexed tables; JSON objects
//! become tables; `null` becomes `nil`; anything that doesn't fit falls back
//! to its JSON-encoded string form.

use mlua::{Lua, Value as LuaValue};
use serde_json::Value as JsonValue;

pub fn json_to_lua<'lua>(lua: &'lua Lua, value: &JsonValue) -> mlua::Result<LuaValue<'lua>> {
    Ok(match value {
        JsonValue::Null => LuaValue::Nil,
        JsonValue::Bool(b) => LuaValue::Boolean(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                LuaValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                LuaValue::Number(f)
            } else {
                // u64 values too large for i64/f64 precision: keep exact text.
                LuaValue::String(lua.create_string(n.to_string())?)
            }
        }
        JsonValue::String(s) => LuaValue::String(lua.create_string(s)?),
        JsonValue::Array(items) => {
            let table = lua.create_table()?;
            for (i, item) in items.iter().enumerate() {
                table.set(i + 1, json_to_lua(lua, item)?)?;
            }
            LuaValue::Table(table)
        }
        JsonValue::Object(map) => {
            let table = lua.create_table()?;
            for (k, v) in map {
                table.set(k.as_str(), json_to_lua(lua, v)?)?;
            }
            LuaValue::Table(table)
        }
    })
}
