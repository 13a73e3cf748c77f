//! Parser for Helm-style `--set` assignments
//!
//! Supports the subset of the grammar that parameter keys use in practice:
//! - `a.b.c=value` nested map paths
//! - `a[0]=value` and `a[0].b=value` list indices
//! - `a={x,y,z}` inline lists
//! - `a=1,b=2` several assignments separated by commas
//! - `\` escapes the next character
//!
//! Values are typed: `true`/`false` become booleans, `null` becomes null and
//! integers without a leading zero become numbers. Everything else is a string.

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// Upper bound on list indices, to avoid allocating huge sparse lists
const MAX_INDEX: usize = 65536;

/// Error produced when an assignment cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SetParseError {
    pub message: String,
}

impl SetParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

type ParseResult<T> = std::result::Result<T, SetParseError>;

/// Parse `input` and merge every assignment into `dest`
pub fn parse_into(input: &str, dest: &mut Map<String, JsonValue>) -> ParseResult<()> {
    let mut parser = Parser::new(input);
    while !parser.is_eof() {
        parser.key(dest)?;
    }
    Ok(())
}

/// Parse `input` into a fresh map
pub fn parse(input: &str) -> ParseResult<Map<String, JsonValue>> {
    let mut map = Map::new();
    parse_into(input, &mut map)?;
    Ok(map)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Read until one of `stops`, consuming the stop character
    fn read_until(&mut self, stops: &[char]) -> (String, Option<char>) {
        let mut out = String::new();
        while let Some(c) = self.next_char() {
            if c == '\\' {
                if let Some(escaped) = self.next_char() {
                    out.push(escaped);
                }
                continue;
            }
            if stops.contains(&c) {
                return (out, Some(c));
            }
            out.push(c);
        }
        (out, None)
    }

    fn key(&mut self, data: &mut Map<String, JsonValue>) -> ParseResult<()> {
        let (key, stop) = self.read_until(&['=', '[', ',', '.']);
        match stop {
            None if key.is_empty() => Ok(()),
            None => Err(SetParseError::new(format!("key \"{key}\" has no value"))),
            Some(',') => Err(SetParseError::new(format!(
                "key \"{key}\" has no value (cannot end with ,)"
            ))),
            Some('=') => {
                let value = self.value()?;
                data.insert(key, value);
                Ok(())
            }
            Some('.') => {
                if key.is_empty() {
                    return Err(SetParseError::new("key map \"\" has no value"));
                }
                let mut inner = match data.remove(&key) {
                    Some(JsonValue::Object(map)) => map,
                    _ => Map::new(),
                };
                let result = self.key(&mut inner);
                data.insert(key, JsonValue::Object(inner));
                result
            }
            Some(_) => {
                // '['
                let idx = self.index()?;
                let list = match data.remove(&key) {
                    Some(JsonValue::Array(list)) => list,
                    _ => Vec::new(),
                };
                let list = self.list_item(list, idx)?;
                data.insert(key, JsonValue::Array(list));
                Ok(())
            }
        }
    }

    /// Value on the right hand side of `=`; consumes the trailing separator
    fn value(&mut self) -> ParseResult<JsonValue> {
        if self.peek() == Some('{') {
            self.next_char();
            let list = self.list_values()?;
            self.expect_separator()?;
            return Ok(JsonValue::Array(list));
        }
        let (raw, _) = self.read_until(&[',']);
        Ok(typed_value(&raw))
    }

    fn index(&mut self) -> ParseResult<usize> {
        let (raw, stop) = self.read_until(&[']']);
        if stop.is_none() {
            return Err(SetParseError::new(format!(
                "list index \"{raw}\" must terminate with ']'"
            )));
        }
        let idx: usize = raw
            .trim()
            .parse()
            .map_err(|_| SetParseError::new(format!("invalid list index \"{raw}\"")))?;
        if idx > MAX_INDEX {
            return Err(SetParseError::new(format!(
                "list index {idx} exceeds the maximum of {MAX_INDEX}"
            )));
        }
        Ok(idx)
    }

    fn list_item(&mut self, mut list: Vec<JsonValue>, idx: usize) -> ParseResult<Vec<JsonValue>> {
        let (rest, stop) = self.read_until(&['=', '.', '[']);
        if !rest.is_empty() {
            return Err(SetParseError::new(format!(
                "unexpected data \"{rest}\" at end of list index"
            )));
        }
        match stop {
            None => {
                return Err(SetParseError::new(format!(
                    "list item {idx} has no value"
                )));
            }
            Some('=') => {
                let value = self.value()?;
                set_index(&mut list, idx, value);
            }
            Some('.') => {
                let mut inner = match list.get_mut(idx).map(JsonValue::take) {
                    Some(JsonValue::Object(map)) => map,
                    _ => Map::new(),
                };
                let result = self.key(&mut inner);
                set_index(&mut list, idx, JsonValue::Object(inner));
                result?;
            }
            Some(_) => {
                // '['
                let next_idx = self.index()?;
                let inner = match list.get_mut(idx).map(JsonValue::take) {
                    Some(JsonValue::Array(inner)) => inner,
                    _ => Vec::new(),
                };
                let inner = self.list_item(inner, next_idx)?;
                set_index(&mut list, idx, JsonValue::Array(inner));
            }
        }
        Ok(list)
    }

    fn list_values(&mut self) -> ParseResult<Vec<JsonValue>> {
        let mut list = Vec::new();
        if self.peek() == Some('}') {
            self.next_char();
            return Ok(list);
        }
        loop {
            let (raw, stop) = self.read_until(&[',', '}']);
            match stop {
                None => return Err(SetParseError::new("list must terminate with '}'")),
                Some('}') => {
                    list.push(typed_value(&raw));
                    return Ok(list);
                }
                Some(_) => list.push(typed_value(&raw)),
            }
        }
    }

    fn expect_separator(&mut self) -> ParseResult<()> {
        match self.next_char() {
            None | Some(',') => Ok(()),
            Some(c) => Err(SetParseError::new(format!(
                "expected ',' or end of input after list, found '{c}'"
            ))),
        }
    }
}

fn set_index(list: &mut Vec<JsonValue>, idx: usize, value: JsonValue) {
    if list.len() <= idx {
        list.resize(idx + 1, JsonValue::Null);
    }
    list[idx] = value;
}

fn typed_value(raw: &str) -> JsonValue {
    match raw {
        "true" => JsonValue::Bool(true),
        "false" => JsonValue::Bool(false),
        "null" => JsonValue::Null,
        _ => {
            if raw == "0" || !raw.starts_with('0') {
                if let Ok(num) = raw.parse::<i64>() {
                    return JsonValue::Number(num.into());
                }
            }
            JsonValue::String(raw.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_paths() {
        let map = parse("a.b.c=foo,a.b.d=bar,d=baz").unwrap();
        assert_eq!(
            JsonValue::Object(map),
            json!({"a": {"b": {"c": "foo", "d": "bar"}}, "d": "baz"})
        );
    }

    #[test]
    fn test_typed_values() {
        let map = parse("enabled=true,replicas=3,tag=007,nothing=null,name=nginx").unwrap();
        assert_eq!(map["enabled"], json!(true));
        assert_eq!(map["replicas"], json!(3));
        assert_eq!(map["tag"], json!("007"));
        assert_eq!(map["nothing"], JsonValue::Null);
        assert_eq!(map["name"], json!("nginx"));
    }

    #[test]
    fn test_lists() {
        let map = parse("hosts={a,b,c}").unwrap();
        assert_eq!(map["hosts"], json!(["a", "b", "c"]));

        let map = parse("servers[1].port=80").unwrap();
        assert_eq!(map["servers"], json!([null, {"port": 80}]));

        let map = parse("matrix[0][1]=x").unwrap();
        assert_eq!(map["matrix"], json!([[null, "x"]]));
    }

    #[test]
    fn test_escapes() {
        let map = parse(r"annotations.kubernetes\.io/ingress=nginx").unwrap();
        assert_eq!(map["annotations"]["kubernetes.io/ingress"], json!("nginx"));
    }

    #[test]
    fn test_errors() {
        assert!(parse("a={").is_err());
        assert!(parse("invalid={{").is_err());
        assert!(parse("a").is_err());
        assert!(parse("a,b=c").is_err());
        assert!(parse("a[x]=1").is_err());
    }

    #[test]
    fn test_merges_into_existing() {
        let mut map = parse("a.b=1").unwrap();
        parse_into("a.c=2", &mut map).unwrap();
        assert_eq!(JsonValue::Object(map), json!({"a": {"b": 1, "c": 2}}));
    }
}
