use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

/// A compact JSON formatter that escapes HTML-sensitive characters in strings.
///
/// `<`, `>` and `&` are written as `\u003c`, `\u003e` and `\u0026`, and the line and
/// paragraph separators U+2028 and U+2029 as `\u2028` and `\u2029`. Everything else is written like
/// [`serde_json::to_vec`] does, including the escaping of quotes, backslashes and control
/// characters. The Anodot API expects this encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct WireFormatter;

impl Formatter for WireFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;

        for (index, ch) in fragment.char_indices() {
            let escaped: &[u8] = match ch {
                '<' => b"\\u003c",
                '>' => b"\\u003e",
                '&' => b"\\u0026",
                '\u{2028}' => b"\\u2028",
                '\u{2029}' => b"\\u2029",
                _ => continue,
            };

            writer.write_all(&fragment.as_bytes()[start..index])?;
            writer.write_all(escaped)?;
            start = index + ch.len_utf8();
        }

        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// Serializes a value into the JSON encoding expected by the Anodot API.
pub fn to_wire_vec<T>(value: &T) -> Result<Vec<u8>, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let mut serializer = Serializer::with_formatter(Vec::with_capacity(128), WireFormatter);
    value.serialize(&mut serializer)?;
    Ok(serializer.into_inner())
}

/// Serializes a value into a JSON string with [`WireFormatter`].
pub fn to_wire_string<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let vec = to_wire_vec(value)?;
    // The formatter never splits characters.
    Ok(String::from_utf8_lossy(&vec).into_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_escapes_html_characters() {
        assert_eq!(to_wire_string("value>S").unwrap(), r#""value\u003eS""#);
        assert_eq!(to_wire_string("value<X").unwrap(), r#""value\u003cX""#);
        assert_eq!(to_wire_string("a&b").unwrap(), r#""a\u0026b""#);
        assert_eq!(
            to_wire_string("line\u{2028}para\u{2029}").unwrap(),
            r#""line\u2028para\u2029""#
        );
    }

    #[test]
    fn test_doubles_backslash() {
        assert_eq!(to_wire_string("a\\m").unwrap(), r#""a\\m""#);
    }

    #[test]
    fn test_standard_escapes_kept() {
        assert_eq!(
            to_wire_string("\"quoted\"\n\t").unwrap(),
            r#""\"quoted\"\n\t""#
        );
    }

    #[test]
    fn test_escapes_keys() {
        let map = BTreeMap::from([("<key>", "plain")]);
        assert_eq!(to_wire_string(&map).unwrap(), r#"{"\u003ckey\u003e":"plain"}"#);
    }

    #[test]
    fn test_plain_strings_unchanged() {
        let value = serde_json::json!({"what": "host:8080api/v1", "n": [1, 2.5]});
        assert_eq!(
            to_wire_vec(&value).unwrap(),
            serde_json::to_vec(&value).unwrap()
        );
    }

    #[test]
    fn test_wire_output_parses_back() {
        let original = "<a href=\"x\">&\u{2028}</a>";
        let json = to_wire_string(original).unwrap();
        let parsed: String = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
