//! Shared XML attribute and text utilities for the XLSX reader and writer.

use quick_xml::events::BytesStart;

/// Extract an attribute value by local name (namespace prefix ignored),
/// with entities unescaped.
///
/// Returns `None` if the attribute is missing or malformed.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

pub fn attr_usize(e: &BytesStart, key: &[u8]) -> Option<usize> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

pub fn attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Recognizes `"1"` and `"true"` as true; a missing attribute is `None`.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_string(e, key).map(|s| matches!(s.as_str(), "1" | "true"))
}

/// Minimal XML escaping for attribute/text content.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;

    fn make_start(content: &str) -> BytesStart<'_> {
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_attr_string_unescapes_and_ignores_prefix() {
        let e = make_start(r#"sheet name="R&amp;D" r:id="rId1""#);
        assert_eq!(attr_string(&e, b"name"), Some("R&D".to_string()));
        assert_eq!(attr_string(&e, b"id"), Some("rId1".to_string()));
        assert_eq!(attr_string(&e, b"missing"), None);
    }

    #[test]
    fn test_numeric_and_bool_attrs() {
        let e = make_start(r#"pane ySplit="2" width="12.5" customWidth="1""#);
        assert_eq!(attr_usize(&e, b"ySplit"), Some(2));
        assert_eq!(attr_f64(&e, b"width"), Some(12.5));
        assert_eq!(attr_bool(&e, b"customWidth"), Some(true));
        assert_eq!(attr_bool(&e, b"hidden"), None);
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&apos;");
    }
}
