//! Line-protocol rendering for `Point`.
//!
//! This is the one byte-exact boundary in hawking: the text produced here
//! is what InfluxDB's write endpoint parses. The layout is
//!
//! ```text
//! measurement[,tag=val...] field=val[,field=val...] timestamp_ns
//! ```
//!
//! with tags and fields in name order, so the same point always renders to
//! the same bytes.

use metric::point::{Point, Value};

/// Escape a tag name or tag value into `buf`.
///
/// Comma, equals and space each gain a single preceding backslash; no
/// other byte is altered, keeping the escape injective for the characters
/// it targets.
fn escape_tag(s: &str, buf: &mut String) {
    for c in s.chars() {
        match c {
            ',' | '=' | ' ' => {
                buf.push('\\');
                buf.push(c);
            }
            c => buf.push(c),
        }
    }
}

/// Escape a string field value into `buf`. Backslash doubles, double-quote
/// gains a backslash. The surrounding quotes are the renderer's job.
fn escape_field_str(s: &str, buf: &mut String) {
    for c in s.chars() {
        match c {
            '\\' => buf.push_str("\\\\"),
            '"' => buf.push_str("\\\""),
            c => buf.push(c),
        }
    }
}

/// Render one point to its line-protocol text.
///
/// A point with no fields renders to the empty string: there is nothing
/// the database could store for it, and callers must omit it from the
/// batch.
pub fn render(pnt: &Point) -> String {
    if pnt.is_empty() {
        return String::new();
    }
    let mut line = String::with_capacity(256);
    line.push_str(&pnt.measurement);
    for &(ref name, ref value) in pnt.tags() {
        line.push(',');
        escape_tag(name, &mut line);
        line.push('=');
        escape_tag(value, &mut line);
    }
    line.push(' ');
    let mut first = true;
    for &(ref name, ref value) in pnt.fields() {
        if !first {
            line.push(',');
        }
        first = false;
        line.push_str(name);
        line.push('=');
        match *value {
            Value::Int(i) => {
                line.push_str(&i.to_string());
                line.push('i');
            }
            Value::Float(f) => {
                line.push_str(&f.to_string());
            }
            Value::Str(ref s) => {
                line.push('"');
                escape_field_str(s, &mut line);
                line.push('"');
            }
        }
    }
    line.push(' ');
    line.push_str(&pnt.timestamp_ns.to_string());
    line
}
