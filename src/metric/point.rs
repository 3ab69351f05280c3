//! `Point` is hawking's in-memory form of one time-series data point.

use std::fmt;

/// A typed field value.
///
/// InfluxDB distinguishes integer from float fields on the wire, so the
/// distinction is carried here rather than flattened to f64.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A signed integer field, rendered with the `i` suffix.
    Int(i64),
    /// A float field, rendered in fixed decimal notation.
    Float(f64),
    /// A string field, rendered quoted and escaped.
    Str(String),
}

/// The ways a tag or field can be refused.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointError {
    /// The tag or field name was empty.
    EmptyName,
    /// The tag value was empty. Tag values must be non-empty; an empty
    /// string field is legal.
    EmptyValue,
    /// The name began with an underscore, reserved by the database.
    ReservedPrefix,
}

impl fmt::Display for PointError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PointError::EmptyName => write!(f, "name must be non-empty"),
            PointError::EmptyValue => write!(f, "tag value must be non-empty"),
            PointError::ReservedPrefix => {
                write!(f, "name must not begin with an underscore")
            }
        }
    }
}

/// One data point: measurement, timestamp, tags and fields.
///
/// Points are write-once. Mutators append and never remove; there is no
/// update operation. Tags and fields live in vectors kept sorted by name
/// on insert, binary-search style, so that rendering is deterministic no
/// matter the insertion order. Inserting a duplicate name replaces the
/// previous value.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    /// The measurement this point belongs to, e.g. `pi_hole_top_ads`.
    pub measurement: String,
    /// Nanoseconds since epoch, fixed at construction.
    pub timestamp_ns: i64,
    tags: Vec<(String, String)>,
    fields: Vec<(String, Value)>,
}

fn check_name(name: &str) -> Result<(), PointError> {
    if name.is_empty() {
        Err(PointError::EmptyName)
    } else if name.starts_with('_') {
        Err(PointError::ReservedPrefix)
    } else {
        Ok(())
    }
}

fn insert<T>(pairs: &mut Vec<(String, T)>, name: String, value: T) {
    match pairs.binary_search_by(|probe| probe.0.as_str().cmp(&name[..])) {
        Ok(idx) => {
            pairs[idx].1 = value;
        }
        Err(idx) => {
            pairs.insert(idx, (name, value));
        }
    }
}

impl Point {
    /// Create an empty point against the given measurement and stamp.
    pub fn new<S>(measurement: S, timestamp_ns: i64) -> Point
    where
        S: Into<String>,
    {
        Point {
            measurement: measurement.into(),
            timestamp_ns: timestamp_ns,
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Attach one tag.
    ///
    /// Name and value must both be non-empty and the name must not begin
    /// with an underscore. On error the point is unchanged; callers are
    /// expected to discard the whole point rather than ship it half-built.
    pub fn add_tag<S, V>(&mut self, name: S, value: V) -> Result<(), PointError>
    where
        S: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        let value = value.into();
        check_name(&name)?;
        if value.is_empty() {
            return Err(PointError::EmptyValue);
        }
        insert(&mut self.tags, name, value);
        Ok(())
    }

    /// Attach one integer field.
    pub fn add_int_field<S>(&mut self, name: S, value: i64) -> Result<(), PointError>
    where
        S: Into<String>,
    {
        let name = name.into();
        check_name(&name)?;
        insert(&mut self.fields, name, Value::Int(value));
        Ok(())
    }

    /// Attach one float field.
    pub fn add_float_field<S>(&mut self, name: S, value: f64) -> Result<(), PointError>
    where
        S: Into<String>,
    {
        let name = name.into();
        check_name(&name)?;
        insert(&mut self.fields, name, Value::Float(value));
        Ok(())
    }

    /// Attach one string field.
    pub fn add_string_field<S, V>(&mut self, name: S, value: V) -> Result<(), PointError>
    where
        S: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        check_name(&name)?;
        insert(&mut self.fields, name, Value::Str(value.into()));
        Ok(())
    }

    /// Iterate tags in name order.
    pub fn tags(&self) -> ::std::slice::Iter<(String, String)> {
        self.tags.iter()
    }

    /// Iterate fields in name order.
    pub fn fields(&self) -> ::std::slice::Iter<(String, Value)> {
        self.fields.iter()
    }

    /// True if the point carries no fields. Such a point is meaningless in
    /// line-protocol form and will render to the empty string.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_names_are_refused() {
        let mut pnt = Point::new("pi_hole", 10101);
        assert_eq!(Err(PointError::EmptyName), pnt.add_tag("", "router"));
        assert_eq!(Err(PointError::EmptyName), pnt.add_int_field("", 1));
        assert_eq!(Err(PointError::EmptyName), pnt.add_float_field("", 1.0));
        assert_eq!(Err(PointError::EmptyName), pnt.add_string_field("", "x"));
        assert!(pnt.is_empty());
        assert_eq!(0, pnt.tags().len());
    }

    #[test]
    fn empty_tag_values_are_refused() {
        let mut pnt = Point::new("pi_hole", 10101);
        assert_eq!(Err(PointError::EmptyValue), pnt.add_tag("host", ""));
        assert_eq!(0, pnt.tags().len());
    }

    #[test]
    fn reserved_prefix_is_refused() {
        let mut pnt = Point::new("pi_hole", 10101);
        assert_eq!(
            Err(PointError::ReservedPrefix),
            pnt.add_tag("_host", "router")
        );
        assert_eq!(
            Err(PointError::ReservedPrefix),
            pnt.add_int_field("_count", 3)
        );
    }

    #[test]
    fn empty_string_field_value_is_legal() {
        let mut pnt = Point::new("pi_hole", 10101);
        assert_eq!(Ok(()), pnt.add_string_field("note", ""));
        assert!(!pnt.is_empty());
    }

    #[test]
    fn tags_and_fields_sort_on_insert() {
        let mut pnt = Point::new("pi_hole", 10101);
        pnt.add_tag("zebra", "z").unwrap();
        pnt.add_tag("apple", "a").unwrap();
        pnt.add_int_field("second", 2).unwrap();
        pnt.add_int_field("first", 1).unwrap();

        let tag_names: Vec<&str> = pnt.tags().map(|&(ref k, _)| k.as_str()).collect();
        assert_eq!(vec!["apple", "zebra"], tag_names);
        let field_names: Vec<&str> =
            pnt.fields().map(|&(ref k, _)| k.as_str()).collect();
        assert_eq!(vec!["first", "second"], field_names);
    }

    #[test]
    fn duplicate_insert_replaces() {
        let mut pnt = Point::new("pi_hole", 10101);
        pnt.add_tag("host", "old").unwrap();
        pnt.add_tag("host", "new").unwrap();
        let tags: Vec<_> = pnt.tags().collect();
        assert_eq!(1, tags.len());
        assert_eq!("new", tags[0].1);
    }
}
