//! Parse a Pi-hole status document into points.
//!
//! One well-formed snapshot produces seven measurement groups: a root
//! `pi_hole` row of counters, one row per top source / forward destination
//! / query type / top ad / top query, and a `pi_hole_gravity` row. Every
//! point carries the `pi_hole_host` tag so that several appliances can
//! share one bucket.
//!
//! Malformed input is handled row by row: a missing group, a value of the
//! wrong JSON type or a mangled composite key skips that row with a
//! warning and the rest of the snapshot goes on. The caller gets the skip
//! count back for its own accounting.

use metric::{Point, PointError};
use serde::Deserialize;
use serde_json;
use serde_json::Value;
use std::fmt;

/// The tag name under which the monitored appliance is identified. Present
/// on every point derived from a snapshot.
pub const HOST_TAG: &str = "pi_hole_host";

/// The top-level counters of a status document. Decoded in one step so a
/// summary either arrives whole or not at all.
#[derive(Debug, Deserialize)]
struct Summary {
    ads_blocked_today: i64,
    queries_cached: i64,
    queries_forwarded: i64,
    dns_queries_all_replies: i64,
    dns_queries_all_types: i64,
    dns_queries_today: i64,
    domains_being_blocked: i64,
    unique_clients: i64,
    unique_domains: i64,
    ads_percentage_today: f64,
}

#[derive(Debug, Deserialize)]
struct GravityLastUpdated {
    absolute: i64,
}

/// Everything harvested from one snapshot.
#[derive(Debug)]
pub struct Harvest {
    /// The points produced, in group order. None of them is field-less.
    pub points: Vec<Point>,
    /// How many rows were skipped for malformed input.
    pub skipped: usize,
}

impl Harvest {
    fn skip(&mut self, measurement: &str, key: &str, err: &RowError) {
        self.skipped = self.skipped.saturating_add(1);
        warn!("skipping {} row {:?}: {}", measurement, key, err);
    }
}

/// A snapshot the transform cannot begin on. There are no rows to salvage
/// from a document that is not an object, so the whole cycle is abandoned.
#[derive(Debug)]
pub enum SnapshotError {
    /// The document was not a JSON object.
    NotAnObject,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SnapshotError::NotAnObject => {
                write!(f, "snapshot is not a JSON object")
            }
        }
    }
}

/// The ways a single row can be malformed.
#[derive(Debug)]
enum RowError {
    MissingKey,
    NotAnObject,
    NotANumber,
    CompositeKey,
    Decode(serde_json::Error),
    Point(PointError),
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RowError::MissingKey => write!(f, "key is missing"),
            RowError::NotAnObject => write!(f, "value is not a JSON object"),
            RowError::NotANumber => write!(f, "value is not a number"),
            RowError::CompositeKey => {
                write!(f, "composite key must contain exactly one '|'")
            }
            RowError::Decode(ref e) => write!(f, "decode failed: {}", e),
            RowError::Point(ref e) => write!(f, "{}", e),
        }
    }
}

impl From<PointError> for RowError {
    fn from(e: PointError) -> RowError {
        RowError::Point(e)
    }
}

/// Which field a per-entry group carries.
#[derive(Clone, Copy, Debug)]
enum FieldKind {
    /// An integer `count` field.
    Count,
    /// A float `percentage` field.
    Percentage,
}

impl FieldKind {
    fn apply(self, pnt: &mut Point, value: &Value) -> Result<(), RowError> {
        match self {
            FieldKind::Count => {
                let v = value
                    .as_i64()
                    .or_else(|| value.as_f64().map(|f| f as i64))
                    .ok_or(RowError::NotANumber)?;
                pnt.add_int_field("count", v)?;
            }
            FieldKind::Percentage => {
                let v = value.as_f64().ok_or(RowError::NotANumber)?;
                pnt.add_float_field("percentage", v)?;
            }
        }
        Ok(())
    }
}

/// Transform one raw snapshot into points.
///
/// Every point shares `timestamp_ns` and carries `pi_hole_host=host_tag`.
/// Malformed rows are skipped with a warning, tallied in the returned
/// `Harvest`.
pub fn parse_snapshot(
    doc: &Value,
    host_tag: &str,
    timestamp_ns: i64,
) -> Result<Harvest, SnapshotError> {
    if !doc.is_object() {
        return Err(SnapshotError::NotAnObject);
    }
    let mut harvest = Harvest {
        points: Vec::with_capacity(32),
        skipped: 0,
    };

    match summary(doc, host_tag, timestamp_ns) {
        Ok(pnt) => harvest.points.push(pnt),
        Err(e) => harvest.skip("pi_hole", "summary", &e),
    }
    composite_rows(
        doc,
        "top_sources",
        "pi_hole_top_sources",
        FieldKind::Count,
        host_tag,
        timestamp_ns,
        &mut harvest,
    );
    keyed_rows(
        doc,
        "querytypes",
        "pi_hole_query_types",
        "type",
        FieldKind::Percentage,
        host_tag,
        timestamp_ns,
        &mut harvest,
    );
    composite_rows(
        doc,
        "forward_destinations",
        "pi_hole_forward_destinations",
        FieldKind::Percentage,
        host_tag,
        timestamp_ns,
        &mut harvest,
    );
    keyed_rows(
        doc,
        "top_ads",
        "pi_hole_top_ads",
        "host",
        FieldKind::Count,
        host_tag,
        timestamp_ns,
        &mut harvest,
    );
    keyed_rows(
        doc,
        "top_queries",
        "pi_hole_top_queries",
        "host",
        FieldKind::Count,
        host_tag,
        timestamp_ns,
        &mut harvest,
    );
    match gravity(doc, host_tag, timestamp_ns) {
        Ok(pnt) => harvest.points.push(pnt),
        Err(e) => harvest.skip("pi_hole_gravity", "gravity_last_updated", &e),
    }

    Ok(harvest)
}

fn summary(doc: &Value, host_tag: &str, timestamp_ns: i64) -> Result<Point, RowError> {
    let smry = Summary::deserialize(doc).map_err(RowError::Decode)?;
    let mut pnt = Point::new("pi_hole", timestamp_ns);
    pnt.add_tag(HOST_TAG, host_tag)?;
    pnt.add_int_field("ads_blocked_today", smry.ads_blocked_today)?;
    pnt.add_int_field("queries_cached", smry.queries_cached)?;
    pnt.add_int_field("queries_forwarded", smry.queries_forwarded)?;
    pnt.add_int_field("dns_queries_all_replies", smry.dns_queries_all_replies)?;
    pnt.add_int_field("dns_queries_all_types", smry.dns_queries_all_types)?;
    pnt.add_int_field("dns_queries_today", smry.dns_queries_today)?;
    pnt.add_int_field("domains_being_blocked", smry.domains_being_blocked)?;
    pnt.add_int_field("unique_clients", smry.unique_clients)?;
    pnt.add_int_field("unique_domains", smry.unique_domains)?;
    pnt.add_float_field("ads_percentage_today", smry.ads_percentage_today)?;
    Ok(pnt)
}

fn gravity(doc: &Value, host_tag: &str, timestamp_ns: i64) -> Result<Point, RowError> {
    let raw = doc.get("gravity_last_updated").ok_or(RowError::MissingKey)?;
    let grav = GravityLastUpdated::deserialize(raw).map_err(RowError::Decode)?;
    let mut pnt = Point::new("pi_hole_gravity", timestamp_ns);
    pnt.add_tag(HOST_TAG, host_tag)?;
    pnt.add_int_field("updated", grav.absolute)?;
    Ok(pnt)
}

fn group<'a>(doc: &'a Value, key: &str) -> Result<&'a serde_json::Map<String, Value>, RowError> {
    doc.get(key)
        .ok_or(RowError::MissingKey)?
        .as_object()
        .ok_or(RowError::NotAnObject)
}

/// Rows keyed `hostname|ip-address`, split into `host` and `ip_address`
/// tags. A key without exactly one separator is malformed.
fn composite_rows(
    doc: &Value,
    key: &str,
    measurement: &'static str,
    kind: FieldKind,
    host_tag: &str,
    timestamp_ns: i64,
    harvest: &mut Harvest,
) {
    let map = match group(doc, key) {
        Ok(map) => map,
        Err(e) => {
            harvest.skip(measurement, key, &e);
            return;
        }
    };
    for (entry, value) in map.iter() {
        let row = || -> Result<Point, RowError> {
            let parts: Vec<&str> = entry.split('|').collect();
            if parts.len() != 2 {
                return Err(RowError::CompositeKey);
            }
            let mut pnt = Point::new(measurement, timestamp_ns);
            pnt.add_tag("host", parts[0])?;
            pnt.add_tag("ip_address", parts[1])?;
            pnt.add_tag(HOST_TAG, host_tag)?;
            kind.apply(&mut pnt, value)?;
            Ok(pnt)
        };
        match row() {
            Ok(pnt) => harvest.points.push(pnt),
            Err(e) => harvest.skip(measurement, entry, &e),
        }
    }
}

/// Rows whose map key becomes a single tag, `tag_name`, verbatim.
fn keyed_rows(
    doc: &Value,
    key: &str,
    measurement: &'static str,
    tag_name: &'static str,
    kind: FieldKind,
    host_tag: &str,
    timestamp_ns: i64,
    harvest: &mut Harvest,
) {
    let map = match group(doc, key) {
        Ok(map) => map,
        Err(e) => {
            harvest.skip(measurement, key, &e);
            return;
        }
    };
    for (entry, value) in map.iter() {
        let row = || -> Result<Point, RowError> {
            let mut pnt = Point::new(measurement, timestamp_ns);
            pnt.add_tag(tag_name, entry.as_str())?;
            pnt.add_tag(HOST_TAG, host_tag)?;
            kind.apply(&mut pnt, value)?;
            Ok(pnt)
        };
        match row() {
            Ok(pnt) => harvest.points.push(pnt),
            Err(e) => harvest.skip(measurement, entry, &e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use metric;
    use serde_json;

    fn snapshot() -> serde_json::Value {
        serde_json::from_str(
            r#"{
            "domains_being_blocked": 116007,
            "dns_queries_today": 26121,
            "ads_blocked_today": 5,
            "ads_percentage_today": 12.7,
            "unique_domains": 1378,
            "queries_forwarded": 16030,
            "queries_cached": 6218,
            "unique_clients": 22,
            "dns_queries_all_types": 26121,
            "dns_queries_all_replies": 26121,
            "querytypes": {
                "A (IPv4)": 58.2,
                "AAAA (IPv6)": 10.1,
                "PTR": 23.7,
                "SRV": 8.0
            },
            "top_queries": {
                "gateway.local": 4511,
                "registry.example.com": 801
            },
            "top_ads": {
                "adhost.com": 3,
                "telemetry.example.net": 2
            },
            "top_sources": {
                "router|10.0.0.1": 9996,
                "workstation|10.0.0.12": 4511
            },
            "forward_destinations": {
                "blocklist|blocklist": 17.5,
                "resolver.example.org|9.9.9.9": 82.5
            },
            "gravity_last_updated": {
                "file_exists": true,
                "absolute": 1615190276,
                "relative": { "days": 0, "hours": 3, "minutes": 21 }
            }
        }"#,
        ).unwrap()
    }

    fn points_for<'a>(harvest: &'a Harvest, measurement: &str) -> Vec<&'a metric::Point> {
        harvest
            .points
            .iter()
            .filter(|p| p.measurement == measurement)
            .collect()
    }

    #[test]
    fn well_formed_snapshot_yields_every_group() {
        let doc = snapshot();
        let harvest = parse_snapshot(&doc, "pi.local", 10101).unwrap();

        assert_eq!(0, harvest.skipped);
        // root + gravity + 2 sources + 4 query types + 2 destinations
        // + 2 ads + 2 queries
        assert_eq!(14, harvest.points.len());
        assert_eq!(1, points_for(&harvest, "pi_hole").len());
        assert_eq!(1, points_for(&harvest, "pi_hole_gravity").len());
        assert_eq!(2, points_for(&harvest, "pi_hole_top_sources").len());
        assert_eq!(4, points_for(&harvest, "pi_hole_query_types").len());
        assert_eq!(
            2,
            points_for(&harvest, "pi_hole_forward_destinations").len()
        );
        assert_eq!(2, points_for(&harvest, "pi_hole_top_ads").len());
        assert_eq!(2, points_for(&harvest, "pi_hole_top_queries").len());

        for pnt in &harvest.points {
            assert_eq!(10101, pnt.timestamp_ns);
            assert!(!pnt.is_empty());
            assert!(
                pnt.tags()
                    .any(|&(ref k, ref v)| k == HOST_TAG && v == "pi.local")
            );
        }
    }

    #[test]
    fn scenario_root_and_top_ads() {
        let doc = snapshot();
        let harvest = parse_snapshot(&doc, "pi.local", 10101).unwrap();

        let lines: Vec<String> =
            harvest.points.iter().map(metric::render).collect();
        assert!(
            lines
                .iter()
                .any(|l| l.starts_with("pi_hole,pi_hole_host=pi.local ")
                    && l.contains("ads_blocked_today=5i")
                    && l.ends_with(" 10101"))
        );
        assert!(lines.contains(
            &"pi_hole_top_ads,host=adhost.com,pi_hole_host=pi.local \
              count=3i 10101"
                .to_string()
        ));
    }

    #[test]
    fn composite_key_splits_into_host_and_ip() {
        let doc = snapshot();
        let harvest = parse_snapshot(&doc, "pi.local", 10101).unwrap();

        let sources = points_for(&harvest, "pi_hole_top_sources");
        let router = sources
            .iter()
            .find(|p| p.tags().any(|&(ref k, ref v)| k == "host" && v == "router"))
            .expect("no router row");
        assert!(
            router
                .tags()
                .any(|&(ref k, ref v)| k == "ip_address" && v == "10.0.0.1")
        );
    }

    #[test]
    fn malformed_composite_key_skips_that_row_only() {
        let mut doc = snapshot();
        {
            let sources = doc
                .get_mut("top_sources")
                .unwrap()
                .as_object_mut()
                .unwrap();
            sources.insert("no-separator-here".to_string(), 3.into());
            sources.insert("too|many|separators".to_string(), 4.into());
        }
        let harvest = parse_snapshot(&doc, "pi.local", 10101).unwrap();

        assert_eq!(2, harvest.skipped);
        assert_eq!(2, points_for(&harvest, "pi_hole_top_sources").len());
        assert_eq!(14, harvest.points.len());
    }

    #[test]
    fn empty_composite_half_skips_that_row() {
        let mut doc = snapshot();
        {
            let sources = doc
                .get_mut("top_sources")
                .unwrap()
                .as_object_mut()
                .unwrap();
            sources.insert("|10.0.0.9".to_string(), 3.into());
        }
        let harvest = parse_snapshot(&doc, "pi.local", 10101).unwrap();

        assert_eq!(1, harvest.skipped);
        assert_eq!(2, points_for(&harvest, "pi_hole_top_sources").len());
    }

    #[test]
    fn missing_summary_key_skips_root_row_only() {
        let mut doc = snapshot();
        doc.as_object_mut().unwrap().remove("ads_blocked_today");
        let harvest = parse_snapshot(&doc, "pi.local", 10101).unwrap();

        assert_eq!(1, harvest.skipped);
        assert!(points_for(&harvest, "pi_hole").is_empty());
        assert_eq!(2, points_for(&harvest, "pi_hole_top_ads").len());
        assert_eq!(13, harvest.points.len());
    }

    #[test]
    fn non_numeric_entry_skips_that_row() {
        let mut doc = snapshot();
        {
            let ads = doc.get_mut("top_ads").unwrap().as_object_mut().unwrap();
            ads.insert("weird.example.com".to_string(), "three".into());
        }
        let harvest = parse_snapshot(&doc, "pi.local", 10101).unwrap();

        assert_eq!(1, harvest.skipped);
        assert_eq!(2, points_for(&harvest, "pi_hole_top_ads").len());
    }

    #[test]
    fn missing_gravity_is_one_skip() {
        let mut doc = snapshot();
        doc.as_object_mut().unwrap().remove("gravity_last_updated");
        let harvest = parse_snapshot(&doc, "pi.local", 10101).unwrap();

        assert_eq!(1, harvest.skipped);
        assert!(points_for(&harvest, "pi_hole_gravity").is_empty());
    }

    #[test]
    fn non_object_snapshot_is_fatal_to_the_cycle() {
        let doc: serde_json::Value = serde_json::from_str("[1, 2, 3]").unwrap();
        assert!(parse_snapshot(&doc, "pi.local", 10101).is_err());
    }
}
