//! Parsers for the wire formats hawking consumes.

pub mod pihole;
