//! Resolver origin binding: no network at all, just a callable. The
//! "origin" is a dummy address that is never actually dialed.

pub const DUMMY_ORIGIN: &str = "http://localhost:0";
