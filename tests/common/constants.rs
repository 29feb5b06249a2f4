//! Shared constants for integration tests
//!
//! When the seeded catalog changes, update only this file and `fixtures.rs`.

#![allow(dead_code)]

/// "Paranoid" by Black Sabbath
pub const TRACK_1_ID: &str = "TRAAAAW128F429D538";

/// "PARANOID ANDROID" by Radiohead
pub const TRACK_2_ID: &str = "TRAAABD128F429CF47";

/// "paranoid" by Casual, lowercase on purpose
pub const TRACK_3_ID: &str = "TRAAADZ128F9348C2E";

/// "Karma Police" by Radiohead, the only song without a feature vector
pub const TRACK_4_ID: &str = "TRAAAEF128F4273421";

/// Track id never inserted
pub const UNKNOWN_TRACK_ID: &str = "TRZZZZZ000000000000";

pub const SEEDED_SONGS: usize = 4;
pub const SEEDED_FEATURES: usize = 3;
