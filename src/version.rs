#![allow(clippy::doc_markdown)] // Generated file contains OPT_LEVEL without backticks
#![allow(dead_code)]

use std::sync::LazyLock;

include!(concat!(env!("OUT_DIR"), "/built.rs"));

/// Version of the software including the build profile when it is not a
/// release build (e.g. `0.1.0-debug`).
pub static VERSION: LazyLock<String> = LazyLock::new(|| {
    if PROFILE == "release" { PKG_VERSION.to_string() } else { format!("{PKG_VERSION}-{PROFILE}") }
});
