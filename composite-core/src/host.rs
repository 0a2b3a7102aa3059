// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapters for the pieces of the surrounding system this crate does not
//! own: atomic scalar parsing, quote escaping, and diagnostic reporting.
//!
//! A real embedding is expected to supply its own [Host] that defers to its
//! own locale-aware, unit-aware parsers. [DefaultHost] is a reasonable
//! ASCII/C-locale stand-in used by the CLI demo and by this crate's own
//! tests.

use crate::error::Diagnostic;
use log::warn;

/// External collaborators for parsing and formatting the four atom kinds.
pub trait Host {
    /// Parse a boolean from one of the conventional textual spellings
    /// (`true`/`false`, `yes`/`no`, `on`/`off`, `1`/`0`).
    fn parse_bool(&self, text: &str) -> Option<bool>;

    /// Parse an integer, honoring an optional trailing unit suffix
    /// (`kB`, `MB`, `GB`, `s`, `min`, `h`, ...). Unrecognized suffixes
    /// cause the parse to fail rather than being silently ignored.
    fn parse_int(&self, text: &str) -> Option<i32>;

    /// Parse a floating point value.
    fn parse_real(&self, text: &str) -> Option<f64>;

    /// Escape a string for embedding inside a single-quoted composite
    /// grammar token: each `'` is doubled (`''`).
    fn escape_quotes(&self, text: &str) -> String;

    /// Reverse of [Self::escape_quotes].
    fn unescape_quotes(&self, text: &str) -> String;
}

/// Sink for non-fatal diagnostics raised while parsing or validating a value.
///
/// Fatal errors are always returned as a [crate::error::CompositeError];
/// this trait exists for the softer "here's what's wrong, but we're still
/// going to report a normal error to the caller" reporting path the
/// original's `ereport` call serves.
pub trait Diagnostics {
    fn report(&self, diagnostic: &Diagnostic);
}

/// A [Diagnostics] sink that forwards to the `log` facade at `warn!`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, diagnostic: &Diagnostic) {
        warn!("{diagnostic}");
    }
}

/// A reasonable ASCII/C-locale [Host] implementation.
///
/// Suitable for tests and the CLI demo. A production embedding backed by a
/// real configuration subsystem should supply its own [Host] that reuses
/// its existing atomic parsers instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHost;

const UNIT_SUFFIXES: &[(&str, i64)] = &[
    ("kB", 1024),
    ("MB", 1024 * 1024),
    ("GB", 1024 * 1024 * 1024),
    ("s", 1),
    ("min", 60),
    ("h", 3600),
];

impl Host for DefaultHost {
    fn parse_bool(&self, text: &str) -> Option<bool> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    fn parse_int(&self, text: &str) -> Option<i32> {
        let text = text.trim();

        if let Ok(value) = text.parse::<i32>() {
            return Some(value);
        }

        for (suffix, multiplier) in UNIT_SUFFIXES {
            if let Some(number) = text.strip_suffix(suffix) {
                let base: i64 = number.trim().parse().ok()?;
                return i32::try_from(base.checked_mul(*multiplier)?).ok();
            }
        }

        None
    }

    fn parse_real(&self, text: &str) -> Option<f64> {
        text.trim().parse().ok()
    }

    fn escape_quotes(&self, text: &str) -> String {
        text.replace('\'', "''")
    }

    fn unescape_quotes(&self, text: &str) -> String {
        text.replace("''", "'")
    }
}
