//! Percent-encoding helpers for URL emission.
//!
//! Two safe sets are defined here, one for path segments and one for query
//! components. Everything outside the safe set is percent-encoded with
//! uppercase hex digits (`%20`, `%25`, `%23`).

use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Bytes escaped inside a single path segment.
///
/// The allowed set is the RFC 3986 `pchar` class: unreserved characters,
/// sub-delims, `:` and `@`. A `/` is never produced unescaped because the
/// caller encodes one segment at a time.
pub const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Bytes escaped inside a query key or value.
///
/// `&`, `=`, `+` and `#` stay escaped so the pair structure of the query
/// string remains unambiguous; `/` and `?` are legal in query text.
pub const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b',')
    .remove(b';')
    .remove(b':')
    .remove(b'@')
    .remove(b'/')
    .remove(b'?');

/// Encode one path segment. Returns a borrowed string when nothing needs
/// escaping.
pub fn encode_path_segment(segment: &str) -> Cow<'_, str> {
    utf8_percent_encode(segment, PATH_SEGMENT).into()
}

/// Encode a query key or value.
pub fn encode_query_component(component: &str) -> Cow<'_, str> {
    utf8_percent_encode(component, QUERY_COMPONENT).into()
}
