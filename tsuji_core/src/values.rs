//! Route values: the per-request mapping from parameter names to values.
//!
//! Keys are compared ASCII-case-insensitively but the map preserves
//! insertion order, which keeps query-string emission deterministic.
//! The map supports a cheap snapshot/restore protocol (`mark` /
//! `rewind`) so a failed match candidate can be rolled back without
//! copying the map.

use std::borrow::Cow;

/// A single value cell inside a [`RouteValues`] map.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteValue {
    Str(String),
    Int(i64),
    List(Vec<String>),
    Null,
}

impl RouteValue {
    /// Text rendering used for path emission and constraint checks.
    /// Lists and nulls have no single text form.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RouteValue::Str(s) => Some(Cow::Borrowed(s)),
            RouteValue::Int(n) => Some(Cow::Owned(n.to_string())),
            RouteValue::List(_) | RouteValue::Null => None,
        }
    }
}

impl From<&str> for RouteValue {
    fn from(value: &str) -> Self {
        RouteValue::Str(value.to_string())
    }
}

impl From<String> for RouteValue {
    fn from(value: String) -> Self {
        RouteValue::Str(value)
    }
}

impl From<i64> for RouteValue {
    fn from(value: i64) -> Self {
        RouteValue::Int(value)
    }
}

impl From<Vec<String>> for RouteValue {
    fn from(value: Vec<String>) -> Self {
        RouteValue::List(value)
    }
}

/// Snapshot handle returned by [`RouteValues::mark`].
#[derive(Debug, Clone, Copy)]
pub struct ValuesMark(usize);

/// Insertion-ordered, case-insensitive parameter map.
///
/// Backed by a plain vector; route value maps hold a handful of entries,
/// so a linear scan beats hashing here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteValues {
    slots: Vec<(String, RouteValue)>,
}

impl RouteValues {
    pub fn new() -> Self {
        RouteValues { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&RouteValue> {
        self.slots
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace a value. Replacement keeps the original key slot
    /// so insertion order is stable.
    pub fn set<K: Into<String>, V: Into<RouteValue>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();
        match self.slots.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = value,
            None => self.slots.push((name, value)),
        }
    }

    /// Take a snapshot of the current length. Everything appended after
    /// the mark is discarded by [`rewind`](Self::rewind).
    pub fn mark(&self) -> ValuesMark {
        ValuesMark(self.slots.len())
    }

    /// Drop everything appended since `mark`. This is a truncate, never a
    /// copy; match candidates only append, so truncation restores the
    /// pre-attempt state exactly.
    pub fn rewind(&mut self, mark: ValuesMark) {
        self.slots.truncate(mark.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteValue)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<RouteValue>> FromIterator<(K, V)> for RouteValues {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut values = RouteValues::new();
        for (k, v) in iter {
            values.set(k, v);
        }
        values
    }
}
