//! Per-parameter constraints, evaluated on the inbound and outbound
//! paths. A constraint never raises: a value either satisfies it or the
//! candidate route is vetoed.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::debug_log;
use crate::values::RouteValues;

/// Which way the routing machinery is running when a constraint fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Matching a request path to an endpoint.
    Inbound,
    /// Generating a URL from values.
    Outbound,
}

/// A predicate attached to a route parameter.
///
/// `matches` receives the parameter name and the whole values map rather
/// than a single value so implementations can inspect context. A missing
/// value satisfies every constraint; constraints restrict values, they do
/// not require them.
pub trait RouteConstraint: Send + Sync {
    fn matches(&self, name: &str, values: &RouteValues, direction: Direction) -> bool;
}

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid pattern is valid")
});

/// The constraint forms recognised in inline template text.
#[derive(Debug, Clone)]
pub enum KnownConstraint {
    /// `int`: a 64-bit signed integer.
    Int,
    /// `bool`: `true` or `false`, case-insensitive.
    Bool,
    /// `alpha`: ASCII letters only, at least one.
    Alpha,
    /// `uuid`: canonical 8-4-4-4-12 hex form.
    Uuid,
    /// `length(n)` / `length(min,max)`: character count bounds.
    Length(usize, usize),
    /// `minlength(n)`
    MinLength(usize),
    /// `maxlength(n)`
    MaxLength(usize),
    /// `min(n)`: integer lower bound.
    Min(i64),
    /// `max(n)`: integer upper bound.
    Max(i64),
    /// `range(min,max)`: inclusive integer bounds.
    Range(i64, i64),
    /// `regex(expr)`: full-match against an anchored expression.
    Pattern(Regex),
}

impl KnownConstraint {
    /// Resolve an inline constraint expression like `int`, `minlength(2)`
    /// or `regex(^\d+$)`. Returns `None` for unrecognised names or
    /// malformed arguments; the route-set build turns that into an error.
    pub fn resolve(expr: &str) -> Option<Self> {
        let (name, arg) = match expr.find('(') {
            Some(open) => {
                let close = expr.rfind(')')?;
                if close != expr.len() - 1 || close < open {
                    return None;
                }
                (&expr[..open], Some(&expr[open + 1..close]))
            }
            None => (expr, None),
        };

        match (name, arg) {
            ("int", None) => Some(KnownConstraint::Int),
            ("bool", None) => Some(KnownConstraint::Bool),
            ("alpha", None) => Some(KnownConstraint::Alpha),
            ("uuid", None) => Some(KnownConstraint::Uuid),
            ("length", Some(arg)) => match arg.split_once(',') {
                Some((min, max)) => Some(KnownConstraint::Length(
                    min.trim().parse().ok()?,
                    max.trim().parse().ok()?,
                )),
                None => {
                    let n: usize = arg.trim().parse().ok()?;
                    Some(KnownConstraint::Length(n, n))
                }
            },
            ("minlength", Some(arg)) => Some(KnownConstraint::MinLength(arg.trim().parse().ok()?)),
            ("maxlength", Some(arg)) => Some(KnownConstraint::MaxLength(arg.trim().parse().ok()?)),
            ("min", Some(arg)) => Some(KnownConstraint::Min(arg.trim().parse().ok()?)),
            ("max", Some(arg)) => Some(KnownConstraint::Max(arg.trim().parse().ok()?)),
            ("range", Some(arg)) => {
                let (min, max) = arg.split_once(',')?;
                Some(KnownConstraint::Range(
                    min.trim().parse().ok()?,
                    max.trim().parse().ok()?,
                ))
            }
            ("regex", Some(arg)) => {
                let anchored = format!("^(?:{})$", arg);
                Some(KnownConstraint::Pattern(Regex::new(&anchored).ok()?))
            }
            _ => None,
        }
    }

    fn check_text(&self, text: &str) -> bool {
        match self {
            KnownConstraint::Int => text.parse::<i64>().is_ok(),
            KnownConstraint::Bool => text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false"),
            KnownConstraint::Alpha => !text.is_empty() && text.chars().all(|c| c.is_ascii_alphabetic()),
            KnownConstraint::Uuid => UUID_PATTERN.is_match(text),
            KnownConstraint::Length(min, max) => {
                let n = text.chars().count();
                n >= *min && n <= *max
            }
            KnownConstraint::MinLength(min) => text.chars().count() >= *min,
            KnownConstraint::MaxLength(max) => text.chars().count() <= *max,
            KnownConstraint::Min(min) => text.parse::<i64>().is_ok_and(|n| n >= *min),
            KnownConstraint::Max(max) => text.parse::<i64>().is_ok_and(|n| n <= *max),
            KnownConstraint::Range(min, max) => {
                text.parse::<i64>().is_ok_and(|n| n >= *min && n <= *max)
            }
            KnownConstraint::Pattern(pattern) => pattern.is_match(text),
        }
    }
}

impl RouteConstraint for KnownConstraint {
    fn matches(&self, name: &str, values: &RouteValues, _direction: Direction) -> bool {
        match values.get(name).and_then(|v| v.as_text()) {
            Some(text) => self.check_text(&text),
            // absent values pass; requiredness is the matcher's business
            None => true,
        }
    }
}

/// The resolved constraints of one route, in declaration order.
///
/// Evaluation is conjunctive and short-circuits on the first rejection,
/// which is logged at debug level for diagnostics.
#[derive(Clone, Default)]
pub struct ConstraintSet {
    items: Vec<ConstraintItem>,
}

#[derive(Clone)]
struct ConstraintItem {
    parameter: String,
    label: String,
    check: Arc<dyn RouteConstraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        ConstraintSet { items: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push<L: Into<String>>(&mut self, parameter: &str, label: L, check: Arc<dyn RouteConstraint>) {
        self.items.push(ConstraintItem {
            parameter: parameter.to_string(),
            label: label.into(),
            check,
        });
    }

    /// Whether a parameter has at least one constraint attached.
    pub fn constrains(&self, parameter: &str) -> bool {
        self.items.iter().any(|i| i.parameter.eq_ignore_ascii_case(parameter))
    }

    pub fn check(&self, values: &RouteValues, direction: Direction) -> bool {
        for item in &self.items {
            if !item.check.matches(&item.parameter, values, direction) {
                debug_log!(
                    "constraint '{}' rejected parameter '{}'",
                    item.label,
                    item.parameter
                );
                return false;
            }
        }
        true
    }
}

impl std::fmt::Debug for ConstraintSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<&str> = self.items.iter().map(|i| i.label.as_str()).collect();
        f.debug_struct("ConstraintSet").field("items", &labels).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, KnownConstraint, RouteConstraint};
    use crate::values::RouteValues;

    fn passes(constraint: &KnownConstraint, value: &str) -> bool {
        let mut values = RouteValues::new();
        values.set("p", value);
        constraint.matches("p", &values, Direction::Inbound)
    }

    #[test]
    fn int_constraint() {
        let c = KnownConstraint::resolve("int").unwrap();
        assert!(passes(&c, "123"));
        assert!(passes(&c, "-7"));
        assert!(!passes(&c, "abc"));
        assert!(!passes(&c, "1.5"));
    }

    #[test]
    fn uuid_constraint() {
        let c = KnownConstraint::resolve("uuid").unwrap();
        assert!(passes(&c, "550e8400-e29b-41d4-a716-446655440000"));
        assert!(passes(&c, "550E8400-E29B-41D4-A716-446655440000"));
        assert!(!passes(&c, "550e8400-e29b-41d4-a716"));
    }

    #[test]
    fn length_family() {
        let c = KnownConstraint::resolve("length(2,4)").unwrap();
        assert!(!passes(&c, "a"));
        assert!(passes(&c, "ab"));
        assert!(passes(&c, "abcd"));
        assert!(!passes(&c, "abcde"));

        let c = KnownConstraint::resolve("length(3)").unwrap();
        assert!(passes(&c, "abc"));
        assert!(!passes(&c, "ab"));

        let c = KnownConstraint::resolve("minlength(2)").unwrap();
        assert!(!passes(&c, "a"));
        assert!(passes(&c, "ab"));

        let c = KnownConstraint::resolve("maxlength(2)").unwrap();
        assert!(passes(&c, "ab"));
        assert!(!passes(&c, "abc"));
    }

    #[test]
    fn numeric_bounds() {
        let c = KnownConstraint::resolve("range(1,10)").unwrap();
        assert!(passes(&c, "1"));
        assert!(passes(&c, "10"));
        assert!(!passes(&c, "0"));
        assert!(!passes(&c, "11"));
        assert!(!passes(&c, "x"));

        let c = KnownConstraint::resolve("min(5)").unwrap();
        assert!(passes(&c, "5"));
        assert!(!passes(&c, "4"));

        let c = KnownConstraint::resolve("max(5)").unwrap();
        assert!(passes(&c, "5"));
        assert!(!passes(&c, "6"));
    }

    #[test]
    fn regex_is_anchored() {
        let c = KnownConstraint::resolve(r"regex(\d{4})").unwrap();
        assert!(passes(&c, "2024"));
        assert!(!passes(&c, "x2024"));
        assert!(!passes(&c, "20245"));
    }

    #[test]
    fn absent_value_passes() {
        let c = KnownConstraint::resolve("int").unwrap();
        let values = RouteValues::new();
        assert!(c.matches("missing", &values, Direction::Inbound));
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        assert!(KnownConstraint::resolve("flavour").is_none());
        assert!(KnownConstraint::resolve("min(a)").is_none());
        assert!(KnownConstraint::resolve("length(").is_none());
    }
}
