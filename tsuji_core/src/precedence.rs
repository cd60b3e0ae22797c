//! Inbound route precedence: a total order that makes match selection
//! deterministic across every engine.

use std::cmp::Ordering;

use crate::template::segment::RouteTemplate;
use crate::values::RouteValues;

/// The ordering key of a route template. Smaller compares as more
/// specific and wins the match.
///
/// Each segment contributes one digit, left to right: literal `1`,
/// complex `2`, constrained parameter `3`, unconstrained parameter `4`,
/// catch-all `5`. Digit sequences compare lexicographically, which is the
/// same order as the decimal expansion `d0.d1d2…` (digits are never
/// zero). Elidable trailing segments and defaulted parameters add a
/// fractional bump compared after the digits, so `{id}` outranks `{id?}`
/// and `{id=1}` at equal shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precedence {
    digits: Vec<u8>,
    fraction: u32,
}

impl Precedence {
    /// Compute the key for `template`. `defaults` is the route's merged
    /// default map and `is_constrained` reports whether a parameter has
    /// any constraint, inline or out-of-band.
    pub fn compute<F>(template: &RouteTemplate, defaults: &RouteValues, is_constrained: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let segments = template.segments();
        let mut digits = Vec::with_capacity(segments.len());
        for segment in segments {
            let digit = if segment.single_literal().is_some() {
                1
            } else if segment.is_complex() {
                2
            } else if let Some(p) = segment.single_parameter() {
                if p.is_catch_all {
                    5
                } else if !p.constraints.is_empty() || is_constrained(&p.name) {
                    3
                } else {
                    4
                }
            } else {
                // segments are never empty; unreachable shape ranks last
                5
            };
            digits.push(digit);
        }

        let mut fraction = 0u32;
        let mut i = segments.len();
        while i > 0 && segments[i - 1].is_elidable(defaults) {
            fraction += 1;
            i -= 1;
        }
        for p in template.parameters() {
            if p.default.is_some() || defaults.contains(&p.name) {
                fraction += 1;
            }
        }

        Precedence { digits, fraction }
    }

    pub fn digits(&self) -> &[u8] {
        &self.digits
    }
}

impl Ord for Precedence {
    fn cmp(&self, other: &Self) -> Ordering {
        self.digits
            .cmp(&other.digits)
            .then(self.fraction.cmp(&other.fraction))
    }
}

impl PartialOrd for Precedence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::Precedence;
    use crate::template::parser::parse;
    use crate::values::RouteValues;

    fn key(template: &str) -> Precedence {
        let template = parse(template).unwrap();
        Precedence::compute(&template, &RouteValues::new(), |_| false)
    }

    fn constrained_key(template: &str) -> Precedence {
        let template = parse(template).unwrap();
        Precedence::compute(&template, &RouteValues::new(), |_| true)
    }

    #[test]
    fn literal_beats_parameter_beats_catch_all() {
        assert!(key("home") < key("{controller}"));
        assert!(key("{controller}") < key("{*rest}"));
        assert!(constrained_key("{id}") < key("{id}"));
    }

    #[test]
    fn inline_constraint_ranks_between_literal_and_parameter() {
        assert!(key("home") < key("{id:int}"));
        assert!(key("{id:int}") < key("{id}"));
    }

    #[test]
    fn leading_segments_dominate() {
        // "a/{x}" is more specific than "{x}/a": the first digit decides
        assert!(key("a/{x}") < key("{x}/a"));
        // a longer template with an equal prefix ranks after the prefix
        assert!(key("a") < key("a/b"));
        assert!(key("a/b") < key("{x}"));
    }

    #[test]
    fn optional_and_default_add_fraction() {
        assert!(key("{controller}/{action}") < key("{controller}/{action?}"));
        assert!(key("{id}") < key("{id=1}"));
        assert_eq!(key("{a}/{b}").digits(), &[4, 4]);
    }

    #[test]
    fn complex_segment_digit() {
        assert!(key("page-{num}") < key("{num}"));
        assert!(key("literal") < key("page-{num}"));
    }
}
