//! Per-template matching: does one concrete path fit one template, and if
//! so, which values does it bind?

use crate::template::segment::{RoutePart, RouteSegment, RouteTemplate};
use crate::values::RouteValues;

/// Matches paths against a single [`RouteTemplate`] and extracts values.
///
/// The matcher owns the merged default map (inline `{name=value}` defaults
/// overlaid with the route's default dictionary; the dictionary wins on
/// conflict) and the precomputed required-segment count.
///
/// On success, captures and unoverridden defaults are appended to the
/// caller's values map. On failure the map is left exactly as it was.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    template: RouteTemplate,
    defaults: RouteValues,
    required: usize,
}

impl TemplateMatcher {
    pub fn new(template: RouteTemplate, route_defaults: RouteValues) -> Self {
        let mut defaults = RouteValues::new();
        for p in template.parameters() {
            if let Some(d) = &p.default {
                defaults.set(p.name.clone(), d.clone());
            }
        }
        for (k, v) in route_defaults.iter() {
            defaults.set(k, v.clone());
        }
        let required = template.required_segments(&defaults);
        TemplateMatcher { template, defaults, required }
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    pub fn defaults(&self) -> &RouteValues {
        &self.defaults
    }

    /// Number of path segments this template cannot do without.
    pub fn required_segments(&self) -> usize {
        self.required
    }

    /// Try to match `path` (must start with `/`). A single trailing slash
    /// is accepted for any path that would match without it.
    pub fn try_match(&self, path: &str, values: &mut RouteValues) -> bool {
        let mark = values.mark();
        if self.try_match_inner(path, values) {
            true
        } else {
            values.rewind(mark);
            false
        }
    }

    fn try_match_inner(&self, path: &str, values: &mut RouteValues) -> bool {
        let mut segs = split_path(path);

        let template_segments = self.template.segments();
        let total = template_segments.len();
        let has_catch_all = template_segments.last().is_some_and(|s| s.is_catch_all());

        if segs.len() < self.required {
            return false;
        }
        if !has_catch_all && segs.len() > total {
            return false;
        }

        for (i, segment) in template_segments.iter().enumerate() {
            if segment.is_catch_all() {
                // the remaining residue, slashes included, verbatim
                if i < segs.len() {
                    let name = segment.single_parameter().map(|p| p.name.clone());
                    if let Some(name) = name {
                        values.set(name, segs[i..].join("/"));
                    }
                }
                segs.clear();
                break;
            }

            if i >= segs.len() {
                // elided trailing segment; the defaults overlay below
                // fills in whatever value it carries
                continue;
            }

            let text = segs[i];
            if segment.is_simple() {
                match &segment.parts[0] {
                    RoutePart::Literal(lit) => {
                        if !lit.eq_ignore_ascii_case(text) {
                            return false;
                        }
                    }
                    RoutePart::Parameter(p) => {
                        if text.is_empty() {
                            return false;
                        }
                        values.set(p.name.clone(), text);
                    }
                    RoutePart::Separator(_) => return false,
                }
            } else if !match_complex(segment, text, values) {
                return false;
            }
        }

        for (name, value) in self.defaults.iter() {
            if !values.contains(name) {
                values.set(name, value.clone());
            }
        }
        true
    }
}

/// Split a request path into segments. The leading `/` is skipped and a
/// single trailing empty residue (trailing slash) is dropped; interior
/// empty segments are kept and will fail to match anything.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Vec::new();
    }
    let mut segs: Vec<&str> = trimmed.split('/').collect();
    if segs.last() == Some(&"") {
        segs.pop();
    }
    segs
}

// Match a complex segment (mixed literal/parameter parts) against one
// path segment. Literal parts anchor the scan; each parameter captures
// the non-empty span up to the next anchor, searched from the right so a
// final parameter is as long as possible. A trailing separator+optional
// pair is peeled off first: when the separator is absent, the optional
// stays unbound ("report" matches "{name}.{ext?}"); when it is present
// the capture must be non-empty ("report." does not).
fn match_complex(segment: &RouteSegment, text: &str, values: &mut RouteValues) -> bool {
    let mut parts = segment.parts.as_slice();
    let mut text = text;

    if let [head @ .., RoutePart::Separator(sep), RoutePart::Parameter(p)] = parts {
        if p.is_optional {
            if let Some(pos) = rfind_ignore_ascii_case(text, sep) {
                let capture = &text[pos + sep.len()..];
                if capture.is_empty() {
                    return false;
                }
                values.set(p.name.clone(), capture);
                text = &text[..pos];
            }
            parts = head;
        }
    }

    let mut pos = 0usize;
    let mut idx = 0usize;
    while idx < parts.len() {
        match &parts[idx] {
            RoutePart::Literal(lit) | RoutePart::Separator(lit) => {
                if !starts_with_ignore_ascii_case(&text[pos..], lit) {
                    return false;
                }
                pos += lit.len();
                idx += 1;
            }
            RoutePart::Parameter(p) => {
                let capture_end = if idx + 1 < parts.len() {
                    // adjacent parameters have no anchor between them and
                    // can never match
                    let Some(anchor) = parts[idx + 1].literal_text() else {
                        return false;
                    };
                    match rfind_ignore_ascii_case(&text[pos..], anchor) {
                        Some(rel) => pos + rel,
                        None => return false,
                    }
                } else {
                    text.len()
                };
                if capture_end == pos {
                    return false;
                }
                values.set(p.name.clone(), &text[pos..capture_end]);
                pos = capture_end;
                idx += 1;
            }
        }
    }

    pos == text.len()
}

// Byte-wise comparison with ASCII folding: non-ASCII bytes must match
// exactly, so a match always spans whole characters.
fn starts_with_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.as_bytes()[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
}

// Rightmost case-insensitive occurrence of `needle`, as a byte offset.
fn rfind_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    let mut start = h.len() - n.len() + 1;
    while start > 0 {
        start -= 1;
        if h[start..start + n.len()].eq_ignore_ascii_case(n) && haystack.is_char_boundary(start) {
            return Some(start);
        }
    }
    None
}
