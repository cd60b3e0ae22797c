//! The route template model: parts, segments, and the template itself.

use fnv::FnvHashMap;

use crate::values::RouteValues;

/// A named placeholder inside a template, e.g. `{id?}` or `{*rest}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPart {
    pub name: String,
    pub is_optional: bool,
    pub is_catch_all: bool,
    pub default: Option<String>,
    /// Inline constraint expressions, in declaration order. Resolved to
    /// checks when a route set is built.
    pub constraints: Vec<String>,
}

/// One fragment of a segment.
///
/// `Separator` is a literal that sits between a parameter and a trailing
/// optional parameter in a complex segment (`{name}.{ext?}`); it is elided
/// from generated links when the optional parameter is unbound.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutePart {
    Literal(String),
    Parameter(ParameterPart),
    Separator(String),
}

impl RoutePart {
    pub fn parameter(&self) -> Option<&ParameterPart> {
        match self {
            RoutePart::Parameter(p) => Some(p),
            _ => None,
        }
    }

    pub fn literal_text(&self) -> Option<&str> {
        match self {
            RoutePart::Literal(s) | RoutePart::Separator(s) => Some(s),
            RoutePart::Parameter(_) => None,
        }
    }
}

/// The portion of a template between `/` separators. Always non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSegment {
    pub parts: Vec<RoutePart>,
}

impl RouteSegment {
    pub fn is_simple(&self) -> bool {
        self.parts.len() == 1
    }

    /// A complex segment mixes several parts, e.g. `page-{num}`.
    pub fn is_complex(&self) -> bool {
        self.parts.len() > 1
    }

    /// The single parameter of a simple parameter segment.
    pub fn single_parameter(&self) -> Option<&ParameterPart> {
        match self.parts.as_slice() {
            [RoutePart::Parameter(p)] => Some(p),
            _ => None,
        }
    }

    /// The single literal of a simple literal segment.
    pub fn single_literal(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [RoutePart::Literal(s)] => Some(s),
            _ => None,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.single_parameter().is_some_and(|p| p.is_optional)
    }

    pub fn is_catch_all(&self) -> bool {
        self.single_parameter().is_some_and(|p| p.is_catch_all)
    }

    /// Whether a path may omit this segment entirely: optional, catch-all,
    /// or defaulted simple parameter segments.
    pub fn is_elidable(&self, defaults: &RouteValues) -> bool {
        match self.single_parameter() {
            Some(p) => {
                p.is_optional || p.is_catch_all || p.default.is_some() || defaults.contains(&p.name)
            }
            None => false,
        }
    }
}

/// A parsed route template.
///
/// `text` is the canonical form: leading `/` and `~/` stripped. Parameter
/// names are unique case-insensitively; `parameters` maps the lowercased
/// name to the index of the segment that declares it.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    text: String,
    segments: Vec<RouteSegment>,
    parameters: FnvHashMap<String, usize>,
}

impl RouteTemplate {
    pub(crate) fn new(text: String, segments: Vec<RouteSegment>) -> Self {
        let mut parameters = FnvHashMap::default();
        for (idx, segment) in segments.iter().enumerate() {
            for part in &segment.parts {
                if let RoutePart::Parameter(p) = part {
                    parameters.insert(p.name.to_ascii_lowercase(), idx);
                }
            }
        }
        RouteTemplate { text, segments, parameters }
    }

    /// Parse a template string. Equivalent to [`parse`](super::parser::parse).
    pub fn parse(input: &str) -> Result<Self, super::parser::TemplateError> {
        super::parser::parse(input)
    }

    /// Canonical template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    /// Index of the segment declaring `name`, case-insensitive.
    pub fn parameter_segment(&self, name: &str) -> Option<usize> {
        self.parameters.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(&name.to_ascii_lowercase())
    }

    /// All parameters in left-to-right declaration order.
    pub fn parameters(&self) -> impl Iterator<Item = &ParameterPart> {
        self.segments
            .iter()
            .flat_map(|s| s.parts.iter())
            .filter_map(|p| p.parameter())
    }

    /// Whether any segment is complex (mixed literal/parameter parts).
    pub fn has_complex_segment(&self) -> bool {
        self.segments.iter().any(|s| s.is_complex())
    }

    pub fn catch_all(&self) -> Option<&ParameterPart> {
        self.parameters().find(|p| p.is_catch_all)
    }

    /// Number of leading segments a path must supply; the trailing run of
    /// elidable segments may be omitted.
    pub fn required_segments(&self, defaults: &RouteValues) -> usize {
        let mut required = self.segments.len();
        while required > 0 && self.segments[required - 1].is_elidable(defaults) {
            required -= 1;
        }
        required
    }
}

impl std::fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
