use crate::template::segment::RouteTemplate;

pub(self) mod lexer;
pub(self) mod parser;

/// Why a template failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateErrorKind {
    // "{}" or "{?}": a parameter group with no name.
    EmptyName,
    // The same parameter name declared twice (case-insensitive).
    DuplicateName(String),
    // "{" without "}", a stray "}", or malformed brace-group content.
    UnbalancedBrace,
    // A catch-all that is not the sole part of the final segment.
    CatchAllNotLast,
    // An optional parameter followed by a non-optional segment, or an
    // optional part in a complex segment without a preceding separator.
    OptionalNotTrailing,
    // "{*rest=x}": catch-alls cannot carry an inline default.
    DefaultOnCatchAll,
    // "{*rest?}": catch-alls cannot be marked optional.
    OptionalOnCatchAll,
    // "{id=5?}": a defaulted parameter cannot also be optional.
    OptionalWithDefault,
    // "a//b" or "a/": segments may not be empty.
    EmptySegment,
}

/// A template parse error. `offset` is a character offset into the
/// canonical template text (after the leading `/` or `~/` is stripped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    pub offset: usize,
    pub kind: TemplateErrorKind,
}

impl TemplateError {
    pub(crate) fn new(offset: usize, kind: TemplateErrorKind) -> Self {
        TemplateError { offset, kind }
    }
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TemplateErrorKind::EmptyName => {
                write!(f, "Parameter name is empty at offset {}", self.offset)
            }
            TemplateErrorKind::DuplicateName(name) => {
                write!(f, "Duplicate parameter name '{}' at offset {}", name, self.offset)
            }
            TemplateErrorKind::UnbalancedBrace => {
                write!(f, "Unbalanced or malformed brace group at offset {}", self.offset)
            }
            TemplateErrorKind::CatchAllNotLast => {
                write!(
                    f,
                    "Catch-all parameter must be the only part of the final segment, at offset {}",
                    self.offset
                )
            }
            TemplateErrorKind::OptionalNotTrailing => {
                write!(
                    f,
                    "Optional parameter may only appear in a trailing position, at offset {}",
                    self.offset
                )
            }
            TemplateErrorKind::DefaultOnCatchAll => {
                write!(f, "Catch-all parameter cannot have a default value, at offset {}", self.offset)
            }
            TemplateErrorKind::OptionalOnCatchAll => {
                write!(f, "Catch-all parameter cannot be optional, at offset {}", self.offset)
            }
            TemplateErrorKind::OptionalWithDefault => {
                write!(
                    f,
                    "Optional parameter cannot have a default value, at offset {}",
                    self.offset
                )
            }
            TemplateErrorKind::EmptySegment => {
                write!(f, "Empty path segment at offset {}", self.offset)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Parse a template string into a [`RouteTemplate`].
///
/// The leading `~/` and `/` are stripped before parsing; error offsets and
/// the template's canonical text both refer to the stripped form.
pub fn parse<T: AsRef<str>>(input: T) -> Result<RouteTemplate, TemplateError> {
    let input = input.as_ref();
    let canonical = input.strip_prefix("~/").unwrap_or(input);
    let canonical = canonical.strip_prefix('/').unwrap_or(canonical);
    let tokens = lexer::tokenize(canonical)?;
    parser::tokens_to_template(canonical, &tokens)
}

#[cfg(test)]
mod tests {
    use super::{TemplateErrorKind, parse};
    use crate::template::segment::RoutePart;

    #[test]
    fn canonical_text_strips_prefixes() {
        assert_eq!(parse("/users/{id}").unwrap().text(), "users/{id}");
        assert_eq!(parse("~/users/{id}").unwrap().text(), "users/{id}");
        assert_eq!(parse("users/{id}").unwrap().text(), "users/{id}");
    }

    #[test]
    fn classic_three_segment_template() {
        let template = parse("{controller}/{action}/{id?}").unwrap();
        assert_eq!(template.segments().len(), 3);
        assert!(template.segments()[2].is_optional());
        assert!(template.has_parameter("ID"));
        assert_eq!(template.parameter_segment("id"), Some(2));
    }

    #[test]
    fn complex_segment_with_separator() {
        let template = parse("files/{name}.{ext?}").unwrap();
        let seg = &template.segments()[1];
        assert!(seg.is_complex());
        assert_eq!(seg.parts[1], RoutePart::Separator(".".into()));
    }

    #[test]
    fn error_offsets() {
        assert_eq!(parse("a/{}").unwrap_err().kind, TemplateErrorKind::EmptyName);
        assert_eq!(parse("a/{id").unwrap_err().kind, TemplateErrorKind::UnbalancedBrace);
        assert_eq!(parse("a/{id").unwrap_err().offset, 2);
        assert_eq!(
            parse("{id}/{ID}").unwrap_err().kind,
            TemplateErrorKind::DuplicateName("ID".into())
        );
        assert_eq!(parse("a//b").unwrap_err().kind, TemplateErrorKind::EmptySegment);
        assert_eq!(parse("a/b/").unwrap_err().kind, TemplateErrorKind::EmptySegment);
    }
}
