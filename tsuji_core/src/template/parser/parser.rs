use super::lexer::RawToken;
use super::{TemplateError, TemplateErrorKind};
use crate::template::segment::{ParameterPart, RoutePart, RouteSegment, RouteTemplate};

// Position of a parameter inside the segment list, kept during assembly
// so validation errors can cite the declaration site.
struct ParamSite {
    lower: String,
    offset: usize,
    segment: usize,
    part: usize,
    is_catch_all: bool,
    is_optional: bool,
}

/// Assemble a token stream into a [`RouteTemplate`].
///
/// Segments are delimited by `Slash` tokens and may not be empty. Within a
/// segment, literals and parameter groups accumulate as parts; a segment
/// with more than one part is a complex segment. After assembly the
/// structural rules are enforced: unique names, catch-all placement,
/// trailing optionals, and the optional/default/catch-all exclusivity
/// rules.
pub fn tokens_to_template(
    text: &str,
    tokens: &[(usize, RawToken)],
) -> Result<RouteTemplate, TemplateError> {
    let mut segments: Vec<RouteSegment> = Vec::new();
    let mut parts: Vec<RoutePart> = Vec::new();
    let mut sites: Vec<ParamSite> = Vec::new();

    let mut i = 0usize;
    let mut last_slash_at = 0usize;

    while i < tokens.len() {
        let (at, token) = &tokens[i];
        match token {
            RawToken::Literal(s) => {
                parts.push(RoutePart::Literal(s.clone()));
                i += 1;
            }
            RawToken::Slash => {
                if parts.is_empty() {
                    return Err(TemplateError::new(*at, TemplateErrorKind::EmptySegment));
                }
                segments.push(RouteSegment { parts: std::mem::take(&mut parts) });
                last_slash_at = *at;
                i += 1;
            }
            RawToken::BraceOpen => {
                let (part, site, next) = parse_group(tokens, i + 1, segments.len(), parts.len())?;
                parts.push(RoutePart::Parameter(part));
                sites.push(site);
                i = next;
            }
            // the lexer only produces these inside a brace group
            _ => return Err(TemplateError::new(*at, TemplateErrorKind::UnbalancedBrace)),
        }
    }

    if !parts.is_empty() {
        segments.push(RouteSegment { parts });
    } else if !tokens.is_empty() {
        // the template ended on a slash
        return Err(TemplateError::new(last_slash_at, TemplateErrorKind::EmptySegment));
    }

    validate(&segments, &sites)?;
    reclassify_separators(&mut segments);

    Ok(RouteTemplate::new(text.to_string(), segments))
}

// Parse one brace group starting at the token just past BraceOpen.
// Returns the parameter part, its site record, and the next token index.
fn parse_group(
    tokens: &[(usize, RawToken)],
    mut i: usize,
    segment: usize,
    part: usize,
) -> Result<(ParameterPart, ParamSite, usize), TemplateError> {
    let mut is_catch_all = false;
    if let Some((_, RawToken::Star)) = tokens.get(i) {
        is_catch_all = true;
        i += 1;
    }

    let (name_at, name) = match tokens.get(i) {
        Some((at, RawToken::Ident(name))) => (*at, name.clone()),
        Some((at, _)) => return Err(TemplateError::new(*at, TemplateErrorKind::UnbalancedBrace)),
        None => return Err(TemplateError::new(0, TemplateErrorKind::UnbalancedBrace)),
    };
    if name.is_empty() {
        return Err(TemplateError::new(name_at, TemplateErrorKind::EmptyName));
    }
    i += 1;

    let mut default: Option<String> = None;
    let mut is_optional = false;
    let mut constraints: Vec<String> = Vec::new();

    loop {
        match tokens.get(i) {
            Some((at, RawToken::Default(text))) => {
                if is_catch_all {
                    return Err(TemplateError::new(*at, TemplateErrorKind::DefaultOnCatchAll));
                }
                if is_optional {
                    return Err(TemplateError::new(*at, TemplateErrorKind::OptionalWithDefault));
                }
                default = Some(text.clone());
                i += 1;
            }
            Some((at, RawToken::Question)) => {
                if is_catch_all {
                    return Err(TemplateError::new(*at, TemplateErrorKind::OptionalOnCatchAll));
                }
                if default.is_some() {
                    return Err(TemplateError::new(*at, TemplateErrorKind::OptionalWithDefault));
                }
                is_optional = true;
                i += 1;
            }
            Some((_, RawToken::Constraint(expr))) => {
                constraints.push(expr.clone());
                i += 1;
            }
            Some((_, RawToken::BraceClose)) => {
                i += 1;
                break;
            }
            Some((at, _)) => {
                return Err(TemplateError::new(*at, TemplateErrorKind::UnbalancedBrace));
            }
            None => return Err(TemplateError::new(name_at, TemplateErrorKind::UnbalancedBrace)),
        }
    }

    let site = ParamSite {
        lower: name.to_ascii_lowercase(),
        offset: name_at,
        segment,
        part,
        is_catch_all,
        is_optional,
    };
    let part = ParameterPart { name, is_optional, is_catch_all, default, constraints };
    Ok((part, site, i))
}

fn validate(segments: &[RouteSegment], sites: &[ParamSite]) -> Result<(), TemplateError> {
    // unique names, case-insensitive
    for (idx, site) in sites.iter().enumerate() {
        if sites[..idx].iter().any(|earlier| earlier.lower == site.lower) {
            let name = match &segments[site.segment].parts[site.part] {
                RoutePart::Parameter(p) => p.name.clone(),
                _ => site.lower.clone(),
            };
            return Err(TemplateError::new(site.offset, TemplateErrorKind::DuplicateName(name)));
        }
    }

    for site in sites {
        // a catch-all must be the sole part of the final segment
        if site.is_catch_all {
            let last_segment = site.segment == segments.len() - 1;
            if !last_segment || !segments[site.segment].is_simple() {
                return Err(TemplateError::new(site.offset, TemplateErrorKind::CatchAllNotLast));
            }
        }

        if site.is_optional {
            let segment = &segments[site.segment];
            if segment.is_simple() {
                // simple optional segments must form a trailing run
                let trailing = segments[site.segment + 1..]
                    .iter()
                    .all(|s| s.is_optional());
                if !trailing {
                    return Err(TemplateError::new(
                        site.offset,
                        TemplateErrorKind::OptionalNotTrailing,
                    ));
                }
            } else {
                // inside a complex segment the optional must be the final
                // part with a literal separator right before it
                let is_last_part = site.part == segment.parts.len() - 1;
                let has_separator = site.part > 0
                    && segment.parts[site.part - 1].literal_text().is_some();
                if !is_last_part || !has_separator {
                    return Err(TemplateError::new(
                        site.offset,
                        TemplateErrorKind::OptionalNotTrailing,
                    ));
                }
            }
        }
    }

    Ok(())
}

// A literal immediately before a trailing optional parameter of a complex
// segment becomes a separator, so link generation can elide it together
// with the unbound optional ("{name}.{ext?}" renders "report", not
// "report.").
fn reclassify_separators(segments: &mut [RouteSegment]) {
    for segment in segments.iter_mut() {
        if segment.parts.len() < 2 {
            continue;
        }
        let last = segment.parts.len() - 1;
        let optional_tail = matches!(
            &segment.parts[last],
            RoutePart::Parameter(p) if p.is_optional
        );
        if optional_tail {
            if let RoutePart::Literal(text) = &segment.parts[last - 1] {
                segment.parts[last - 1] = RoutePart::Separator(text.clone());
            }
        }
    }
}
