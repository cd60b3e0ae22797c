//! Link generation: the reverse mapping from values to a URL.

use std::sync::Arc;

use tsuji_lib::url_encoding::{encode_path_segment, encode_query_component};

use crate::constraint::Direction;
use crate::debug_log;
use crate::router::{RouteEntry, RouteSet};
use crate::template::segment::RoutePart;
use crate::values::{RouteValue, RouteValues};

/// Supplies the candidate routes for a logical address. The host wires
/// this up; [`RouteSetFinder`] is the in-process implementation.
pub trait EndpointFinder: Send + Sync {
    fn find(&self, address: &str) -> Vec<Arc<RouteEntry>>;
}

/// An [`EndpointFinder`] over a route set, returning candidates in
/// declaration order.
pub struct RouteSetFinder {
    entries: Vec<Arc<RouteEntry>>,
}

impl RouteSetFinder {
    pub fn new(routes: &RouteSet) -> Self {
        RouteSetFinder { entries: routes.entries().to_vec() }
    }
}

impl EndpointFinder for RouteSetFinder {
    fn find(&self, address: &str) -> Vec<Arc<RouteEntry>> {
        self.entries
            .iter()
            .filter(|e| e.endpoint().address == address)
            .cloned()
            .collect()
    }
}

/// Emission-time options. Each applies only when a URL is rendered;
/// matching is unaffected.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkOptions {
    pub lowercase_urls: bool,
    pub append_trailing_slash: bool,
    /// Only honoured together with `lowercase_urls`.
    pub lowercase_query_strings: bool,
}

/// One link request: the target address plus the supplied and ambient
/// value maps.
pub struct LinkContext<'a> {
    pub address: &'a str,
    pub supplied: &'a RouteValues,
    pub ambient: &'a RouteValues,
}

impl<'a> LinkContext<'a> {
    pub fn new(address: &'a str, supplied: &'a RouteValues, ambient: &'a RouteValues) -> Self {
        LinkContext { address, supplied, ambient }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    NoMatchingEndpoint { address: String },
}

impl std::fmt::Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkError::NoMatchingEndpoint { address } => {
                write!(f, "No endpoint matched address '{}'", address)
            }
        }
    }
}

impl std::error::Error for LinkError {}

/// Generates URLs by binding values to a compatible route template.
pub struct LinkGenerator {
    finder: Arc<dyn EndpointFinder>,
    options: LinkOptions,
}

impl LinkGenerator {
    pub fn new(finder: Arc<dyn EndpointFinder>, options: LinkOptions) -> Self {
        LinkGenerator { finder, options }
    }

    /// Build a generator straight from a route set.
    pub fn for_routes(routes: &RouteSet, options: LinkOptions) -> Self {
        LinkGenerator::new(Arc::new(RouteSetFinder::new(routes)), options)
    }

    /// Render a URL for the context, or `None` when no candidate binds.
    pub fn try_link(&self, ctx: &LinkContext<'_>) -> Option<String> {
        let mut candidates = self.finder.find(ctx.address);
        candidates.sort_by_key(|e| e.order());
        for entry in &candidates {
            if let Some(url) = self.try_entry(entry, ctx) {
                return Some(url);
            }
        }
        None
    }

    /// As [`try_link`](Self::try_link), failing loudly.
    pub fn link(&self, ctx: &LinkContext<'_>) -> Result<String, LinkError> {
        self.try_link(ctx).ok_or_else(|| LinkError::NoMatchingEndpoint {
            address: ctx.address.to_string(),
        })
    }

    fn try_entry(&self, entry: &RouteEntry, ctx: &LinkContext<'_>) -> Option<String> {
        let template = entry.matcher().template();
        let defaults = entry.matcher().defaults();

        // Bind each template parameter, in declaration order. Ambient
        // values only apply while every earlier parameter was itself
        // satisfied from ambient; a supplied or defaulted bind cuts the
        // chain off.
        let mut bound = RouteValues::new();
        let mut ambient_ok = true;
        for p in template.parameters() {
            if let Some(v) = ctx.supplied.get(&p.name) {
                bound.set(p.name.clone(), v.clone());
                ambient_ok = false;
            } else if let Some(v) = if ambient_ok { ctx.ambient.get(&p.name) } else { None } {
                bound.set(p.name.clone(), v.clone());
            } else if let Some(d) = defaults.get(&p.name) {
                bound.set(p.name.clone(), d.clone());
                ambient_ok = false;
            } else if p.is_optional || p.is_catch_all {
                ambient_ok = false;
            } else {
                return None;
            }
        }

        if !entry.constraints().check(&bound, Direction::Outbound) {
            debug_log!(
                "outbound constraints vetoed '{}' for address '{}'",
                template.text(),
                ctx.address
            );
            return None;
        }

        // Trailing segments whose value is unbound or equal to its
        // default render as nothing.
        let segments = template.segments();
        let mut last = segments.len();
        while last > 0 {
            let Some(p) = segments[last - 1].single_parameter() else { break };
            match bound.get(&p.name).and_then(|v| v.as_text()) {
                None if p.is_optional || p.is_catch_all => last -= 1,
                None => break,
                Some(value) => {
                    let elide = defaults
                        .get(&p.name)
                        .and_then(|d| d.as_text())
                        .is_some_and(|d| d.eq_ignore_ascii_case(&value));
                    if elide {
                        last -= 1;
                    } else {
                        break;
                    }
                }
            }
        }

        let mut path = String::new();
        for segment in &segments[..last] {
            path.push('/');
            render_segment(&segment.parts, &bound, &mut path);
        }
        if path.is_empty() {
            path.push('/');
        }

        let mut query = String::new();
        for (name, value) in ctx.supplied.iter() {
            if template.has_parameter(name) {
                continue;
            }
            match value {
                RouteValue::Null => {}
                RouteValue::List(items) => {
                    for item in items {
                        push_pair(&mut query, name, item);
                    }
                }
                other => {
                    if let Some(text) = other.as_text() {
                        push_pair(&mut query, name, &text);
                    }
                }
            }
        }

        if self.options.append_trailing_slash && !path.ends_with('/') {
            path.push('/');
        }
        if self.options.lowercase_urls {
            path.make_ascii_lowercase();
            if self.options.lowercase_query_strings {
                query.make_ascii_lowercase();
            }
        }

        path.push_str(&query);
        Some(path)
    }
}

fn render_segment(parts: &[RoutePart], bound: &RouteValues, path: &mut String) {
    for (i, part) in parts.iter().enumerate() {
        match part {
            RoutePart::Literal(text) => path.push_str(text),
            RoutePart::Separator(text) => {
                // dropped together with its unbound optional
                let follower_bound = parts
                    .get(i + 1)
                    .and_then(|p| p.parameter())
                    .is_some_and(|p| bound.contains(&p.name));
                if follower_bound {
                    path.push_str(text);
                }
            }
            RoutePart::Parameter(p) => {
                let Some(value) = bound.get(&p.name).and_then(|v| v.as_text()) else {
                    continue;
                };
                if p.is_catch_all {
                    // keep the slashes, encode the pieces between them
                    for (j, piece) in value.split('/').enumerate() {
                        if j > 0 {
                            path.push('/');
                        }
                        path.push_str(&encode_path_segment(piece));
                    }
                } else {
                    path.push_str(&encode_path_segment(&value));
                }
            }
        }
    }
}

fn push_pair(query: &mut String, key: &str, value: &str) {
    query.push(if query.is_empty() { '?' } else { '&' });
    query.push_str(&encode_query_component(key));
    query.push('=');
    query.push_str(&encode_query_component(value));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{LinkContext, LinkError, LinkGenerator, LinkOptions};
    use crate::constraint::KnownConstraint;
    use crate::router::{RouteDef, RouteSet};
    use crate::values::{RouteValue, RouteValues};

    fn values(pairs: &[(&str, &str)]) -> RouteValues {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn generator(defs: Vec<RouteDef>) -> LinkGenerator {
        let mut routes = RouteSet::new();
        for def in defs {
            routes.add(def).unwrap();
        }
        LinkGenerator::for_routes(&routes, LinkOptions::default())
    }

    #[test]
    fn single_parameter_link() {
        let links = generator(vec![RouteDef::new("{controller}").address("default")]);
        let supplied = values(&[("controller", "Home")]);
        let ambient = RouteValues::new();
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/Home");
    }

    #[test]
    fn optional_id_renders_when_bound() {
        let links = generator(vec![RouteDef::new("{controller}/{action}/{id?}").address("default")]);
        let ambient = RouteValues::new();

        let supplied = values(&[("controller", "Home"), ("action", "Index"), ("id", "10")]);
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/Home/Index/10");

        let supplied = values(&[("controller", "Home"), ("action", "Index")]);
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/Home/Index");
    }

    #[test]
    fn unconsumed_values_become_the_query_string() {
        let links = generator(vec![RouteDef::new("{controller}/{action}").address("default")]);
        let supplied = values(&[("name", "name with %special #characters")]);
        let ambient = values(&[("controller", "Home"), ("action", "Index")]);
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(
            links.link(&ctx).unwrap(),
            "/Home/Index?name=name%20with%20%25special%20%23characters"
        );
    }

    #[test]
    fn list_values_repeat_the_key() {
        let links = generator(vec![RouteDef::new("{controller}/{action}").address("default")]);
        let mut supplied = RouteValues::new();
        supplied.set("items", vec!["10".to_string(), "20".to_string(), "30".to_string()]);
        let ambient = values(&[("controller", "Home"), ("action", "Index")]);
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/Home/Index?items=10&items=20&items=30");
    }

    #[test]
    fn empty_lists_and_nulls_contribute_nothing() {
        let links = generator(vec![RouteDef::new("{controller}").address("default")]);
        let mut supplied = RouteValues::new();
        supplied.set("controller", "Home");
        supplied.set("empty", Vec::<String>::new());
        supplied.set("missing", RouteValue::Null);
        let ambient = RouteValues::new();
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/Home");
    }

    #[test]
    fn supplied_bind_cuts_off_later_ambient_values() {
        let links = generator(vec![RouteDef::new("{controller}/{action}").address("default")]);
        let ambient = values(&[("controller", "Home"), ("action", "Index")]);

        // action supplied, controller still ambient: fine
        let supplied = values(&[("action", "Edit")]);
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/Home/Edit");

        // controller supplied: the ambient action is no longer usable
        let supplied = values(&[("controller", "Shop")]);
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(
            links.link(&ctx),
            Err(LinkError::NoMatchingEndpoint { address: "default".into() })
        );
    }

    #[test]
    fn defaults_elide_trailing_segments() {
        let links = generator(vec![
            RouteDef::new("{controller=Home}/{action=Index}").address("default"),
        ]);
        let ambient = RouteValues::new();

        let supplied = RouteValues::new();
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/");

        let supplied = values(&[("controller", "Shop")]);
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/Shop");

        let supplied = values(&[("action", "List")]);
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/Home/List");
    }

    #[test]
    fn separator_elides_with_its_optional() {
        let links = generator(vec![RouteDef::new("files/{name}.{ext?}").address("files")]);
        let ambient = RouteValues::new();

        let supplied = values(&[("name", "report"), ("ext", "pdf")]);
        let ctx = LinkContext::new("files", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/files/report.pdf");

        let supplied = values(&[("name", "report")]);
        let ctx = LinkContext::new("files", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/files/report");
    }

    #[test]
    fn catch_all_keeps_slashes_and_encodes_pieces() {
        let links = generator(vec![RouteDef::new("docs/{*rest}").address("docs")]);
        let supplied = values(&[("rest", "guide/part one")]);
        let ambient = RouteValues::new();
        let ctx = LinkContext::new("docs", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/docs/guide/part%20one");
    }

    #[test]
    fn outbound_constraints_veto_candidates() {
        let links = generator(vec![RouteDef::new("shop/{id:int}").address("shop")]);
        let ambient = RouteValues::new();

        let supplied = values(&[("id", "42")]);
        let ctx = LinkContext::new("shop", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/shop/42");

        let supplied = values(&[("id", "forty-two")]);
        let ctx = LinkContext::new("shop", &supplied, &ambient);
        assert!(links.try_link(&ctx).is_none());
    }

    #[test]
    fn candidates_are_tried_in_declaration_order() {
        let links = generator(vec![
            RouteDef::new("special/{id}")
                .address("multi")
                .constraint("id", Arc::new(KnownConstraint::resolve("int").unwrap())),
            RouteDef::new("general/{id}").address("multi"),
        ]);
        let ambient = RouteValues::new();

        let supplied = values(&[("id", "7")]);
        let ctx = LinkContext::new("multi", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/special/7");

        let supplied = values(&[("id", "seven")]);
        let ctx = LinkContext::new("multi", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/general/seven");
    }

    #[test]
    fn emission_options() {
        let mut routes = RouteSet::new();
        routes.add(RouteDef::new("{controller}/{action}").address("default")).unwrap();
        let links = LinkGenerator::for_routes(
            &routes,
            LinkOptions {
                lowercase_urls: true,
                append_trailing_slash: true,
                lowercase_query_strings: false,
            },
        );
        let supplied = values(&[("controller", "Home"), ("action", "Index"), ("Tag", "New")]);
        let ambient = RouteValues::new();
        let ctx = LinkContext::new("default", &supplied, &ambient);
        assert_eq!(links.link(&ctx).unwrap(), "/home/index/?Tag=New");
    }

    #[test]
    fn unknown_address_fails() {
        let links = generator(vec![RouteDef::new("{controller}").address("default")]);
        let supplied = RouteValues::new();
        let ambient = RouteValues::new();
        let ctx = LinkContext::new("nowhere", &supplied, &ambient);
        assert_eq!(
            links.link(&ctx),
            Err(LinkError::NoMatchingEndpoint { address: "nowhere".into() })
        );
    }
}
