//! Route-set assembly: definitions in, validated and ordered entries out,
//! compiled into any of the three match engines.

use std::sync::Arc;

use fnv::FnvHashMap;

use crate::constraint::{ConstraintSet, Direction, KnownConstraint, RouteConstraint};
use crate::endpoint::Endpoint;
use crate::matcher::{DfaMatcher, ProgramMatcher, TreeMatcher};
use crate::precedence::Precedence;
use crate::template::matcher::TemplateMatcher;
use crate::template::parser::{TemplateError, parse};
use crate::values::{RouteValue, RouteValues};

/// A route definition as the host states it: template text plus the
/// out-of-band pieces (defaults, constraints, address, metadata).
pub struct RouteDef {
    template: String,
    address: String,
    defaults: RouteValues,
    constraints: Vec<(String, Arc<dyn RouteConstraint>)>,
    metadata: FnvHashMap<String, String>,
}

impl RouteDef {
    pub fn new<T: Into<String>>(template: T) -> Self {
        RouteDef {
            template: template.into(),
            address: String::new(),
            defaults: RouteValues::new(),
            constraints: Vec::new(),
            metadata: FnvHashMap::default(),
        }
    }

    /// Logical address used to look the route up during link generation.
    pub fn address<A: Into<String>>(mut self, address: A) -> Self {
        self.address = address.into();
        self
    }

    pub fn default_value<K: Into<String>, V: Into<RouteValue>>(mut self, name: K, value: V) -> Self {
        self.defaults.set(name, value);
        self
    }

    /// Attach an out-of-band constraint to a parameter.
    pub fn constraint<K: Into<String>>(mut self, name: K, check: Arc<dyn RouteConstraint>) -> Self {
        self.constraints.push((name.into(), check));
        self
    }

    pub fn metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// One validated route: the per-template matcher, resolved constraints,
/// endpoint handle, precedence key and declaration order.
#[derive(Debug)]
pub struct RouteEntry {
    matcher: TemplateMatcher,
    constraints: ConstraintSet,
    endpoint: Arc<Endpoint>,
    precedence: Precedence,
    order: usize,
}

impl RouteEntry {
    pub fn matcher(&self) -> &TemplateMatcher {
        &self.matcher
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    pub fn precedence(&self) -> &Precedence {
        &self.precedence
    }

    /// Position in declaration order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Run the full inbound gauntlet for this entry: template match, then
    /// constraints. On any failure the values map is rewound to its
    /// pre-attempt state, so the caller can try the next candidate.
    pub(crate) fn try_candidate(&self, path: &str, values: &mut RouteValues) -> bool {
        let mark = values.mark();
        if self.matcher.try_match(path, values)
            && self.constraints.check(values, Direction::Inbound)
        {
            return true;
        }
        values.rewind(mark);
        false
    }
}

/// Errors surfaced while assembling or compiling a route set.
#[derive(Debug)]
pub enum RouteSetError {
    /// The template text failed to parse.
    Template { template: String, error: TemplateError },
    /// Two routes with equal precedence and equal canonical text.
    DuplicateRoute { template: String },
    /// An inline constraint expression nobody recognises.
    UnknownConstraint { template: String, parameter: String, expr: String },
    /// The jump-table engines cannot compile complex segments; use the
    /// packed tree for templates like `page-{num}`.
    UnsupportedSegment { template: String },
}

impl std::fmt::Display for RouteSetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteSetError::Template { template, error } => {
                write!(f, "Invalid route template '{}': {}", template, error)
            }
            RouteSetError::DuplicateRoute { template } => {
                write!(f, "Duplicate route '{}'", template)
            }
            RouteSetError::UnknownConstraint { template, parameter, expr } => {
                write!(
                    f,
                    "Unknown constraint '{}' on parameter '{}' of route '{}'",
                    expr, parameter, template
                )
            }
            RouteSetError::UnsupportedSegment { template } => {
                write!(
                    f,
                    "Route '{}' contains a complex segment, which this engine does not support",
                    template
                )
            }
        }
    }
}

impl std::error::Error for RouteSetError {}

/// An ordered collection of routes, compiled on demand into a matcher.
///
/// Adding a route parses and validates it immediately; duplicate
/// detection runs when a matcher is built, once the whole set is known.
#[derive(Default, Debug)]
pub struct RouteSet {
    entries: Vec<Arc<RouteEntry>>,
}

impl RouteSet {
    pub fn new() -> Self {
        RouteSet { entries: Vec::new() }
    }

    pub fn add(&mut self, def: RouteDef) -> Result<&mut Self, RouteSetError> {
        let template = parse(&def.template).map_err(|error| RouteSetError::Template {
            template: def.template.clone(),
            error,
        })?;

        let mut constraints = ConstraintSet::new();
        for p in template.parameters() {
            for expr in &p.constraints {
                let known =
                    KnownConstraint::resolve(expr).ok_or_else(|| RouteSetError::UnknownConstraint {
                        template: template.text().to_string(),
                        parameter: p.name.clone(),
                        expr: expr.clone(),
                    })?;
                constraints.push(&p.name, expr.clone(), Arc::new(known));
            }
        }
        for (name, check) in &def.constraints {
            constraints.push(name, "custom", Arc::clone(check));
        }

        let matcher = TemplateMatcher::new(template, def.defaults);
        let defaults = matcher.defaults().clone();
        let precedence = Precedence::compute(matcher.template(), &defaults, |name| {
            constraints.constrains(name)
        });

        let mut endpoint = Endpoint::new(matcher.template().text(), defaults, def.address);
        endpoint.metadata = def.metadata;

        let order = self.entries.len();
        self.entries.push(Arc::new(RouteEntry {
            matcher,
            constraints,
            endpoint: Arc::new(endpoint),
            precedence,
            order,
        }));
        Ok(self)
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    /// Entries sorted most-specific-first: ascending precedence, then
    /// ordinal template text, then declaration order. Equal precedence
    /// and equal text is a duplicate.
    pub(crate) fn sorted_entries(&self) -> Result<Vec<Arc<RouteEntry>>, RouteSetError> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| {
            a.precedence
                .cmp(&b.precedence)
                .then_with(|| a.matcher.template().text().cmp(b.matcher.template().text()))
                .then(a.order.cmp(&b.order))
        });
        for pair in sorted.windows(2) {
            if pair[0].precedence == pair[1].precedence
                && pair[0].matcher.template().text() == pair[1].matcher.template().text()
            {
                return Err(RouteSetError::DuplicateRoute {
                    template: pair[0].matcher.template().text().to_string(),
                });
            }
        }
        Ok(sorted)
    }

    /// Compile the packed tree engine. Supports every template form,
    /// complex segments included.
    pub fn build_tree(&self) -> Result<TreeMatcher, RouteSetError> {
        Ok(TreeMatcher::build(self.sorted_entries()?))
    }

    /// Compile the DFA engine. Rejects complex segments.
    pub fn build_dfa(&self) -> Result<DfaMatcher, RouteSetError> {
        let sorted = self.sorted_entries()?;
        reject_complex(&sorted)?;
        Ok(DfaMatcher::build(sorted))
    }

    /// Compile the instruction engine. Rejects complex segments.
    pub fn build_program(&self) -> Result<ProgramMatcher, RouteSetError> {
        let sorted = self.sorted_entries()?;
        reject_complex(&sorted)?;
        Ok(ProgramMatcher::build(sorted))
    }
}

fn reject_complex(entries: &[Arc<RouteEntry>]) -> Result<(), RouteSetError> {
    for entry in entries {
        if entry.matcher.template().has_complex_segment() {
            return Err(RouteSetError::UnsupportedSegment {
                template: entry.matcher.template().text().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use quickcheck::{TestResult, quickcheck};

    use super::{RouteDef, RouteSet, RouteSetError};
    use crate::link::{LinkContext, LinkGenerator, LinkOptions};
    use crate::matcher::Matcher;
    use crate::values::RouteValues;

    fn set(templates: &[&str]) -> RouteSet {
        let mut routes = RouteSet::new();
        for t in templates {
            routes.add(RouteDef::new(*t)).unwrap();
        }
        routes
    }

    // every engine compiled from the same set
    fn engines(routes: &RouteSet) -> Vec<Box<dyn Matcher>> {
        vec![
            Box::new(routes.build_tree().unwrap()),
            Box::new(routes.build_dfa().unwrap()),
            Box::new(routes.build_program().unwrap()),
        ]
    }

    fn text(values: &RouteValues, name: &str) -> Option<String> {
        values.get(name).and_then(|v| v.as_text()).map(|c| c.into_owned())
    }

    #[test]
    fn most_specific_template_wins_in_every_engine() {
        let routes = set(&["{controller}/{action}/{id?}", "{controller}/{action}", "{controller}"]);
        for engine in engines(&routes) {
            let m = engine.matches("/Home").unwrap();
            assert_eq!(m.endpoint.template_text, "{controller}");

            let m = engine.matches("/Home/Index").unwrap();
            assert_eq!(m.endpoint.template_text, "{controller}/{action}");

            let m = engine.matches("/Home/Index/7").unwrap();
            assert_eq!(m.endpoint.template_text, "{controller}/{action}/{id?}");
            assert_eq!(text(&m.values, "id").as_deref(), Some("7"));
        }
    }

    #[test]
    fn engines_agree_on_winner_and_values() {
        let routes = set(&[
            "{controller}/{action}/{id?}",
            "{controller}/{action}",
            "{controller}",
            "literal",
            "literal/{x:int}",
            "files/{*rest}",
        ]);
        let engines = engines(&routes);
        let paths = [
            "/",
            "/Home",
            "/Home/Index",
            "/Home/Index/7",
            "/Home/Index/7/8",
            "/literal",
            "/LITERAL",
            "/literal/42",
            "/literal/abc",
            "/literal/42/extra",
            "/files",
            "/files/a/b/c",
            "/files/a%20b",
            "/a//b",
            "/Home/Index/",
        ];
        for path in paths {
            let results: Vec<_> = engines.iter().map(|e| e.matches(path)).collect();
            for pair in results.windows(2) {
                match (&pair[0], &pair[1]) {
                    (None, None) => {}
                    (Some(a), Some(b)) => {
                        assert_eq!(a.endpoint.template_text, b.endpoint.template_text, "path {}", path);
                        assert_eq!(a.values, b.values, "path {}", path);
                    }
                    _ => panic!("engines disagree on '{}'", path),
                }
            }
        }
    }

    #[test]
    fn constrained_route_outranks_unconstrained_in_every_engine() {
        let routes = set(&["shop/{id:int}", "shop/{id}"]);
        for engine in engines(&routes) {
            assert_eq!(
                engine.matches("/shop/42").unwrap().endpoint.template_text,
                "shop/{id:int}"
            );
            assert_eq!(
                engine.matches("/shop/sale").unwrap().endpoint.template_text,
                "shop/{id}"
            );
        }
    }

    #[test]
    fn literal_case_rules_hold_in_every_engine() {
        let routes = set(&["simple"]);
        for engine in engines(&routes) {
            assert!(engine.matches("/Simple").is_some());
            assert!(engine.matches("/SIMPLE").is_some());
            assert!(engine.matches("/simple/").is_some());
            assert!(engine.matches("/siple").is_none());
            assert!(engine.matches("/simple1").is_none());
        }
    }

    #[test]
    fn duplicate_routes_are_rejected() {
        let mut routes = RouteSet::new();
        routes.add(RouteDef::new("{controller}/{action}")).unwrap();
        routes.add(RouteDef::new("/{controller}/{action}")).unwrap();
        let err = routes.build_tree().unwrap_err();
        assert!(matches!(err, RouteSetError::DuplicateRoute { .. }));
    }

    #[test]
    fn equal_precedence_different_text_is_not_a_duplicate() {
        let routes = set(&["{a}/{b}", "{x}/{y}"]);
        for engine in engines(&routes) {
            // ordinal text order breaks the tie deterministically
            let m = engine.matches("/1/2").unwrap();
            assert_eq!(m.endpoint.template_text, "{a}/{b}");
        }
    }

    #[test]
    fn unknown_inline_constraint_is_a_build_error() {
        let mut routes = RouteSet::new();
        let err = routes.add(RouteDef::new("{id:flavour}")).unwrap_err();
        assert!(matches!(err, RouteSetError::UnknownConstraint { .. }));
    }

    #[test]
    fn invalid_template_cites_the_offset() {
        let mut routes = RouteSet::new();
        let err = routes.add(RouteDef::new("/a/{id")).unwrap_err();
        let RouteSetError::Template { error, .. } = err else { panic!("template error") };
        assert_eq!(error.offset, 2);
    }

    #[test]
    fn defaults_reach_the_matched_values() {
        let mut routes = RouteSet::new();
        routes
            .add(RouteDef::new("blog/{page}").default_value("section", "news"))
            .unwrap();
        for engine in engines(&routes) {
            let m = engine.matches("/blog/7").unwrap();
            assert_eq!(text(&m.values, "page").as_deref(), Some("7"));
            assert_eq!(text(&m.values, "section").as_deref(), Some("news"));
        }
    }

    #[test]
    fn generated_links_match_back() {
        let mut routes = RouteSet::new();
        routes
            .add(RouteDef::new("{controller}/{action}/{id?}").address("default"))
            .unwrap();
        let links = LinkGenerator::for_routes(&routes, LinkOptions::default());
        let engines = engines(&routes);

        let supplied: RouteValues =
            [("controller", "Home"), ("action", "Index"), ("id", "10")].into_iter().collect();
        let ambient = RouteValues::new();
        let url = links.link(&LinkContext::new("default", &supplied, &ambient)).unwrap();
        assert_eq!(url, "/Home/Index/10");

        for engine in &engines {
            let m = engine.matches(&url).unwrap();
            for (name, value) in supplied.iter() {
                assert_eq!(m.values.get(name), Some(value));
            }
        }
    }

    quickcheck! {
        // a link produced from supplied values always matches back to a
        // superset of those values, in every engine
        fn link_round_trips_through_match(controller: String, action: String, id: u32) -> TestResult {
            let simple = |s: &str| {
                !s.is_empty() && s.len() < 24 && s.chars().all(|c| c.is_ascii_alphanumeric())
            };
            if !simple(&controller) || !simple(&action) {
                return TestResult::discard();
            }

            let mut routes = RouteSet::new();
            routes
                .add(RouteDef::new("{controller}/{action}/{id?}").address("default"))
                .unwrap();
            let links = LinkGenerator::for_routes(&routes, LinkOptions::default());

            let supplied: RouteValues = [
                ("controller", controller.clone()),
                ("action", action.clone()),
                ("id", id.to_string()),
            ]
            .into_iter()
            .collect();
            let ambient = RouteValues::new();
            let url = match links.try_link(&LinkContext::new("default", &supplied, &ambient)) {
                Some(url) => url,
                None => return TestResult::failed(),
            };

            for engine in engines(&routes) {
                let Some(m) = engine.matches(&url) else { return TestResult::failed() };
                for (name, value) in supplied.iter() {
                    if m.values.get(name) != Some(value) {
                        return TestResult::failed();
                    }
                }
            }
            TestResult::passed()
        }
    }
}
