//! Endpoints: the opaque terminus of a successful match.

use std::sync::Arc;

use fnv::FnvHashMap;

use crate::values::RouteValues;

/// The handle a match resolves to. The routing engines never look inside;
/// the host pipeline attaches whatever it needs through `metadata` and
/// dispatches on the endpoint it gets back.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Canonical text of the template that produced this endpoint.
    pub template_text: String,
    /// Merged default values (inline and route-level).
    pub defaults: RouteValues,
    /// Logical address used during link generation.
    pub address: String,
    /// Free-form host metadata.
    pub metadata: FnvHashMap<String, String>,
}

impl Endpoint {
    pub fn new<T: Into<String>, A: Into<String>>(template_text: T, defaults: RouteValues, address: A) -> Self {
        Endpoint {
            template_text: template_text.into(),
            defaults,
            address: address.into(),
            metadata: FnvHashMap::default(),
        }
    }
}

/// A successful dispatch: the winning endpoint plus the values bound from
/// the path (captures first, then defaults that were not overridden).
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub endpoint: Arc<Endpoint>,
    pub values: RouteValues,
}
