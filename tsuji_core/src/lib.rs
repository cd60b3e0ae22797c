pub mod debug;

pub mod values;
pub mod template;
pub mod precedence;
pub mod constraint;
pub mod endpoint;
pub mod matcher;
pub mod link;
pub mod router;

// Re-export the types most callers touch
pub use values::{RouteValue, RouteValues};
pub use template::{RouteTemplate, TemplateError, TemplateErrorKind};
pub use endpoint::{Endpoint, RouteMatch};
pub use matcher::Matcher;
pub use router::{RouteDef, RouteEntry, RouteSet, RouteSetError};
pub use link::{EndpointFinder, LinkContext, LinkError, LinkGenerator, LinkOptions};
