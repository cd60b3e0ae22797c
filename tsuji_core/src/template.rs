pub mod segment;
pub mod parser;
pub mod matcher;

pub use self::segment::{ParameterPart, RoutePart, RouteSegment, RouteTemplate};
pub use self::parser::{TemplateError, TemplateErrorKind, parse};
pub use self::matcher::TemplateMatcher;
