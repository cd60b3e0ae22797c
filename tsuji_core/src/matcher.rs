pub mod tree;
pub mod dfa;
pub mod program;

pub use self::dfa::DfaMatcher;
pub use self::program::ProgramMatcher;
pub use self::tree::TreeMatcher;

use crate::endpoint::RouteMatch;

/// A compiled route dispatcher. All three engines implement this trait
/// and agree on the winning endpoint for every path.
///
/// A built matcher is immutable; matching is lock-free and safe to run
/// from any number of threads at once. The only mutable state lives in
/// the per-call values map the matcher itself allocates.
pub trait Matcher: Send + Sync {
    /// Dispatch a request path. The path must begin with `/`; anything
    /// else is no match. Constraint failures and partial matches are
    /// clean misses, never errors.
    fn matches(&self, path: &str) -> Option<RouteMatch>;
}
