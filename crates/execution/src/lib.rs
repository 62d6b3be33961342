//! Resolution layer - pipeline rules, version selection and dependency
//! resolution.

#![warn(missing_docs)]

pub mod rules;
pub mod selector;
pub mod expander;
pub mod dependency;
pub mod error;

#[cfg(test)]
mod testing;

pub use rules::{Rule, RuleTable, RuleTableError};
pub use selector::{latest_acceptable, Selection, VersionSelector};
pub use expander::{AssetDependencyExpander, AssetExpansion};
pub use dependency::{DependencyResolver, Resolution, ResolverConfig};
pub use error::{BranchError, BranchFailure, ResolveError};
