//! Named factories and argument binding.
//!
//! # Data Flow
//! ```text
//! PredicateDefinition / FilterDefinition (raw string args)
//!     → registry.rs (lookup factory by name)
//!     → args.rs (rewrite positional keys, validate arity, evaluate #{...})
//!         → expression.rs (arithmetic, literals, @component references)
//!         → components.rs (named shared objects: key resolvers, limiters)
//!     → factory.apply(bundle) → predicate or filter instance
//! ```
//!
//! # Design Decisions
//! - Factories declare their argument names; shorthand definitions rely on them
//! - Registries are built once at startup and shared read-only
//! - Expressions are a deliberately small language, not a scripting runtime

pub mod args;
pub mod components;
pub mod expression;
pub mod registry;

pub use args::{ArgValue, ArgumentBundle, ArgumentResolver};
pub use components::ComponentRegistry;
pub use registry::FactoryRegistry;

/// Declares how positional arguments bind to names.
pub trait ArgumentHints {
    /// Declared argument names, in positional order.
    fn arg_names(&self) -> &[&'static str] {
        &[]
    }

    /// Whether arity and presence of declared names are enforced.
    fn validate_args(&self) -> bool {
        true
    }
}

/// A named producer of predicates or filters.
pub trait Factory: ArgumentHints + Send + Sync {
    fn name(&self) -> &str;
}
