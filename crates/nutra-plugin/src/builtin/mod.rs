//! Plugins compiled into Nutra.

pub mod stage;

use crate::registry::StaticResolver;

/// Registers every built-in plugin into `resolver`.
pub fn register_builtins(resolver: &mut StaticResolver) {
    resolver.register(stage::NAME, stage::module());
}

/// A resolver holding only the built-in plugins.
pub fn builtin_resolver() -> StaticResolver {
    let mut resolver = StaticResolver::new();
    register_builtins(&mut resolver);
    resolver
}
