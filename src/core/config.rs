// src/core/config.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::errors::{DispatchError, ErrorHandlers, ErrorKind};
use super::resolvers::{ResolverRegistry, ValueResolver};
use super::source::PermissionChecker;
use super::suggestions::SuggestionSource;
use super::value::ValueKind;
use super::verifier::VerifierMode;

/// Todo lo que el motor consulta mientras despacha o sugiere. Se pasa por
/// referencia; no hay registros globales.
pub struct EngineConfig<S> {
    pub resolvers: ResolverRegistry<S>,
    permissions: Arc<dyn PermissionChecker<S>>,
    suggestion_sources: HashMap<ValueKind, Arc<dyn SuggestionSource<S>>>,
    verifier_mode: VerifierMode,
    error_handlers: ErrorHandlers<S>,
    runtime: Option<tokio::runtime::Handle>,
}

fn allow_all<S>(_: &S, _: Option<&str>) -> bool {
    true
}

impl<S: fmt::Debug + 'static> EngineConfig<S> {
    /// Resolvers primitivos, todos los permisos concedidos y verificación estricta.
    pub fn new() -> Self {
        Self {
            resolvers: ResolverRegistry::new(),
            permissions: Arc::new(allow_all::<S>),
            suggestion_sources: HashMap::new(),
            verifier_mode: VerifierMode::default(),
            error_handlers: ErrorHandlers::new(),
            runtime: None,
        }
    }

    pub fn with_permission_checker(mut self, checker: impl PermissionChecker<S> + 'static) -> Self {
        self.permissions = Arc::new(checker);
        self
    }

    pub fn with_resolver(mut self, kind: ValueKind, resolver: impl ValueResolver<S> + 'static) -> Self {
        self.resolvers.register(kind, resolver);
        self
    }

    /// Fuente de sugerencias para todos los parámetros de un tipo que no
    /// declaren la suya propia.
    pub fn with_suggestions(mut self, kind: ValueKind, source: impl SuggestionSource<S> + 'static) -> Self {
        self.suggestion_sources.insert(kind, Arc::new(source));
        self
    }

    pub fn with_verifier_mode(mut self, mode: VerifierMode) -> Self {
        self.verifier_mode = mode;
        self
    }

    pub fn on_error<F>(mut self, kind: ErrorKind, handler: F) -> Self
    where
        F: Fn(&S, &DispatchError) + Send + Sync + 'static,
    {
        self.error_handlers.register(kind, handler);
        self
    }

    /// Runtime en el que se programan los usos asíncronos. Sin él se usa el
    /// runtime actual, si lo hay.
    pub fn with_runtime(mut self, handle: tokio::runtime::Handle) -> Self {
        self.runtime = Some(handle);
        self
    }
}

// --- CONSULTAS ---

impl<S> EngineConfig<S> {
    pub fn permissions(&self) -> &dyn PermissionChecker<S> {
        self.permissions.as_ref()
    }

    pub fn has_permission(&self, source: &S, permission: Option<&str>) -> bool {
        self.permissions.has_permission(source, permission)
    }

    pub fn suggestion_source(&self, kind: &ValueKind) -> Option<&Arc<dyn SuggestionSource<S>>> {
        self.suggestion_sources.get(kind)
    }

    pub fn verifier_mode(&self) -> VerifierMode {
        self.verifier_mode
    }

    pub fn error_handlers(&self) -> &ErrorHandlers<S> {
        &self.error_handlers
    }

    pub fn error_handlers_mut(&mut self) -> &mut ErrorHandlers<S> {
        &mut self.error_handlers
    }

    pub fn runtime(&self) -> Option<&tokio::runtime::Handle> {
        self.runtime.as_ref()
    }
}

impl<S: fmt::Debug + 'static> Default for EngineConfig<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::{named_source_permissions, NamedSource};

    #[test]
    fn defaults_grant_everything() {
        let config = EngineConfig::<NamedSource>::new();
        assert!(config.has_permission(&NamedSource::new("guest"), Some("anything")));
        assert_eq!(config.verifier_mode(), VerifierMode::Strict);
        assert!(config.runtime().is_none());
        assert!(config.resolvers.matches(&ValueKind::Integer, "7"));
    }

    #[test]
    fn builder_methods_replace_the_registries() {
        let config = EngineConfig::<NamedSource>::new()
            .with_permission_checker(named_source_permissions)
            .with_verifier_mode(VerifierMode::TypeTolerant)
            .on_error(ErrorKind::PermissionDenied, |_, _| {});

        assert!(!config.has_permission(&NamedSource::new("guest"), Some("anything")));
        assert_eq!(config.verifier_mode(), VerifierMode::TypeTolerant);
        assert!(config.error_handlers().is_handled(ErrorKind::PermissionDenied));
        assert!(config.suggestion_source(&ValueKind::Text).is_none());
    }

    /// Sin `Debug` en `S`, como en el resolver de sugerencias.
    fn visible<S>(config: &EngineConfig<S>, source: &S) -> bool {
        config.permissions().has_permission(source, None)
            && config.suggestion_source(&ValueKind::Text).is_none()
            && config.runtime().is_none()
    }

    #[test]
    fn queries_do_not_require_debug_sources() {
        let config = EngineConfig::<NamedSource>::new();
        assert!(visible(&config, &NamedSource::new("guest")));
    }
}
