// src/core/resolvers.rs

use std::collections::HashMap;
use std::sync::Arc;

use super::context::ResolvedContext;
use super::cursor::Cursor;
use super::parameter::Parameter;
use super::value::{Value, ValueKind};

/// Lo que un resolver puede consultar mientras convierte un token crudo.
pub struct ResolveInput<'a, S> {
    pub source: &'a S,
    pub context: &'a ResolvedContext<S>,
    pub parameter: &'a Parameter<S>,
    pub cursor: Cursor,
}

/// Convierte la entrada cruda de un tipo de valor en un `Value`.
pub trait ValueResolver<S>: Send + Sync {
    /// Indica si el token "parece" de este tipo. El recorrido del árbol lo usa
    /// para elegir entre ramas tipadas; no debe tener efectos.
    fn matches(&self, raw: &str) -> bool {
        let _ = raw;
        true
    }

    fn resolve(&self, input: &ResolveInput<'_, S>, raw: &str) -> Result<Value, String>;
}

impl<S, F> ValueResolver<S> for F
where
    F: Fn(&ResolveInput<'_, S>, &str) -> Result<Value, String> + Send + Sync,
{
    fn resolve(&self, input: &ResolveInput<'_, S>, raw: &str) -> Result<Value, String> {
        self(input, raw)
    }
}

// --- RESOLVERS PRIMITIVOS ---

#[derive(Debug, Clone, Copy, Default)]
pub struct TextResolver;

impl<S> ValueResolver<S> for TextResolver {
    fn resolve(&self, _input: &ResolveInput<'_, S>, raw: &str) -> Result<Value, String> {
        Ok(Value::Text(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerResolver;

impl<S> ValueResolver<S> for IntegerResolver {
    fn matches(&self, raw: &str) -> bool {
        raw.parse::<i64>().is_ok()
    }

    fn resolve(&self, _input: &ResolveInput<'_, S>, raw: &str) -> Result<Value, String> {
        raw.parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| format!("'{}' no es un número entero: {}", raw, e))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatResolver;

impl<S> ValueResolver<S> for FloatResolver {
    fn matches(&self, raw: &str) -> bool {
        raw.parse::<f64>().is_ok_and(f64::is_finite)
    }

    fn resolve(&self, _input: &ResolveInput<'_, S>, raw: &str) -> Result<Value, String> {
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::Float(n)),
            Ok(_) => Err(format!("'{}' no es un número finito", raw)),
            Err(e) => Err(format!("'{}' no es un número decimal: {}", raw, e)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanResolver;

impl BooleanResolver {
    fn parse(raw: &str) -> Option<bool> {
        match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "si" | "sí" => Some(true),
            "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }
}

impl<S> ValueResolver<S> for BooleanResolver {
    fn matches(&self, raw: &str) -> bool {
        Self::parse(raw).is_some()
    }

    fn resolve(&self, _input: &ResolveInput<'_, S>, raw: &str) -> Result<Value, String> {
        Self::parse(raw)
            .map(Value::Boolean)
            .ok_or_else(|| format!("'{}' no es un valor booleano", raw))
    }
}

// --- REGISTRO ---

/// Tipo de valor -> resolver. Trae de serie los tipos primitivos.
pub struct ResolverRegistry<S> {
    resolvers: HashMap<ValueKind, Arc<dyn ValueResolver<S>>>,
}

impl<S: 'static> ResolverRegistry<S> {
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(ValueKind::Text, TextResolver);
        registry.register(ValueKind::Integer, IntegerResolver);
        registry.register(ValueKind::Float, FloatResolver);
        registry.register(ValueKind::Boolean, BooleanResolver);
        registry
    }

    pub fn empty() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }

    /// Sustituye cualquier resolver previo para ese tipo.
    pub fn register(&mut self, kind: ValueKind, resolver: impl ValueResolver<S> + 'static) {
        log::debug!("Registrando resolver para el tipo '{}'", kind);
        self.resolvers.insert(kind, Arc::new(resolver));
    }

    pub fn get(&self, kind: &ValueKind) -> Option<&Arc<dyn ValueResolver<S>>> {
        self.resolvers.get(kind)
    }

    /// Un tipo sin resolver registrado no acepta ningún token.
    pub fn matches(&self, kind: &ValueKind, raw: &str) -> bool {
        self.resolvers.get(kind).is_some_and(|r| r.matches(raw))
    }
}

impl<S: 'static> Default for ResolverRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::NamedSource;

    fn resolve(registry: &ResolverRegistry<NamedSource>, kind: ValueKind, raw: &str) -> Result<Value, String> {
        let source = NamedSource::new("tester");
        let context = ResolvedContext::new("test");
        let parameter = Parameter::typed("value", kind.clone());
        let input = ResolveInput {
            source: &source,
            context: &context,
            parameter: &parameter,
            cursor: Cursor::default(),
        };
        registry
            .get(&kind)
            .ok_or_else(|| "sin resolver".to_string())?
            .resolve(&input, raw)
    }

    #[test]
    fn primitive_kinds_are_registered() {
        let registry = ResolverRegistry::new();
        assert_eq!(resolve(&registry, ValueKind::Integer, "-12"), Ok(Value::Integer(-12)));
        assert_eq!(resolve(&registry, ValueKind::Float, "2.5"), Ok(Value::Float(2.5)));
        assert_eq!(resolve(&registry, ValueKind::Boolean, "YES"), Ok(Value::Boolean(true)));
        assert_eq!(resolve(&registry, ValueKind::Text, "hola"), Ok(Value::from("hola")));
        assert!(resolve(&registry, ValueKind::Integer, "doce").is_err());
        assert!(resolve(&registry, ValueKind::Float, "inf").is_err());
    }

    #[test]
    fn custom_kinds_need_a_registered_resolver() {
        let mut registry = ResolverRegistry::<NamedSource>::new();
        let duration = ValueKind::Custom("duration".into());
        assert!(!registry.matches(&duration, "1d"));

        registry.register(
            duration.clone(),
            |_: &ResolveInput<'_, NamedSource>, raw: &str| -> Result<Value, String> {
                raw.strip_suffix('d')
                    .and_then(|n| n.parse::<i64>().ok())
                    .map(|days| Value::Integer(days * 86_400))
                    .ok_or_else(|| format!("duración inválida: {}", raw))
            },
        );
        // Los resolvers sin `matches` propio aceptan cualquier token en el recorrido.
        assert!(registry.matches(&duration, "whatever"));
        assert_eq!(resolve(&registry, duration, "2d"), Ok(Value::Integer(172_800)));
    }

    #[test]
    fn shape_matching_for_tree_walks() {
        let registry = ResolverRegistry::<NamedSource>::new();
        assert!(registry.matches(&ValueKind::Integer, "42"));
        assert!(!registry.matches(&ValueKind::Integer, "4.2"));
        assert!(registry.matches(&ValueKind::Float, "4.2"));
        assert!(!registry.matches(&ValueKind::Boolean, "maybe"));
        assert!(registry.matches(&ValueKind::Text, "anything"));
    }
}
