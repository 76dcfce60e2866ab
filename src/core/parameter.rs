// src/core/parameter.rs

use std::fmt;
use std::sync::Arc;

use super::context::ResolvedContext;
use super::suggestions::{StaticSuggestions, SuggestionSource};
use super::value::{Value, ValueKind};

/// Produce el valor de un parámetro opcional ausente a partir de la fuente y
/// de lo que ya se ha resuelto. Devolver `None` deja el parámetro sin resolver.
pub type DefaultSupplier<S> = Arc<dyn Fn(&S, &ResolvedContext<S>) -> Option<Value> + Send + Sync>;

/// Datos de un flag: nombre canónico, alias y, si no es un interruptor, el
/// tipo del valor que lo acompaña.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagData {
    pub name: String,
    pub aliases: Vec<String>,
    pub value_kind: Option<ValueKind>,
}

impl FlagData {
    pub fn is_switch(&self) -> bool {
        self.value_kind.is_none()
    }

    /// `-s` para alias de un carácter, `--silent` para el resto.
    pub fn display_aliases(&self) -> Vec<String> {
        self.aliases
            .iter()
            .map(|alias| {
                if alias.chars().count() == 1 {
                    format!("-{}", alias)
                } else {
                    format!("--{}", alias)
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    /// Un sub-comando: texto fijo más sus alias.
    Literal { aliases: Vec<String> },
    Typed(ValueKind),
    Flag(FlagData),
}

/// Intervalo cerrado para parámetros numéricos. Los extremos ausentes no limitan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min = self.min.map(|m| m.to_string()).unwrap_or_else(|| "-∞".to_string());
        let max = self.max.map(|m| m.to_string()).unwrap_or_else(|| "∞".to_string());
        write!(f, "[{}, {}]", min, max)
    }
}

/// Descriptor inmutable de una posición de argumento dentro de un uso.
pub struct Parameter<S> {
    name: String,
    kind: ParameterKind,
    optional: bool,
    greedy: bool,
    permission: Option<String>,
    ignore_ancestor_permissions: bool,
    range: Option<NumericRange>,
    default: Option<DefaultSupplier<S>>,
    suggestions: Option<Arc<dyn SuggestionSource<S>>>,
    description: Option<String>,
}

impl<S> Parameter<S> {
    fn with_kind(name: impl Into<String>, kind: ParameterKind) -> Self {
        let optional = matches!(kind, ParameterKind::Flag(_));
        Self {
            name: name.into(),
            kind,
            optional,
            greedy: false,
            permission: None,
            ignore_ancestor_permissions: false,
            range: None,
            default: None,
            suggestions: None,
            description: None,
        }
    }

    // --- CONSTRUCTORES ---

    pub fn literal(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParameterKind::Literal { aliases: Vec::new() })
    }

    pub fn literal_with_aliases<I, A>(name: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self::with_kind(
            name,
            ParameterKind::Literal {
                aliases: aliases.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn typed(name: impl Into<String>, kind: ValueKind) -> Self {
        Self::with_kind(name, ParameterKind::Typed(kind))
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::typed(name, ValueKind::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::typed(name, ValueKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::typed(name, ValueKind::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::typed(name, ValueKind::Boolean)
    }

    /// Un flag de presencia (`-s`, `--silent`).
    pub fn switch<I, A>(name: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let name = name.into();
        let data = FlagData {
            name: name.clone(),
            aliases: aliases.into_iter().map(Into::into).collect(),
            value_kind: None,
        };
        Self::with_kind(name, ParameterKind::Flag(data))
    }

    /// Un flag que consume el token siguiente como valor.
    pub fn flag<I, A>(name: impl Into<String>, aliases: I, value_kind: ValueKind) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let name = name.into();
        let data = FlagData {
            name: name.clone(),
            aliases: aliases.into_iter().map(Into::into).collect(),
            value_kind: Some(value_kind),
        };
        Self::with_kind(name, ParameterKind::Flag(data))
    }

    // --- MODIFICADORES ---

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn greedy(mut self) -> Self {
        self.greedy = true;
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn ignore_ancestor_permissions(mut self) -> Self {
        self.ignore_ancestor_permissions = true;
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.range = Some(NumericRange::new(min, max));
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self
    where
        S: 'static,
    {
        let value = value.into();
        self.default = Some(Arc::new(move |_: &S, _: &ResolvedContext<S>| {
            Some(value.clone())
        }));
        self
    }

    pub fn default_with<F>(mut self, supplier: F) -> Self
    where
        F: Fn(&S, &ResolvedContext<S>) -> Option<Value> + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(supplier));
        self
    }

    pub fn suggest(mut self, source: impl SuggestionSource<S> + 'static) -> Self {
        self.suggestions = Some(Arc::new(source));
        self
    }

    pub fn suggest_values<I, A>(self, values: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
        S: Send + Sync,
    {
        self.suggest(StaticSuggestions::new(values))
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    // --- CONSULTAS ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_greedy(&self) -> bool {
        self.greedy
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ParameterKind::Literal { .. })
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.kind, ParameterKind::Flag(_))
    }

    pub fn is_typed(&self) -> bool {
        matches!(self.kind, ParameterKind::Typed(_))
    }

    pub fn value_kind(&self) -> Option<&ValueKind> {
        match &self.kind {
            ParameterKind::Typed(kind) => Some(kind),
            ParameterKind::Flag(data) => data.value_kind.as_ref(),
            ParameterKind::Literal { .. } => None,
        }
    }

    pub fn flag_data(&self) -> Option<&FlagData> {
        match &self.kind {
            ParameterKind::Flag(data) => Some(data),
            _ => None,
        }
    }

    pub fn literal_aliases(&self) -> &[String] {
        match &self.kind {
            ParameterKind::Literal { aliases } => aliases,
            _ => &[],
        }
    }

    pub fn permission_name(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    pub fn ignores_ancestor_permissions(&self) -> bool {
        self.ignore_ancestor_permissions
    }

    pub fn numeric_range(&self) -> Option<NumericRange> {
        self.range
    }

    pub fn default_supplier(&self) -> Option<&DefaultSupplier<S>> {
        self.default.as_ref()
    }

    pub fn suggestion_source(&self) -> Option<&Arc<dyn SuggestionSource<S>>> {
        self.suggestions.as_ref()
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// El token coincide con el nombre del literal o con alguno de sus alias.
    pub fn matches_literal(&self, token: &str) -> bool {
        self.is_literal()
            && (self.name.eq_ignore_ascii_case(token)
                || self
                    .literal_aliases()
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(token)))
    }

    /// Dos parámetros pueden compartir nodo en el árbol si son el mismo
    /// literal o el mismo parámetro tipado (nombre, tipo, opcional y greedy).
    /// El recorrido lee `is_greedy()` del nodo compartido.
    pub fn shares_node_with(&self, other: &Parameter<S>) -> bool {
        match (&self.kind, &other.kind) {
            (ParameterKind::Literal { .. }, ParameterKind::Literal { .. }) => {
                self.name.eq_ignore_ascii_case(&other.name)
            }
            (ParameterKind::Typed(a), ParameterKind::Typed(b)) => {
                self.name == other.name
                    && a == b
                    && self.is_optional() == other.is_optional()
                    && self.is_greedy() == other.is_greedy()
            }
            _ => false,
        }
    }

    /// Representación usada en las firmas de los usos.
    pub fn format(&self) -> String {
        match &self.kind {
            ParameterKind::Literal { .. } => self.name.clone(),
            ParameterKind::Flag(data) => {
                let aliases = data.display_aliases().join("|");
                match &data.value_kind {
                    None => format!("[{}]", aliases),
                    Some(_) => format!("[{} <{}>]", aliases, self.name),
                }
            }
            ParameterKind::Typed(_) => {
                let dots = if self.greedy { "..." } else { "" };
                if self.optional {
                    format!("[{}{}]", self.name, dots)
                } else {
                    format!("<{}{}>", self.name, dots)
                }
            }
        }
    }
}

impl<S> Clone for Parameter<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind.clone(),
            optional: self.optional,
            greedy: self.greedy,
            permission: self.permission.clone(),
            ignore_ancestor_permissions: self.ignore_ancestor_permissions,
            range: self.range,
            default: self.default.clone(),
            suggestions: self.suggestions.clone(),
            description: self.description.clone(),
        }
    }
}

impl<S> PartialEq for Parameter<S> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.optional == other.optional
            && self.greedy == other.greedy
            && self.permission == other.permission
            && self.range == other.range
    }
}

impl<S> fmt::Debug for Parameter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .field("greedy", &self.greedy)
            .field("permission", &self.permission)
            .field("range", &self.range)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}
