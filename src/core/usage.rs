// src/core/usage.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::context::ResolvedContext;
use super::flags::FlagExtractor;
use super::parameter::{FlagData, Parameter};

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// El manejador opaco que ejecuta un uso ya resuelto.
pub type Handler<S> = Arc<dyn Fn(&S, &ResolvedContext<S>) -> HandlerResult + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownSpec {
    pub duration: Duration,
    /// Quien tenga este permiso no sufre el cooldown.
    pub bypass_permission: Option<String>,
}

/// Dónde se ejecuta el manejador de un uso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatorMode {
    #[default]
    Synchronous,
    Asynchronous,
}

/// Identidad estable de un uso registrado: ruta del comando e índice de registro.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageKey {
    pub owner: String,
    pub index: usize,
}

/// Una sintaxis completa y ordenada para invocar un comando.
/// Se construye una vez con `UsageBuilder` y es inmutable desde entonces.
pub struct Usage<S> {
    params: Vec<Parameter<S>>,
    handler: Handler<S>,
    cooldown: Option<CooldownSpec>,
    coordinator: CoordinatorMode,
    description: Option<String>,
    flags: FlagExtractor,
    key: UsageKey,
}

impl<S: 'static> Usage<S> {
    pub fn builder() -> UsageBuilder<S> {
        UsageBuilder::new()
    }
}

impl<S> Usage<S> {
    pub fn parameters(&self) -> &[Parameter<S>] {
        &self.params
    }

    /// Parámetros que ocupan una posición (literales y tipados, no flags).
    pub fn positional(&self) -> impl Iterator<Item = &Parameter<S>> {
        self.params.iter().filter(|p| !p.is_flag())
    }

    pub fn positional_count(&self) -> usize {
        self.positional().count()
    }

    /// Parámetros no opcionales y que no son flags.
    pub fn min_length(&self) -> usize {
        self.params
            .iter()
            .filter(|p| !p.is_optional() && !p.is_flag())
            .count()
    }

    pub fn max_length(&self) -> usize {
        self.params.len()
    }

    pub fn has_literals(&self) -> bool {
        self.params.iter().any(Parameter::is_literal)
    }

    pub fn literal_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.is_literal())
            .map(Parameter::name)
            .collect()
    }

    pub fn flag_extractor(&self) -> &FlagExtractor {
        &self.flags
    }

    pub fn has_flags(&self) -> bool {
        !self.flags.is_empty()
    }

    pub fn handler(&self) -> &Handler<S> {
        &self.handler
    }

    pub fn cooldown(&self) -> Option<&CooldownSpec> {
        self.cooldown.as_ref()
    }

    pub fn coordinator(&self) -> CoordinatorMode {
        self.coordinator
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn key(&self) -> &UsageKey {
        &self.key
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter<S>> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// Firma legible: `ban <target> [-s|--silent] [duration] [reason...]`.
    pub fn signature(&self) -> String {
        let mut parts = Vec::with_capacity(self.params.len() + 1);
        if !self.key.owner.is_empty() {
            parts.push(self.key.owner.clone());
        }
        parts.extend(self.params.iter().map(Parameter::format));
        parts.join(" ")
    }

    pub(crate) fn assign_key(&mut self, owner: &str, index: usize) {
        self.key = UsageKey {
            owner: owner.to_string(),
            index,
        };
    }

    /// Copia del uso con un literal delante; así se aplanan los sub-comandos
    /// dentro del árbol del padre.
    pub(crate) fn prefixed(&self, literal: Parameter<S>) -> Usage<S> {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        params.push(literal);
        params.extend(self.params.iter().cloned());
        Usage {
            flags: self.flags.clone(),
            params,
            handler: Arc::clone(&self.handler),
            cooldown: self.cooldown.clone(),
            coordinator: self.coordinator,
            description: self.description.clone(),
            key: self.key.clone(),
        }
    }
}

impl<S> PartialEq for Usage<S> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.params == other.params
    }
}

impl<S> fmt::Debug for Usage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Usage")
            .field("signature", &self.signature())
            .field("cooldown", &self.cooldown)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

pub struct UsageBuilder<S> {
    params: Vec<Parameter<S>>,
    handler: Option<Handler<S>>,
    cooldown: Option<CooldownSpec>,
    coordinator: CoordinatorMode,
    description: Option<String>,
}

fn noop_handler<S: 'static>() -> Handler<S> {
    Arc::new(|_: &S, _: &ResolvedContext<S>| -> HandlerResult { Ok(()) })
}

impl<S: 'static> UsageBuilder<S> {
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            handler: None,
            cooldown: None,
            coordinator: CoordinatorMode::default(),
            description: None,
        }
    }

    pub fn param(mut self, parameter: Parameter<S>) -> Self {
        self.params.push(parameter);
        self
    }

    pub fn params(mut self, parameters: impl IntoIterator<Item = Parameter<S>>) -> Self {
        self.params.extend(parameters);
        self
    }

    pub fn cooldown(mut self, duration: Duration, bypass_permission: Option<&str>) -> Self {
        self.cooldown = Some(CooldownSpec {
            duration,
            bypass_permission: bypass_permission.map(str::to_string),
        });
        self
    }

    pub fn coordinator(mut self, mode: CoordinatorMode) -> Self {
        self.coordinator = mode;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn executes<F>(mut self, handler: F) -> Self
    where
        F: Fn(&S, &ResolvedContext<S>) -> HandlerResult + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// No valida la forma: eso lo hace el verificador al registrar.
    pub fn build(self) -> Usage<S> {
        let flag_data: Vec<&FlagData> = self.params.iter().filter_map(Parameter::flag_data).collect();
        let flags = FlagExtractor::new(flag_data);
        Usage {
            flags,
            params: self.params,
            handler: self.handler.unwrap_or_else(noop_handler),
            cooldown: self.cooldown,
            coordinator: self.coordinator,
            description: self.description,
            key: UsageKey {
                owner: String::new(),
                index: 0,
            },
        }
    }
}

impl<S: 'static> Default for UsageBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
