// src/core/errors.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::parameter::NumericRange;

// --- ERRORES DE REGISTRO ---

/// Motivos por los que la forma de un uso no es válida.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeViolation {
    #[error("el uso no tiene parámetros")]
    NoParameters,
    #[error("hay más de un parámetro voraz")]
    MultipleGreedy,
    #[error("el parámetro voraz '{0}' no está en la última posición")]
    GreedyNotLast(String),
    #[error("el primer parámetro '{0}' es opcional")]
    OptionalFirst(String),
    #[error("el flag '{0}' no puede ser voraz")]
    GreedyFlag(String),
    #[error("el literal '{0}' no puede ser voraz")]
    GreedyLiteral(String),
    #[error("el nombre de parámetro '{0}' está repetido")]
    DuplicateParameterName(String),
    #[error("el alias de flag '{0}' está repetido")]
    DuplicateFlagAlias(String),
    #[error("el flag '{0}' no declara ningún alias")]
    EmptyFlagAliases(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("El uso '{second}' del comando '{command}' es ambiguo con '{first}'.")]
    AmbiguousUsage {
        command: String,
        first: String,
        second: String,
    },
    #[error("El uso '{usage}' del comando '{command}' no es válido: {violation}.")]
    InvalidUsageShape {
        command: String,
        usage: String,
        violation: ShapeViolation,
    },
    #[error("Ya existe un comando registrado como '{0}'.")]
    DuplicateCommand(String),
}

pub type RegistrationResult<T> = Result<T, RegistrationError>;

// --- ERRORES DE DESPACHO ---

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Comando desconocido: '{label}'.")]
    UnknownCommandToken { label: String },
    #[error("Uso incompleto de '{usage}'; faltan: {}.", .missing.join(", "))]
    IncompleteUsage { usage: String, missing: Vec<String> },
    #[error("Flags no reconocidos en '{token}': '{unmatched}'.")]
    FlagParseFailure { token: String, unmatched: String },
    #[error("El flag '{flag}' necesita un valor.")]
    MissingFlagValue { flag: String },
    #[error("Valor inválido '{raw}' para '{parameter}': {reason}")]
    ValueParseFailure {
        parameter: String,
        raw: String,
        reason: String,
    },
    #[error("El valor {value} de '{parameter}' está fuera del rango {range}.")]
    NumberOutOfRange {
        parameter: String,
        value: f64,
        range: NumericRange,
    },
    #[error("Sin permiso para ejecutar '{command}'.")]
    PermissionDenied {
        command: String,
        permission: Option<String>,
    },
    #[error("Espera {:.1}s antes de volver a usar '{usage}'.", .remaining.as_secs_f64())]
    CooldownActive { usage: String, remaining: Duration },
    #[error("El manejador de '{usage}' falló: {message}")]
    Execution { usage: String, message: String },
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Clasificación de los errores de despacho; es la clave de los manejadores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownCommandToken,
    IncompleteUsage,
    FlagParseFailure,
    ValueParseFailure,
    NumberOutOfRange,
    PermissionDenied,
    CooldownActive,
    Execution,
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::UnknownCommandToken { .. } => ErrorKind::UnknownCommandToken,
            DispatchError::IncompleteUsage { .. } => ErrorKind::IncompleteUsage,
            DispatchError::FlagParseFailure { .. } | DispatchError::MissingFlagValue { .. } => {
                ErrorKind::FlagParseFailure
            }
            DispatchError::ValueParseFailure { .. } => ErrorKind::ValueParseFailure,
            DispatchError::NumberOutOfRange { .. } => ErrorKind::NumberOutOfRange,
            DispatchError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            DispatchError::CooldownActive { .. } => ErrorKind::CooldownActive,
            DispatchError::Execution { .. } => ErrorKind::Execution,
        }
    }
}

// --- MANEJADORES DE ERRORES ---

pub type ErrorHandler<S> = Arc<dyn Fn(&S, &DispatchError) + Send + Sync>;

/// Manejadores "auto-descriptivos" por tipo de error. Los tipos sin manejador
/// acaban en el log de depuración.
pub struct ErrorHandlers<S> {
    handlers: HashMap<ErrorKind, ErrorHandler<S>>,
}

impl<S: std::fmt::Debug> ErrorHandlers<S> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, kind: ErrorKind, handler: F)
    where
        F: Fn(&S, &DispatchError) + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
    }

    pub fn is_handled(&self, kind: ErrorKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn report(&self, source: &S, error: &DispatchError) {
        match self.handlers.get(&error.kind()) {
            Some(handler) => handler(source, error),
            None => log::debug!(
                "Error de despacho sin manejador ({:?}) para {:?}: {}",
                error.kind(),
                source,
                error
            ),
        }
    }
}

impl<S> Clone for ErrorHandlers<S> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<S: std::fmt::Debug> Default for ErrorHandlers<S> {
    fn default() -> Self {
        Self::new()
    }
}
