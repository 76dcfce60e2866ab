// src/core/context.rs

use std::collections::HashMap;

use super::parameter::Parameter;
use super::value::Value;

/// Un argumento ligado: token crudo, parámetro, posición y valor resuelto.
/// `raw` es `None` cuando el valor vino de un proveedor por defecto.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArgument<S> {
    pub raw: Option<String>,
    pub parameter: Parameter<S>,
    pub position: usize,
    pub value: Option<Value>,
}

/// Estado de un flag tras el análisis.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedFlag {
    /// Interruptor: presente o ausente.
    Switch(bool),
    /// Flag con valor. `raw` es `None` si el valor vino por defecto.
    Valued { raw: Option<String>, value: Value },
}

/// El almacén de valores ligados de un intento de despacho.
///
/// Guarda los argumentos por comando (el mismo nombre de parámetro puede
/// aparecer bajo distintos sub-comandos) y además en un mapa plano para la
/// consulta directa; en el mapa plano gana el último ligado.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContext<S> {
    label: String,
    by_command: HashMap<String, HashMap<String, ResolvedArgument<S>>>,
    arguments: HashMap<String, ResolvedArgument<S>>,
    flags: HashMap<String, ResolvedFlag>,
    command_path: Vec<String>,
}

impl<S> ResolvedContext<S> {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            command_path: vec![label.clone()],
            label,
            by_command: HashMap::new(),
            arguments: HashMap::new(),
            flags: HashMap::new(),
        }
    }

    /// La etiqueta con la que se invocó el comando raíz.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Comandos atravesados, empezando por la raíz.
    pub fn command_path(&self) -> &[String] {
        &self.command_path
    }

    pub fn current_command(&self) -> &str {
        self.command_path.last().map(String::as_str).unwrap_or(&self.label)
    }

    pub(crate) fn enter_subcommand(&mut self, name: &str) {
        self.command_path.push(name.to_string());
    }

    pub(crate) fn insert_argument(&mut self, argument: ResolvedArgument<S>)
    where
        S: Clone,
    {
        let name = argument.parameter.name().to_string();
        let command = self.current_command().to_string();
        self.by_command
            .entry(command)
            .or_default()
            .insert(name.clone(), argument.clone());
        self.arguments.insert(name, argument);
    }

    pub(crate) fn insert_flag(&mut self, name: &str, flag: ResolvedFlag) {
        self.flags.insert(name.to_string(), flag);
    }

    // --- CONSULTAS ---

    pub fn argument(&self, name: &str) -> Option<&ResolvedArgument<S>> {
        self.arguments.get(name)
    }

    pub fn argument_in(&self, command: &str, name: &str) -> Option<&ResolvedArgument<S>> {
        self.by_command.get(command).and_then(|args| args.get(name))
    }

    pub fn arguments(&self) -> impl Iterator<Item = &ResolvedArgument<S>> {
        self.arguments.values()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.argument(name).and_then(|a| a.value.as_ref())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn flag(&self, name: &str) -> Option<&ResolvedFlag> {
        self.flags.get(name)
    }

    pub fn flags(&self) -> &HashMap<String, ResolvedFlag> {
        &self.flags
    }

    /// `true` solo si el interruptor estaba presente.
    pub fn switch(&self, name: &str) -> bool {
        matches!(self.flags.get(name), Some(ResolvedFlag::Switch(true)))
    }

    pub fn flag_value(&self, name: &str) -> Option<&Value> {
        match self.flags.get(name) {
            Some(ResolvedFlag::Valued { value, .. }) => Some(value),
            _ => None,
        }
    }
}
