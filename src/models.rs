// src/models.rs

use serde::{Deserialize, Serialize};

// --- MODELOS DEL ARCHIVO DE COMANDOS (commands.toml) ---
// Lo que el usuario escribe; `core::loader` lo convierte en `Command`s.

/// Raíz del documento: una lista de tablas `[[command]]`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct CommandFile {
    #[serde(default, rename = "command")]
    pub commands: Vec<CommandModel>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct CommandModel {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub permission: Option<String>,
    #[serde(default)]
    pub ignore_ancestor_permissions: bool,
    pub description: Option<String>,
    /// "strict" (por defecto) o "type-tolerant".
    pub verifier: Option<VerifierModel>,
    /// Respuesta del uso sin argumentos.
    pub default: Option<String>,
    #[serde(default, rename = "usage")]
    pub usages: Vec<UsageModel>,
    #[serde(default, rename = "subcommand")]
    pub subcommands: Vec<CommandModel>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum VerifierModel {
    Strict,
    TypeTolerant,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct UsageModel {
    #[serde(default)]
    pub params: Vec<ParameterModel>,
    pub description: Option<String>,
    pub cooldown: Option<CooldownModel>,
    #[serde(default, rename = "async")]
    pub asynchronous: bool,
    /// Plantilla de respuesta; ver `core::interpolator`.
    pub reply: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CooldownModel {
    pub seconds: f64,
    pub bypass: Option<String>,
}

/// Un parámetro. `kind = "literal"` declara un literal; `flag = true` un
/// flag (interruptor si no tiene `kind`); cualquier otro `kind` es el nombre
/// de un tipo de valor (`text` si se omite).
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ParameterModel {
    pub name: String,
    pub kind: Option<String>,
    #[serde(default)]
    pub flag: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub greedy: bool,
    pub permission: Option<String>,
    #[serde(default)]
    pub ignore_ancestor_permissions: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: Option<toml::Value>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub description: Option<String>,
}
