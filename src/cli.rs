// src/cli.rs

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::constants::CONSOLE_SOURCE;

#[derive(Parser, Debug)]
#[command(author, version, about = "comando: resuelve, ejecuta y autocompleta comandos declarados en TOML.", long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Archivo de comandos. Por defecto, `commands.toml` en el directorio de configuración.
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Nombre de la fuente que ejecuta los comandos.
    #[arg(long, default_value = CONSOLE_SOURCE, global = true)]
    pub source: String,

    /// Permisos concedidos a la fuente ('*' los concede todos). Se puede repetir.
    #[arg(short, long = "permission", global = true)]
    pub permissions: Vec<String>,

    /// Verificación tolerante a tipos en lugar de la estricta.
    #[arg(long, global = true)]
    pub type_tolerant: bool,

    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug)]
pub enum Action {
    /// Despacha y ejecuta `<etiqueta> <args...>`.
    Dispatch {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        tokens: Vec<String>,
    },
    /// Sugerencias para el token `--index` (por defecto, el último).
    Suggest {
        /// Posición del token a completar, contando la etiqueta como 0.
        #[arg(short, long)]
        index: Option<usize>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },
    /// Muestra el árbol de usos de un comando.
    Tree { label: String },
    /// Lista los comandos registrados y sus usos.
    List,
}
