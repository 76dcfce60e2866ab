// src/config.rs

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{COMMANDS_FILENAME, CONFIG_DIR_NAME};
use crate::models::CommandFile;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No se pudo encontrar el directorio de configuración del sistema.")]
    NoConfigDir,
    #[error("No se pudo leer el archivo de comandos {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error al parsear {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("El parámetro '{parameter}' usa el tipo '{kind}', que no tiene resolver registrado.")]
    UnknownValueKind { parameter: String, kind: String },
    #[error("Valor por defecto inválido para '{parameter}': {reason}")]
    InvalidDefault { parameter: String, reason: String },
    #[error("Cooldown inválido en '{command}': {seconds} segundos")]
    InvalidCooldown { command: String, seconds: f64 },
    #[error(transparent)]
    Registration(#[from] crate::core::errors::RegistrationError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Devuelve la ruta al directorio de configuración de comando.
/// No lo crea: solo se lee de él.
pub fn get_config_dir() -> ConfigResult<PathBuf> {
    let config_path = dirs::config_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join(CONFIG_DIR_NAME);
    log::info!("Directorio de config: {:?}", config_path);
    Ok(config_path)
}

/// La ruta explícita si se dio; si no, `commands.toml` en el directorio de configuración.
pub fn get_commands_path(explicit: Option<&Path>) -> ConfigResult<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => get_config_dir().map(|dir| dir.join(COMMANDS_FILENAME)),
    }
}

/// Lee y deserializa un archivo de comandos.
pub fn load_command_file(path: &Path) -> ConfigResult<CommandFile> {
    log::debug!("Leyendo archivo de comandos {:?}", path);
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
