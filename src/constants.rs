// src/constants.rs

/// El nombre del directorio de comando dentro del directorio de configuración del sistema.
pub const CONFIG_DIR_NAME: &str = "comando";

/// El nombre del archivo de comandos declarativos (en ~/.config/comando/).
pub const COMMANDS_FILENAME: &str = "commands.toml";

/// Nombre de la fuente que usa el binario cuando no se indica otra.
pub const CONSOLE_SOURCE: &str = "console";
