// src/bin/comando.rs

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use comando::cli::{Action, Cli};
use comando::config;
use comando::core::graph_display;
use comando::core::loader::register_file;
use comando::core::source::{named_source_permissions, NamedSource};
use comando::system::executor::ExecutionOutcome;
use comando::{Dispatcher, EngineConfig, ErrorKind, VerifierMode};

/// Todos los tipos de error van al mismo manejador de consola.
const REPORTED_KINDS: [ErrorKind; 8] = [
    ErrorKind::UnknownCommandToken,
    ErrorKind::IncompleteUsage,
    ErrorKind::FlagParseFailure,
    ErrorKind::ValueParseFailure,
    ErrorKind::NumberOutOfRange,
    ErrorKind::PermissionDenied,
    ErrorKind::CooldownActive,
    ErrorKind::Execution,
];

/// El punto de entrada principal de la aplicación.
fn main() {
    // Para ver los logs, ejecuta con `RUST_LOG=debug comando ...`
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run_cli(cli) {
        eprintln!("\nError: {:?}", e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    // Los usos asíncronos y las sugerencias necesitan un runtime.
    let runtime = tokio::runtime::Runtime::new().context("No se pudo crear el runtime de tokio.")?;

    let mode = if cli.type_tolerant {
        VerifierMode::TypeTolerant
    } else {
        VerifierMode::Strict
    };
    let mut engine = EngineConfig::<NamedSource>::new()
        .with_permission_checker(named_source_permissions)
        .with_verifier_mode(mode)
        .with_runtime(runtime.handle().clone());
    for kind in REPORTED_KINDS {
        engine = engine.on_error(kind, |source: &NamedSource, error| {
            eprintln!("[{}] ✖ {}", source.name, error);
        });
    }

    let mut dispatcher = Dispatcher::new(engine);
    let path = config::get_commands_path(cli.file.as_deref())?;
    let file = config::load_command_file(&path)
        .with_context(|| format!("No se pudo cargar el archivo de comandos {:?}", path))?;
    let count = register_file(&mut dispatcher, &file, |source: &NamedSource, text| {
        println!("[{}] {}", source.name, text);
    })?;
    log::info!("{} comandos cargados desde {:?}", count, path);

    let source = cli
        .permissions
        .iter()
        .fold(NamedSource::new(cli.source.clone()), |source, permission| {
            source.with_permission(permission.clone())
        });

    match cli.action {
        Action::Dispatch { tokens } => handle_dispatch(&dispatcher, &runtime, &source, &tokens),
        Action::Suggest { index, tokens } => handle_suggest(&dispatcher, &runtime, &source, tokens, index),
        Action::Tree { label } => handle_tree(&dispatcher, &label),
        Action::List => handle_list(&dispatcher),
    }
}

// --- MANEJADORES DE ACCIONES ---

fn handle_dispatch(
    dispatcher: &Dispatcher<NamedSource>,
    runtime: &tokio::runtime::Runtime,
    source: &NamedSource,
    tokens: &[String],
) -> Result<()> {
    // El manejador de consola ya mostró el motivo del fallo.
    let outcome = dispatcher
        .execute_tokens(source, tokens)
        .map_err(|e| anyhow!("'{}' no se completó ({:?}).", tokens.join(" "), e.kind()))?;

    if let ExecutionOutcome::Scheduled(task) = outcome {
        log::debug!("Esperando al uso asíncrono antes de salir");
        runtime
            .block_on(task)
            .context("La tarea asíncrona terminó de forma anómala.")?;
    }
    Ok(())
}

fn handle_suggest(
    dispatcher: &Dispatcher<NamedSource>,
    runtime: &tokio::runtime::Runtime,
    source: &NamedSource,
    mut tokens: Vec<String>,
    index: Option<usize>,
) -> Result<()> {
    let index = index.unwrap_or(tokens.len().saturating_sub(1));
    // Completar un token que aún no se ha escrito.
    while tokens.len() <= index {
        tokens.push(String::new());
    }

    let suggestions = match tokens.split_first() {
        Some((label, _)) if index == 0 => dispatcher.suggest_labels(source, label),
        Some((label, args)) => runtime.block_on(dispatcher.suggest(source, label, args, index - 1)),
        None => Vec::new(),
    };

    if suggestions.is_empty() {
        println!("(sin sugerencias)");
    }
    for suggestion in suggestions {
        println!("{}", suggestion);
    }
    Ok(())
}

fn handle_tree(dispatcher: &Dispatcher<NamedSource>, label: &str) -> Result<()> {
    let command = dispatcher
        .command(label)
        .ok_or_else(|| anyhow!("No hay ningún comando registrado como '{}'.", label))?;
    graph_display::display_command_tree(command);
    Ok(())
}

/// Muestra los comandos registrados con sus usos.
fn handle_list(dispatcher: &Dispatcher<NamedSource>) -> Result<()> {
    let mut any = false;
    for command in dispatcher.commands() {
        any = true;
        match command.description_text() {
            Some(d) => println!("\n{} : {}", command.name(), d),
            None => println!("\n{}", command.name()),
        }
        if !command.aliases().is_empty() {
            println!("  Alias: {}", command.aliases().join(", "));
        }
        if command.default_entry().is_some() {
            println!("    - {}", command.name());
        }
        for usage in command.usages() {
            match usage.description() {
                Some(d) => println!("    - {} : {}", usage.signature(), d),
                None => println!("    - {}", usage.signature()),
            }
        }
    }
    if !any {
        println!("No hay comandos registrados.");
    }
    Ok(())
}
