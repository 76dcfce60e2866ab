// src/core/dispatcher.rs

use std::collections::HashMap;
use std::sync::Arc;

use super::command::Command;
use super::config::EngineConfig;
use super::context::{ResolvedContext, ResolvedFlag};
use super::cooldown::CooldownManager;
use super::cursor;
use super::errors::{DispatchError, DispatchResult, RegistrationError, RegistrationResult};
use super::source::CommandSource;
use super::suggestions::{rank, SuggestionResolver};
use super::tokenizer::{ends_with_separator, tokenize};
use super::tree::{NodeId, TreeMatch, ROOT};
use super::usage::Usage;
use crate::system::executor::{execute_usage, ExecutionOutcome};

/// Resultado de un intento de despacho.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandDispatch<S> {
    Complete {
        usage: Arc<Usage<S>>,
        context: ResolvedContext<S>,
    },
    Incomplete {
        usage: Arc<Usage<S>>,
        missing: Vec<String>,
    },
    Unknown,
}

impl<S> CommandDispatch<S> {
    pub fn is_complete(&self) -> bool {
        matches!(self, CommandDispatch::Complete { .. })
    }
}

/// Registro de comandos raíz y punto de entrada del motor.
pub struct Dispatcher<S: CommandSource> {
    commands: Vec<Command<S>>,
    /// Etiqueta en minúsculas (nombre o alias) -> posición en `commands`.
    labels: HashMap<String, usize>,
    config: EngineConfig<S>,
    cooldowns: CooldownManager<S>,
}

impl<S: CommandSource> Dispatcher<S> {
    pub fn new(config: EngineConfig<S>) -> Self {
        Self {
            commands: Vec::new(),
            labels: HashMap::new(),
            config,
            cooldowns: CooldownManager::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig<S> {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig<S> {
        &mut self.config
    }

    pub fn cooldowns(&self) -> &CooldownManager<S> {
        &self.cooldowns
    }

    // --- REGISTRO ---

    /// Registra un comando raíz. Falla si su nombre o alguno de sus alias ya
    /// está ocupado; en ese caso no se registra nada.
    pub fn register(&mut self, command: Command<S>) -> RegistrationResult<()> {
        if let Some(taken) = command
            .labels()
            .find(|label| self.labels.contains_key(&label.to_lowercase()))
        {
            return Err(RegistrationError::DuplicateCommand(taken.to_string()));
        }
        let index = self.commands.len();
        for label in command.labels() {
            self.labels.insert(label.to_lowercase(), index);
        }
        log::info!(
            "Comando '{}' registrado con {} usos",
            command.name(),
            command.usages().len()
        );
        self.commands.push(command);
        Ok(())
    }

    /// Quita un comando y todas sus etiquetas. Necesita `&mut self`, así que
    /// ningún despacho puede estar leyendo el árbol a la vez.
    pub fn unregister(&mut self, label: &str) -> Option<Command<S>> {
        let index = self.labels.get(&label.to_lowercase()).copied()?;
        let command = self.commands.remove(index);
        self.labels.retain(|_, i| *i != index);
        for i in self.labels.values_mut() {
            if *i > index {
                *i -= 1;
            }
        }
        log::info!("Comando '{}' eliminado", command.name());
        Some(command)
    }

    pub fn command(&self, label: &str) -> Option<&Command<S>> {
        self.labels
            .get(&label.to_lowercase())
            .map(|&index| &self.commands[index])
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command<S>> {
        self.commands.iter()
    }

    // --- DESPACHO ---

    /// Elige el uso, comprueba permisos y cooldown y liga los argumentos.
    /// `tokens` no incluye la etiqueta.
    pub fn dispatch(&self, source: &S, label: &str, tokens: &[String]) -> DispatchResult<CommandDispatch<S>> {
        let Some(command) = self.command(label) else {
            log::debug!("Etiqueta desconocida: '{}'", label);
            return Ok(CommandDispatch::Unknown);
        };
        let tree = command.tree();
        self.check_permission(command, ROOT, source)?;

        let (usage, node) = match command.default_entry() {
            Some(default) if tokens.is_empty() => (Arc::clone(default), ROOT),
            _ => match tree.dispatch(tokens, command.usages(), &self.config.resolvers) {
                TreeMatch::Complete { usage, node } => (Arc::clone(&command.usages()[usage]), node),
                TreeMatch::Incomplete { usage, missing, .. } => {
                    return Ok(CommandDispatch::Incomplete {
                        usage: Arc::clone(&command.usages()[usage]),
                        missing,
                    });
                }
                TreeMatch::Unknown => return Ok(CommandDispatch::Unknown),
            },
        };
        log::debug!("Uso elegido: '{}'", usage.signature());

        self.check_permission(command, node, source)?;
        self.check_cooldown(&usage, source)?;
        let context = cursor::bind(source, command.name(), &usage, tokens, &self.config.resolvers)?;
        self.check_flag_permissions(command, &usage, &context, source)?;
        Ok(CommandDispatch::Complete { usage, context })
    }

    fn check_permission(&self, command: &Command<S>, node: NodeId, source: &S) -> DispatchResult<()> {
        let tree = command.tree();
        match tree.denied_at(node, source, self.config.permissions()) {
            None => Ok(()),
            Some(denied) => Err(DispatchError::PermissionDenied {
                command: command.name().to_string(),
                permission: tree.node(denied).permission_name().map(str::to_string),
            }),
        }
    }

    /// Los flags que aparecen en la entrada deben cumplir su propio permiso.
    fn check_flag_permissions(
        &self,
        command: &Command<S>,
        usage: &Usage<S>,
        context: &ResolvedContext<S>,
        source: &S,
    ) -> DispatchResult<()> {
        let denied = usage
            .parameters()
            .iter()
            .filter(|param| param.is_flag() && param.permission_name().is_some())
            .filter(|param| match context.flag(param.name()) {
                Some(ResolvedFlag::Switch(present)) => *present,
                Some(ResolvedFlag::Valued { raw, .. }) => raw.is_some(),
                None => false,
            })
            .find(|param| !self.config.has_permission(source, param.permission_name()));
        match denied {
            None => Ok(()),
            Some(param) => Err(DispatchError::PermissionDenied {
                command: command.name().to_string(),
                permission: param.permission_name().map(str::to_string),
            }),
        }
    }

    fn check_cooldown(&self, usage: &Usage<S>, source: &S) -> DispatchResult<()> {
        let Some(spec) = usage.cooldown() else {
            return Ok(());
        };
        if let Some(bypass) = spec.bypass_permission.as_deref() {
            if self.config.has_permission(source, Some(bypass)) {
                return Ok(());
            }
        }
        match self.cooldowns.remaining(source, usage.key(), spec) {
            Some(remaining) => Err(DispatchError::CooldownActive {
                usage: usage.signature(),
                remaining,
            }),
            None => Ok(()),
        }
    }

    /// Despacha una línea completa (`<etiqueta> <args...>`) y ejecuta el uso
    /// elegido. Cualquier fallo se entrega a los manejadores de errores y se
    /// devuelve también al llamador.
    pub fn execute(&self, source: &S, line: &str) -> DispatchResult<ExecutionOutcome> {
        self.execute_tokens(source, &tokenize(line))
    }

    /// Igual que [`Dispatcher::execute`], con la línea ya partida en tokens.
    pub fn execute_tokens(&self, source: &S, tokens: &[String]) -> DispatchResult<ExecutionOutcome> {
        let result = self.run_tokens(source, tokens);
        if let Err(error) = &result {
            self.config.error_handlers().report(source, error);
        }
        result
    }

    fn run_tokens(&self, source: &S, tokens: &[String]) -> DispatchResult<ExecutionOutcome> {
        let Some((label, args)) = tokens.split_first() else {
            return Err(DispatchError::UnknownCommandToken { label: String::new() });
        };
        match self.dispatch(source, label, args)? {
            CommandDispatch::Complete { usage, context } => {
                if usage.cooldown().is_some() {
                    self.cooldowns.mark(source, usage.key());
                }
                execute_usage(
                    usage,
                    source.clone(),
                    context,
                    self.config.error_handlers(),
                    self.config.runtime(),
                )
            }
            CommandDispatch::Incomplete { usage, missing } => Err(DispatchError::IncompleteUsage {
                usage: usage.signature(),
                missing,
            }),
            CommandDispatch::Unknown => Err(DispatchError::UnknownCommandToken {
                label: tokens.join(" "),
            }),
        }
    }

    // --- SUGERENCIAS ---

    /// Candidatos para el token `index` de `tokens` (sin la etiqueta).
    pub async fn suggest(&self, source: &S, label: &str, tokens: &[String], index: usize) -> Vec<String> {
        let Some(command) = self.command(label) else {
            return Vec::new();
        };
        if !command.tree().permitted(ROOT, source, self.config.permissions()) {
            return Vec::new();
        }
        SuggestionResolver::new(command, &self.config)
            .suggest(source, label, tokens, index)
            .await
    }

    /// Etiquetas de comandos raíz visibles para la fuente.
    pub fn suggest_labels(&self, source: &S, input: &str) -> Vec<String> {
        let visible = self
            .commands
            .iter()
            .filter(|command| command.tree().permitted(ROOT, source, self.config.permissions()))
            .flat_map(|command| command.labels().map(str::to_string));
        rank(visible, input)
    }

    /// Sugerencias para una línea a medio escribir: completa la etiqueta o,
    /// si ya está escrita, el último token.
    pub async fn suggest_line(&self, source: &S, line: &str) -> Vec<String> {
        let mut tokens = tokenize(line);
        if ends_with_separator(line) || tokens.is_empty() {
            tokens.push(String::new());
        }
        match tokens.split_first() {
            Some((label, [])) => self.suggest_labels(source, label),
            Some((label, args)) => self.suggest(source, label, args, args.len() - 1).await,
            None => Vec::new(),
        }
    }
}

impl<S: CommandSource> Default for Dispatcher<S> {
    fn default() -> Self {
        Self::new(EngineConfig::new())
    }
}
