// src/core/loader.rs

use std::sync::Arc;
use std::time::Duration;

use super::command::Command;
use super::config::EngineConfig;
use super::context::ResolvedContext;
use super::dispatcher::Dispatcher;
use super::interpolator::Interpolator;
use super::parameter::Parameter;
use super::source::CommandSource;
use super::usage::{CoordinatorMode, HandlerResult, Usage};
use super::value::{Value, ValueKind};
use super::verifier::VerifierMode;
use crate::config::{ConfigError, ConfigResult};
use crate::models::{CommandFile, CommandModel, ParameterModel, UsageModel, VerifierModel};

/// Recibe las respuestas ya interpoladas de los comandos declarativos.
pub type ReplySink<S> = Arc<dyn Fn(&S, String) + Send + Sync>;

/// Convierte los modelos de `commands.toml` en comandos registrables.
pub struct CommandLoader<'a, S> {
    config: &'a EngineConfig<S>,
    sink: ReplySink<S>,
}

impl<'a, S: CommandSource> CommandLoader<'a, S> {
    pub fn new<F>(config: &'a EngineConfig<S>, sink: F) -> Self
    where
        F: Fn(&S, String) + Send + Sync + 'static,
    {
        Self {
            config,
            sink: Arc::new(sink),
        }
    }

    pub fn load(&self, file: &CommandFile) -> ConfigResult<Vec<Command<S>>> {
        file.commands.iter().map(|model| self.build_command(model)).collect()
    }

    pub fn build_command(&self, model: &CommandModel) -> ConfigResult<Command<S>> {
        let mode = match model.verifier {
            Some(VerifierModel::Strict) => VerifierMode::Strict,
            Some(VerifierModel::TypeTolerant) => VerifierMode::TypeTolerant,
            None => self.config.verifier_mode(),
        };
        let mut command = Command::new(model.name.clone()).verifier_mode(mode);
        for alias in &model.aliases {
            command = command.alias(alias.clone());
        }
        if let Some(permission) = &model.permission {
            command = command.permission(permission.clone());
        }
        if model.ignore_ancestor_permissions {
            command = command.ignore_ancestor_permissions();
        }
        if let Some(description) = &model.description {
            command = command.description(description.clone());
        }
        if let Some(reply) = &model.default {
            let usage = Usage::builder().executes(self.reply_handler(reply.clone())).build();
            command = command.default_usage(usage);
        }

        for usage in &model.usages {
            command.add_usage(self.build_usage(&model.name, usage)?)?;
        }
        for child in &model.subcommands {
            command.add_subcommand(self.build_command(child)?)?;
        }
        log::debug!("Comando declarativo '{}' construido", model.name);
        Ok(command)
    }

    fn build_usage(&self, command: &str, model: &UsageModel) -> ConfigResult<Usage<S>> {
        let mut builder = Usage::builder();
        for param in &model.params {
            builder = builder.param(self.build_parameter(param)?);
        }
        if let Some(cooldown) = &model.cooldown {
            if !cooldown.seconds.is_finite() || cooldown.seconds < 0.0 {
                return Err(ConfigError::InvalidCooldown {
                    command: command.to_string(),
                    seconds: cooldown.seconds,
                });
            }
            builder = builder.cooldown(
                Duration::from_secs_f64(cooldown.seconds),
                cooldown.bypass.as_deref(),
            );
        }
        if model.asynchronous {
            builder = builder.coordinator(CoordinatorMode::Asynchronous);
        }
        if let Some(description) = &model.description {
            builder = builder.description(description.clone());
        }
        if let Some(reply) = &model.reply {
            builder = builder.executes(self.reply_handler(reply.clone()));
        }
        Ok(builder.build())
    }

    fn build_parameter(&self, model: &ParameterModel) -> ConfigResult<Parameter<S>> {
        let name = model.name.clone();
        let kind = model.kind.as_deref();
        let mut param = if kind.is_some_and(|k| k.eq_ignore_ascii_case("literal")) {
            Parameter::literal_with_aliases(name, model.aliases.clone())
        } else if model.flag {
            match kind {
                None => Parameter::switch(name, model.aliases.clone()),
                Some(k) => Parameter::flag(name, model.aliases.clone(), self.value_kind(model, k)?),
            }
        } else {
            Parameter::typed(name, self.value_kind(model, kind.unwrap_or("text"))?)
        };

        if model.optional {
            param = param.optional();
        }
        if model.greedy {
            param = param.greedy();
        }
        if let Some(permission) = &model.permission {
            param = param.permission(permission.clone());
        }
        if model.ignore_ancestor_permissions {
            param = param.ignore_ancestor_permissions();
        }
        if model.min.is_some() || model.max.is_some() {
            param = param.range(model.min, model.max);
        }
        if let Some(default) = &model.default {
            param = param.default_value(toml_value(model, default)?);
        }
        if !model.suggestions.is_empty() {
            param = param.suggest_values(model.suggestions.clone());
        }
        if let Some(description) = &model.description {
            param = param.description(description.clone());
        }
        Ok(param)
    }

    fn value_kind(&self, model: &ParameterModel, name: &str) -> ConfigResult<ValueKind> {
        let kind = ValueKind::from_name(name);
        if self.config.resolvers.get(&kind).is_none() {
            return Err(ConfigError::UnknownValueKind {
                parameter: model.name.clone(),
                kind: name.to_string(),
            });
        }
        Ok(kind)
    }

    fn reply_handler(&self, template: String) -> impl Fn(&S, &ResolvedContext<S>) -> HandlerResult + Send + Sync + 'static {
        let sink = Arc::clone(&self.sink);
        move |source: &S, context: &ResolvedContext<S>| {
            sink(source, Interpolator::new(source.name(), context).interpolate(&template));
            Ok(())
        }
    }
}

fn toml_value(model: &ParameterModel, value: &toml::Value) -> ConfigResult<Value> {
    match value {
        toml::Value::String(s) => Ok(Value::Text(s.clone())),
        toml::Value::Integer(n) => Ok(Value::Integer(*n)),
        toml::Value::Float(n) => Ok(Value::Float(*n)),
        toml::Value::Boolean(b) => Ok(Value::Boolean(*b)),
        other => Err(ConfigError::InvalidDefault {
            parameter: model.name.clone(),
            reason: format!("tipo TOML no admitido: {}", other.type_str()),
        }),
    }
}

/// Construye y registra todos los comandos de un archivo. Devuelve cuántos
/// se registraron; se detiene en el primer error.
pub fn register_file<S, F>(dispatcher: &mut Dispatcher<S>, file: &CommandFile, sink: F) -> ConfigResult<usize>
where
    S: CommandSource,
    F: Fn(&S, String) + Send + Sync + 'static,
{
    let commands = CommandLoader::new(dispatcher.config(), sink).load(file)?;
    let count = commands.len();
    for command in commands {
        dispatcher.register(command)?;
    }
    log::info!("{} comandos declarativos registrados", count);
    Ok(count)
}
