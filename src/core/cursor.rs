// src/core/cursor.rs

use super::context::{ResolvedArgument, ResolvedContext, ResolvedFlag};
use super::errors::{DispatchError, DispatchResult};
use super::flags::flag_body;
use super::parameter::{Parameter, ParameterKind};
use super::resolvers::{ResolveInput, ResolverRegistry};
use super::usage::Usage;
use super::value::{Value, ValueKind};

/// Posiciones paralelas sobre los tokens crudos y sobre los parámetros
/// posicionales del uso. Avanzan por separado porque los flags consumen
/// tokens sin ocupar posición.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub raw: usize,
    pub param: usize,
}

/// Liga los tokens a los parámetros de un uso ya elegido por el árbol.
pub struct ArgumentCursor<'a, S> {
    source: &'a S,
    usage: &'a Usage<S>,
    tokens: &'a [String],
    resolvers: &'a ResolverRegistry<S>,
    cursor: Cursor,
    context: ResolvedContext<S>,
}

impl<'a, S: Clone + 'static> ArgumentCursor<'a, S> {
    pub fn new(
        source: &'a S,
        label: &str,
        usage: &'a Usage<S>,
        tokens: &'a [String],
        resolvers: &'a ResolverRegistry<S>,
    ) -> Self {
        Self {
            source,
            usage,
            tokens,
            resolvers,
            cursor: Cursor::default(),
            context: ResolvedContext::new(label),
        }
    }

    /// Recorre todos los parámetros. El primer fallo aborta el recorrido y no
    /// se devuelve ningún contexto parcial.
    pub fn bind(mut self) -> DispatchResult<ResolvedContext<S>> {
        let usage = self.usage;
        let positional: Vec<&Parameter<S>> = usage.positional().collect();
        loop {
            self.consume_flags()?;
            let Some(param) = positional.get(self.cursor.param).copied() else {
                break;
            };
            match param.kind() {
                ParameterKind::Literal { .. } => self.bind_literal(param)?,
                ParameterKind::Typed(kind) => self.bind_typed(param, kind)?,
                ParameterKind::Flag(_) => {}
            }
            self.cursor.param += 1;
        }

        if let Some(leftover) = self.tokens.get(self.cursor.raw) {
            return Err(DispatchError::UnknownCommandToken {
                label: leftover.clone(),
            });
        }
        self.finish_flags();
        Ok(self.context)
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.cursor.raw).map(String::as_str)
    }

    fn bind_literal(&mut self, param: &Parameter<S>) -> DispatchResult<()> {
        match self.peek() {
            Some(token) if param.matches_literal(token) => {
                self.cursor.raw += 1;
                self.context.enter_subcommand(param.name());
                Ok(())
            }
            Some(token) => Err(DispatchError::UnknownCommandToken {
                label: token.to_string(),
            }),
            None => Err(self.incomplete()),
        }
    }

    fn bind_typed(&mut self, param: &Parameter<S>, kind: &ValueKind) -> DispatchResult<()> {
        let position = self.cursor.raw;
        let raw = match self.peek() {
            None if param.is_optional() => {
                self.apply_default(param, position);
                return Ok(());
            }
            None => return Err(self.incomplete()),
            Some(_) if param.is_greedy() => {
                let joined = self.tokens[position..].join(" ");
                self.cursor.raw = self.tokens.len();
                joined
            }
            Some(token) => {
                self.cursor.raw += 1;
                token.to_string()
            }
        };

        let value = self.resolve(param, kind, &raw)?;
        check_range(param, &value)?;
        self.context.insert_argument(ResolvedArgument {
            raw: Some(raw),
            parameter: param.clone(),
            position,
            value: Some(value),
        });
        Ok(())
    }

    fn apply_default(&mut self, param: &Parameter<S>, position: usize) {
        let Some(supplier) = param.default_supplier() else {
            return;
        };
        if let Some(value) = supplier(self.source, &self.context) {
            self.context.insert_argument(ResolvedArgument {
                raw: None,
                parameter: param.clone(),
                position,
                value: Some(value),
            });
        }
    }

    fn resolve(&self, param: &Parameter<S>, kind: &ValueKind, raw: &str) -> DispatchResult<Value> {
        let resolver = self
            .resolvers
            .get(kind)
            .ok_or_else(|| DispatchError::ValueParseFailure {
                parameter: param.name().to_string(),
                raw: raw.to_string(),
                reason: format!("no hay resolver para el tipo '{}'", kind),
            })?;
        let input = ResolveInput {
            source: self.source,
            context: &self.context,
            parameter: param,
            cursor: self.cursor,
        };
        resolver
            .resolve(&input, raw)
            .map_err(|reason| DispatchError::ValueParseFailure {
                parameter: param.name().to_string(),
                raw: raw.to_string(),
                reason,
            })
    }

    // --- FLAGS ---

    /// Consume todos los tokens con forma de flag en la posición actual.
    fn consume_flags(&mut self) -> DispatchResult<()> {
        let usage = self.usage;
        let extractor = usage.flag_extractor();
        if extractor.is_empty() {
            return Ok(());
        }
        while let Some(token) = self.peek() {
            let Some(body) = flag_body(token) else {
                break;
            };
            let found = extractor
                .extract(body)
                .map_err(|e| DispatchError::FlagParseFailure {
                    token: token.to_string(),
                    unmatched: e.unmatched,
                })?;
            self.cursor.raw += 1;

            for flag in found {
                let resolved = match &flag.value_kind {
                    None => ResolvedFlag::Switch(true),
                    Some(kind) => {
                        let raw = self.peek().ok_or_else(|| DispatchError::MissingFlagValue {
                            flag: flag.name.clone(),
                        })?;
                        self.cursor.raw += 1;
                        let param = usage.parameter(&flag.name).ok_or_else(|| {
                            DispatchError::MissingFlagValue {
                                flag: flag.name.clone(),
                            }
                        })?;
                        let value = self.resolve(param, kind, raw)?;
                        check_range(param, &value)?;
                        ResolvedFlag::Valued {
                            raw: Some(raw.to_string()),
                            value,
                        }
                    }
                };
                log::debug!("Flag '{}' -> {:?}", flag.name, resolved);
                self.context.insert_flag(&flag.name, resolved);
            }
        }
        Ok(())
    }

    /// Los interruptores ausentes quedan a `false` y los flags con valor
    /// ausentes toman su valor por defecto, si lo tienen.
    fn finish_flags(&mut self) {
        let usage = self.usage;
        for param in usage.parameters() {
            let Some(flag) = param.flag_data() else {
                continue;
            };
            if self.context.flag(&flag.name).is_some() {
                continue;
            }
            if flag.is_switch() {
                self.context.insert_flag(&flag.name, ResolvedFlag::Switch(false));
            } else if let Some(value) = param
                .default_supplier()
                .and_then(|supplier| supplier(self.source, &self.context))
            {
                self.context
                    .insert_flag(&flag.name, ResolvedFlag::Valued { raw: None, value });
            }
        }
    }

    fn incomplete(&self) -> DispatchError {
        DispatchError::IncompleteUsage {
            usage: self.usage.signature(),
            missing: self
                .usage
                .positional()
                .skip(self.cursor.param)
                .filter(|p| !p.is_optional())
                .map(|p| p.name().to_string())
                .collect(),
        }
    }
}

fn check_range<S>(param: &Parameter<S>, value: &Value) -> DispatchResult<()> {
    let (Some(range), Some(number)) = (param.numeric_range(), value.as_f64()) else {
        return Ok(());
    };
    if range.contains(number) {
        Ok(())
    } else {
        Err(DispatchError::NumberOutOfRange {
            parameter: param.name().to_string(),
            value: number,
            range,
        })
    }
}

/// Atajo para ligar un uso de una vez.
pub fn bind<S: Clone + 'static>(
    source: &S,
    label: &str,
    usage: &Usage<S>,
    tokens: &[String],
    resolvers: &ResolverRegistry<S>,
) -> DispatchResult<ResolvedContext<S>> {
    ArgumentCursor::new(source, label, usage, tokens, resolvers).bind()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::NamedSource;

    type P = Parameter<NamedSource>;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| t.to_string()).collect()
    }

    fn run(usage: &Usage<NamedSource>, raw: &[&str]) -> DispatchResult<ResolvedContext<NamedSource>> {
        let registry = ResolverRegistry::new();
        bind(&NamedSource::new("tester"), "cmd", usage, &tokens(raw), &registry)
    }

    fn ban() -> Usage<NamedSource> {
        Usage::builder()
            .param(P::string("target"))
            .param(P::switch("silent", ["s", "silent"]))
            .param(P::string("duration").optional().default_value("perm"))
            .param(P::string("reason").optional().greedy())
            .build()
    }

    #[test]
    fn binds_the_full_ban_line() {
        let ctx = run(&ban(), &["Steve", "-s", "1d", "greedy", "reason", "here"]).unwrap();
        assert_eq!(ctx.get_str("target"), Some("Steve"));
        assert!(ctx.switch("silent"));
        assert_eq!(ctx.get_str("duration"), Some("1d"));
        assert_eq!(ctx.get_str("reason"), Some("greedy reason here"));
        assert_eq!(ctx.argument("reason").map(|a| a.position), Some(3));
    }

    #[test]
    fn optional_parameters_fall_back_to_defaults() {
        let ctx = run(&ban(), &["Steve"]).unwrap();
        assert!(!ctx.switch("silent"));
        assert_eq!(ctx.get_str("duration"), Some("perm"));
        assert_eq!(ctx.argument("duration").and_then(|a| a.raw.clone()), None);
        // Sin proveedor: el parámetro queda sin resolver, no es un error.
        assert!(ctx.argument("reason").is_none());
    }

    #[test]
    fn literals_switch_the_current_command() {
        let usage = Usage::builder()
            .param(P::literal("group"))
            .param(P::string("name"))
            .param(P::literal_with_aliases("user", ["u"]))
            .param(P::string("name2"))
            .build();
        let ctx = run(&usage, &["group", "admins", "U", "steve"]).unwrap();
        assert_eq!(ctx.command_path(), ["cmd", "group", "user"]);
        assert_eq!(ctx.argument_in("group", "name").and_then(|a| a.raw.as_deref()), Some("admins"));
        assert_eq!(ctx.argument_in("user", "name2").and_then(|a| a.raw.as_deref()), Some("steve"));
    }

    #[test]
    fn value_failures_carry_parameter_and_input() {
        let usage = Usage::builder()
            .param(P::literal("give"))
            .param(P::integer("amount").range(Some(1.0), Some(64.0)))
            .build();
        assert_eq!(
            run(&usage, &["give", "lots"]).unwrap_err().kind(),
            crate::core::errors::ErrorKind::ValueParseFailure
        );
        match run(&usage, &["give", "65"]) {
            Err(DispatchError::NumberOutOfRange { parameter, value, .. }) => {
                assert_eq!(parameter, "amount");
                assert_eq!(value, 65.0);
            }
            other => panic!("se esperaba NumberOutOfRange, llegó {:?}", other),
        }
        assert_eq!(run(&usage, &["give", "64"]).unwrap().get_i64("amount"), Some(64));
    }

    #[test]
    fn valued_flags_consume_the_next_token() {
        let usage = Usage::builder()
            .param(P::string("target"))
            .param(P::flag("time", ["t", "time"], ValueKind::Integer).range(Some(0.0), None))
            .param(P::switch("debug", ["d"]))
            .build();

        let ctx = run(&usage, &["-dt", "30", "Steve"]).unwrap();
        assert!(ctx.switch("debug"));
        assert_eq!(ctx.flag_value("time"), Some(&Value::Integer(30)));
        assert_eq!(ctx.get_str("target"), Some("Steve"));

        assert_eq!(
            run(&usage, &["Steve", "--time"]).unwrap_err(),
            DispatchError::MissingFlagValue { flag: "time".into() }
        );
        assert_eq!(
            run(&usage, &["Steve", "-dx"]).unwrap_err(),
            DispatchError::FlagParseFailure {
                token: "-dx".into(),
                unmatched: "x".into()
            }
        );
        assert!(matches!(
            run(&usage, &["Steve", "-t", "-5"]),
            Err(DispatchError::NumberOutOfRange { .. })
        ));
    }

    #[test]
    fn absent_valued_flags_use_their_default() {
        let usage = Usage::builder()
            .param(P::string("target"))
            .param(P::flag("time", ["t"], ValueKind::Integer).default_value(60_i64))
            .build();
        let ctx = run(&usage, &["Steve"]).unwrap();
        assert_eq!(
            ctx.flag("time"),
            Some(&ResolvedFlag::Valued {
                raw: None,
                value: Value::Integer(60)
            })
        );
    }

    #[test]
    fn usages_without_flags_take_dashes_literally() {
        let usage = Usage::builder().param(P::integer("delta")).build();
        assert_eq!(run(&usage, &["-3"]).unwrap().get_i64("delta"), Some(-3));
        let text = Usage::builder().param(P::string("word")).build();
        assert_eq!(run(&text, &["-x"]).unwrap().get_str("word"), Some("-x"));
    }

    #[test]
    fn leftover_tokens_and_missing_parameters_fail() {
        let usage = Usage::builder().param(P::string("a")).param(P::string("b")).build();
        assert_eq!(
            run(&usage, &["x", "y", "z"]).unwrap_err(),
            DispatchError::UnknownCommandToken { label: "z".into() }
        );
        assert_eq!(
            run(&usage, &["x"]).unwrap_err(),
            DispatchError::IncompleteUsage {
                usage: "<a> <b>".into(),
                missing: vec!["b".into()]
            }
        );
    }
}
