// src/core/suggestions.rs

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;

use super::command::Command;
use super::config::EngineConfig;
use super::flags::flag_body;
use super::parameter::{FlagData, Parameter, ParameterKind};
use super::tree::{NodeId, UsageId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("La fuente de sugerencias falló: {0}")]
pub struct SuggestionError(pub String);

/// Lo que recibe una fuente de sugerencias para el parámetro que se completa.
pub struct SuggestionRequest<'a, S> {
    pub source: &'a S,
    pub label: &'a str,
    /// Tokens ya escritos antes del que se está completando.
    pub tokens: &'a [String],
    /// El token en curso (posiblemente vacío).
    pub input: &'a str,
    pub parameter: &'a Parameter<S>,
}

/// Fuente de textos de autocompletado. Puede consultar datos vivos, por eso
/// es asíncrona.
#[async_trait]
pub trait SuggestionSource<S>: Send + Sync {
    async fn suggest(&self, request: &SuggestionRequest<'_, S>) -> Result<Vec<String>, SuggestionError>;
}

/// Cualquier closure síncrona sirve como fuente.
#[async_trait]
impl<S, F> SuggestionSource<S> for F
where
    S: Sync,
    F: Fn(&SuggestionRequest<'_, S>) -> Vec<String> + Send + Sync,
{
    async fn suggest(&self, request: &SuggestionRequest<'_, S>) -> Result<Vec<String>, SuggestionError> {
        Ok(self(request))
    }
}

/// Lista fija de valores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSuggestions {
    values: Vec<String>,
}

impl StaticSuggestions {
    pub fn new<I, A>(values: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

#[async_trait]
impl<S: Sync> SuggestionSource<S> for StaticSuggestions {
    async fn suggest(&self, _request: &SuggestionRequest<'_, S>) -> Result<Vec<String>, SuggestionError> {
        Ok(self.values.clone())
    }
}

// --- RESOLUCIÓN ---

/// Recorre el árbol de un comando en modo permisivo y reúne candidatos de
/// cada rama alcanzable.
pub struct SuggestionResolver<'a, S> {
    command: &'a Command<S>,
    config: &'a EngineConfig<S>,
}

impl<'a, S: Send + Sync + 'static> SuggestionResolver<'a, S> {
    pub fn new(command: &'a Command<S>, config: &'a EngineConfig<S>) -> Self {
        Self { command, config }
    }

    /// `tokens` no incluye la etiqueta; `index` señala el token en curso. Un
    /// índice igual a `tokens.len()` significa que se empieza un token nuevo.
    pub async fn suggest(&self, source: &S, label: &str, tokens: &[String], index: usize) -> Vec<String> {
        let index = index.min(tokens.len());
        let before = &tokens[..index];
        let input = tokens.get(index).map(String::as_str).unwrap_or("");

        let tree = self.command.tree();
        let usages = self.command.usages();
        let frontier = tree.frontier(before, usages, &self.config.resolvers);

        let mut literals = Vec::new();
        let mut requests = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        for (node, candidates) in &frontier {
            for &child in tree.node(*node).children() {
                if !seen.insert(child) || !reachable(candidates, tree.node(child).usages()) {
                    continue;
                }
                if !tree.permitted(child, source, self.config.permissions()) {
                    log::debug!("Rama '{}' oculta por permisos", tree.node(child).label());
                    continue;
                }
                let Some(param) = tree.node(child).parameter() else {
                    continue;
                };
                match param.kind() {
                    ParameterKind::Literal { aliases } => {
                        literals.push(param.name().to_string());
                        literals.extend(aliases.iter().cloned());
                    }
                    ParameterKind::Typed(kind) => {
                        let provider = param
                            .suggestion_source()
                            .or_else(|| self.config.suggestion_source(kind))
                            .map(Arc::clone);
                        if let Some(provider) = provider {
                            requests.push((provider, param));
                        }
                    }
                    ParameterKind::Flag(_) => {}
                }
            }
        }

        if input.starts_with('-') {
            literals.extend(self.flag_aliases(&frontier, before, input));
        }

        let pending = requests.iter().map(|(provider, param)| {
            let request = SuggestionRequest {
                source,
                label,
                tokens: before,
                input,
                parameter: *param,
            };
            async move {
                match provider.suggest(&request).await {
                    Ok(values) => values,
                    Err(e) => {
                        log::debug!("Sin sugerencias para '{}': {}", request.parameter.name(), e);
                        Vec::new()
                    }
                }
            }
        });
        let branches = join_all(pending).await;

        rank(literals.into_iter().chain(branches.into_iter().flatten()), input)
    }

    /// Alias de los flags declarados por los usos aún candidatos que no
    /// aparecen ya entre los tokens anteriores.
    fn flag_aliases(&self, frontier: &[(NodeId, Vec<UsageId>)], before: &[String], input: &str) -> Vec<String> {
        // Un número negativo no es un flag a medio escribir.
        if input.len() > 1 && flag_body(input).is_none() && !input.starts_with("--") {
            return Vec::new();
        }
        let usages = self.command.usages();
        frontier
            .iter()
            .flat_map(|(_, candidates)| candidates.iter())
            .flat_map(|&id| {
                let usage = &usages[id];
                let used: HashSet<&str> = before
                    .iter()
                    .filter_map(|token| flag_body(token))
                    .flat_map(|body| usage.flag_extractor().extract(body).unwrap_or_default())
                    .map(|flag| flag.name.as_str())
                    .collect();
                usage
                    .parameters()
                    .iter()
                    .filter_map(Parameter::flag_data)
                    .filter(move |flag| !used.contains(flag.name.as_str()))
                    .flat_map(FlagData::display_aliases)
            })
            .collect()
    }
}

fn reachable(candidates: &[UsageId], passing: &[UsageId]) -> bool {
    passing.iter().any(|id| candidates.contains(id))
}

/// Fusiona, quita duplicados exactos, filtra por prefijo sin distinguir
/// mayúsculas y ordena de la misma forma.
pub fn rank(candidates: impl IntoIterator<Item = String>, input: &str) -> Vec<String> {
    let prefix = input.to_lowercase();
    let mut seen = HashSet::new();
    let mut ranked: Vec<String> = candidates
        .into_iter()
        .filter(|c| c.to_lowercase().starts_with(&prefix))
        .filter(|c| seen.insert(c.clone()))
        .collect();
    ranked.sort_by_cached_key(|c| c.to_lowercase());
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::NamedSource;
    use crate::core::usage::Usage;
    use crate::core::value::ValueKind;

    type P = Parameter<NamedSource>;

    struct Failing;

    #[async_trait]
    impl SuggestionSource<NamedSource> for Failing {
        async fn suggest(
            &self,
            _request: &SuggestionRequest<'_, NamedSource>,
        ) -> Result<Vec<String>, SuggestionError> {
            Err(SuggestionError("sin conexión".into()))
        }
    }

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| t.to_string()).collect()
    }

    fn kick() -> Command<NamedSource> {
        let mut command = Command::new("kick");
        command
            .add_usage(
                Usage::builder()
                    .param(P::string("target").suggest_values(["player1", "player2", "admin"]))
                    .param(P::switch("silent", ["s", "silent"]))
                    .build(),
            )
            .unwrap();
        command
            .add_usage(
                Usage::builder()
                    .param(P::literal_with_aliases("all", ["everyone"]).permission("kick.all"))
                    .param(P::string("reason").greedy().suggest(Failing))
                    .build(),
            )
            .unwrap();
        command
    }

    #[test]
    fn ranking_dedupes_filters_and_sorts() {
        let ranked = rank(
            ["player2", "Player1", "admin", "player2", "pLayer0"].map(String::from),
            "PL",
        );
        assert_eq!(ranked, ["pLayer0", "Player1", "player2"]);
    }

    #[tokio::test]
    async fn static_values_are_prefix_filtered() {
        let command = kick();
        let config = EngineConfig::new();
        let resolver = SuggestionResolver::new(&command, &config);
        let source = NamedSource::new("op").with_permission("*");

        let found = resolver.suggest(&source, "kick", &tokens(&["pl"]), 0).await;
        assert_eq!(found, ["player1", "player2"]);

        let everything = resolver.suggest(&source, "kick", &[], 0).await;
        assert_eq!(everything, ["admin", "all", "everyone", "player1", "player2"]);
    }

    #[tokio::test]
    async fn permissions_hide_branches() {
        let command = kick();
        let config = EngineConfig::new().with_permission_checker(crate::core::source::named_source_permissions);
        let resolver = SuggestionResolver::new(&command, &config);
        let guest = NamedSource::new("guest");

        let found = resolver.suggest(&guest, "kick", &tokens(&["a"]), 0).await;
        assert_eq!(found, ["admin"]);
    }

    #[tokio::test]
    async fn failing_sources_contribute_nothing() {
        let command = kick();
        let config = EngineConfig::new();
        let resolver = SuggestionResolver::new(&command, &config);
        let source = NamedSource::new("op");

        let found = resolver.suggest(&source, "kick", &tokens(&["all", ""]), 1).await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn flag_prefixes_offer_aliases() {
        let command = kick();
        let config = EngineConfig::new();
        let resolver = SuggestionResolver::new(&command, &config);
        let source = NamedSource::new("op");

        let found = resolver.suggest(&source, "kick", &tokens(&["Steve", "--"]), 1).await;
        assert_eq!(found, ["--silent"]);
        let found = resolver.suggest(&source, "kick", &tokens(&["Steve", "-"]), 1).await;
        assert_eq!(found, ["--silent", "-s"]);
    }

    #[tokio::test]
    async fn kind_wide_sources_apply_to_every_parameter_of_that_kind() {
        let mut command = Command::new("tp");
        command
            .add_usage(Usage::builder().param(P::float("x")).param(P::float("y")).build())
            .unwrap();
        let config = EngineConfig::new().with_suggestions(
            ValueKind::Float,
            |_: &SuggestionRequest<'_, NamedSource>| vec!["0.0".to_string(), "~".to_string()],
        );
        let resolver = SuggestionResolver::new(&command, &config);
        let source = NamedSource::new("op");

        let found = resolver.suggest(&source, "tp", &tokens(&["1.5", ""]), 1).await;
        assert_eq!(found, ["0.0", "~"]);
    }
}
