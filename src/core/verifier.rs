// src/core/verifier.rs

use std::collections::HashSet;

use super::errors::ShapeViolation;
use super::parameter::{Parameter, ParameterKind};
use super::usage::Usage;

/// Estrategia de la comprobación de ambigüedad entre pares de usos.
///
/// Las dos estrategias discrepan cuando en la misma posición uno de los usos
/// tiene un literal y el otro un parámetro tipado: `Strict` lo considera
/// ambiguo si las longitudes mínimas coinciden; `TypeTolerant` no.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifierMode {
    #[default]
    Strict,
    TypeTolerant,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UsageVerifier {
    mode: VerifierMode,
}

impl UsageVerifier {
    pub fn new(mode: VerifierMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> VerifierMode {
        self.mode
    }

    /// Comprueba la forma de un único uso.
    pub fn check_shape<S>(&self, usage: &Usage<S>) -> Result<(), ShapeViolation> {
        let params = usage.parameters();
        let first = params.first().ok_or(ShapeViolation::NoParameters)?;
        if first.is_optional() {
            return Err(ShapeViolation::OptionalFirst(first.name().to_string()));
        }

        let greedy: Vec<(usize, &Parameter<S>)> =
            params.iter().enumerate().filter(|(_, p)| p.is_greedy()).collect();
        if greedy.len() > 1 {
            return Err(ShapeViolation::MultipleGreedy);
        }
        if let Some(&(index, param)) = greedy.first() {
            match param.kind() {
                ParameterKind::Flag(_) => {
                    return Err(ShapeViolation::GreedyFlag(param.name().to_string()));
                }
                ParameterKind::Literal { .. } => {
                    return Err(ShapeViolation::GreedyLiteral(param.name().to_string()));
                }
                ParameterKind::Typed(_) => {}
            }
            if index != params.len() - 1 {
                return Err(ShapeViolation::GreedyNotLast(param.name().to_string()));
            }
        }

        let mut names = HashSet::new();
        let mut aliases = HashSet::new();
        for param in params {
            if !names.insert(param.name()) {
                return Err(ShapeViolation::DuplicateParameterName(param.name().to_string()));
            }
            if let Some(flag) = param.flag_data() {
                if flag.aliases.is_empty() {
                    return Err(ShapeViolation::EmptyFlagAliases(flag.name.clone()));
                }
                for alias in &flag.aliases {
                    if !aliases.insert(alias.as_str()) {
                        return Err(ShapeViolation::DuplicateFlagAlias(alias.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn verify<S>(&self, usage: &Usage<S>) -> bool {
        self.check_shape(usage).is_ok()
    }

    /// ¿Son dos usos indistinguibles por su forma?
    pub fn are_ambiguous<S>(&self, first: &Usage<S>, second: &Usage<S>) -> bool {
        if first.min_length() != second.min_length() {
            return false;
        }
        match self.mode {
            VerifierMode::Strict => {
                if first.has_literals() && second.has_literals() {
                    same_literals(&first.literal_names(), &second.literal_names())
                } else {
                    true
                }
            }
            VerifierMode::TypeTolerant => first
                .positional()
                .zip(second.positional())
                .take(first.min_length())
                .all(|(a, b)| same_shape(a, b)),
        }
    }
}

fn same_literals(a: &[&str], b: &[&str]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

fn same_shape<S>(a: &Parameter<S>, b: &Parameter<S>) -> bool {
    match (a.kind(), b.kind()) {
        (ParameterKind::Literal { .. }, ParameterKind::Literal { .. }) => {
            a.name().eq_ignore_ascii_case(b.name())
        }
        (ParameterKind::Typed(x), ParameterKind::Typed(y)) => x == y,
        _ => false,
    }
}
