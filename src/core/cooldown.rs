// src/core/cooldown.rs

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::usage::{CooldownSpec, UsageKey};

/// Última ejecución por (fuente, uso). Cada clave se sustituye de forma
/// atómica; no hay bloqueos entre claves distintas.
#[derive(Debug)]
pub struct CooldownManager<S: Eq + Hash> {
    last_run: DashMap<(S, UsageKey), Instant>,
}

impl<S: Eq + Hash + Clone> CooldownManager<S> {
    pub fn new() -> Self {
        Self {
            last_run: DashMap::new(),
        }
    }

    /// Tiempo que le falta a la fuente para poder volver a usar el uso.
    pub fn remaining(&self, source: &S, key: &UsageKey, spec: &CooldownSpec) -> Option<Duration> {
        self.remaining_at(source, key, spec, Instant::now())
    }

    fn remaining_at(&self, source: &S, key: &UsageKey, spec: &CooldownSpec, now: Instant) -> Option<Duration> {
        let entry_key = (source.clone(), key.clone());
        let last = *self.last_run.get(&entry_key)?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < spec.duration {
            Some(spec.duration - elapsed)
        } else {
            // Caducado.
            self.last_run.remove(&entry_key);
            None
        }
    }

    pub fn mark(&self, source: &S, key: &UsageKey) {
        self.mark_at(source, key, Instant::now());
    }

    fn mark_at(&self, source: &S, key: &UsageKey, at: Instant) {
        log::debug!("Cooldown iniciado para {:?}", key);
        self.last_run.insert((source.clone(), key.clone()), at);
    }

    pub fn reset(&self, source: &S, key: &UsageKey) {
        self.last_run.remove(&(source.clone(), key.clone()));
    }

    pub fn clear(&self) {
        self.last_run.clear();
    }

    pub fn len(&self) -> usize {
        self.last_run.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_run.is_empty()
    }
}

impl<S: Eq + Hash + Clone> Default for CooldownManager<S> {
    fn default() -> Self {
        Self::new()
    }
}
