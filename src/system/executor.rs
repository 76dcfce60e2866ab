// src/system/executor.rs

use std::fmt::Debug;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::core::context::ResolvedContext;
use crate::core::errors::{DispatchError, DispatchResult, ErrorHandlers};
use crate::core::usage::{CoordinatorMode, Usage};

/// Qué pasó con el manejador tras entregarlo al coordinador.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// Se ejecutó en el hilo que llamó.
    Completed,
    /// Se programó en el pool de tokio; el llamador no espera.
    Scheduled(JoinHandle<()>),
}

impl ExecutionOutcome {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, ExecutionOutcome::Scheduled(_))
    }
}

/// Ejecuta el manejador de un uso según su modo de coordinación.
///
/// En modo síncrono un fallo del manejador vuelve al llamador como
/// `DispatchError::Execution`. En modo asíncrono el llamador no se bloquea y
/// los fallos van directamente a los manejadores de errores.
pub fn execute_usage<S>(
    usage: Arc<Usage<S>>,
    source: S,
    context: ResolvedContext<S>,
    handlers: &ErrorHandlers<S>,
    runtime: Option<&Handle>,
) -> DispatchResult<ExecutionOutcome>
where
    S: Debug + Send + Sync + 'static,
{
    log::info!("Ejecutando uso: '{}'", usage.signature());

    let handle = match usage.coordinator() {
        CoordinatorMode::Synchronous => None,
        CoordinatorMode::Asynchronous => runtime.cloned().or_else(|| Handle::try_current().ok()),
    };

    let Some(handle) = handle else {
        if usage.coordinator() == CoordinatorMode::Asynchronous {
            log::warn!(
                "No hay runtime de tokio para '{}'; se ejecuta en el hilo actual",
                usage.signature()
            );
        }
        return run_handler(&usage, &source, &context).map(|_| ExecutionOutcome::Completed);
    };

    let handlers = handlers.clone();
    let task = handle.spawn_blocking(move || {
        if let Err(error) = run_handler(&usage, &source, &context) {
            handlers.report(&source, &error);
        }
    });
    Ok(ExecutionOutcome::Scheduled(task))
}

fn run_handler<S>(usage: &Usage<S>, source: &S, context: &ResolvedContext<S>) -> DispatchResult<()> {
    (usage.handler())(source, context).map_err(|e| DispatchError::Execution {
        usage: usage.signature(),
        message: e.to_string(),
    })
}
