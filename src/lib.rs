// src/lib.rs

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;

pub use crate::core::command::Command;
pub use crate::core::config::EngineConfig;
pub use crate::core::context::{ResolvedContext, ResolvedFlag};
pub use crate::core::dispatcher::{CommandDispatch, Dispatcher};
pub use crate::core::errors::{DispatchError, ErrorKind, RegistrationError};
pub use crate::core::parameter::Parameter;
pub use crate::core::source::{CommandSource, NamedSource, PermissionChecker};
pub use crate::core::usage::{CoordinatorMode, Usage};
pub use crate::core::value::{Value, ValueKind};
pub use crate::core::verifier::VerifierMode;
