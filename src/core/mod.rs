// src/core/mod.rs

pub mod command;
pub mod config;
pub mod context;
pub mod cooldown;
pub mod cursor;
pub mod dispatcher;
pub mod errors;
pub mod flags;
pub mod graph_display;
pub mod interpolator;
pub mod loader;
pub mod parameter;
pub mod resolvers;
pub mod source;
pub mod suggestions;
pub mod tokenizer;
pub mod tree;
pub mod usage;
pub mod value;
pub mod verifier;
