//! A cooperative runtime for Scratch 3 block scripts: scripts are flattened
//! into postfix block trees, stepped one command at a time by a
//! round-robin scheduler, and run against sprites, clones and the stage
//! without any rendering.

pub mod block;
pub mod blocks;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod peripherals;
pub mod project;
pub mod registry;
pub mod sb3;
pub mod scheduler;
pub mod sprite;
pub mod thread;
pub mod value;
pub mod variables;

#[cfg(test)]
mod test;

pub use block::{Command, Expr};
pub use error::{LoadError, RuntimeError};
pub use loader::{Hat, SpriteDef};
pub use project::{Config, Project};
pub use value::Value;
