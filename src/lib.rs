//! # pdaviz
//!
//! A pushdown automaton simulator.
//!
//! This library provides functionality to:
//! - Describe a PDA through a builder, a JSON file or a small text format
//! - Decide whether an input is accepted, by final state and/or empty stack, searching
//!   every non-deterministic choice including ε-moves
//! - Step through a run one transition at a time and collect the state/stack trace
//!   for visualization
//! - Export the state diagram in Graphviz dot syntax

// Re-export the modules
pub mod engine;
pub mod loader;
pub mod pda;
pub mod stack;
pub mod symbol;
pub mod transition;
pub mod visualizer;

// Re-export commonly used items for convenience
pub use engine::{Configuration, RunStatus, SearchOptions, Simulator, Snapshot};
pub use loader::{load_pda_json, load_pda_text, read_pda_file, save_pda, PdaDescriptor};
pub use pda::{Acceptance, ConfigurationError, Pda, PdaBuilder};
pub use stack::{PdaStack, StackError};
pub use symbol::{Symbol, Trigger};
pub use visualizer::{save_dot, to_dot};
