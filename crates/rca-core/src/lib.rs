pub mod agent_loop;
pub mod capability;
pub mod config;
pub mod controller;
pub mod detector;
pub mod embeddings;
pub mod error;
pub mod incident;
pub mod io;
pub mod paths;
pub mod rules;
pub mod similarity;
pub mod state;
pub mod steps;
pub mod store;
pub mod types;

pub use controller::{Collaborators, Operator, RootController, RunOutcome};
pub use error::{RcaError, Result};
