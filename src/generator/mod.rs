pub mod context;
pub mod errors;
pub mod nodes;
pub mod progress;
pub mod state;
pub mod workflow;
