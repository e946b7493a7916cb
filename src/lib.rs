// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod analysis;
pub mod app_dirs;
pub mod config;
pub mod feedback;
pub mod player;
pub mod remote;
pub mod runtime;
pub mod selection;
pub mod session;
pub mod timestamp;
