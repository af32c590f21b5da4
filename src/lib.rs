// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod db;
pub mod errors;
pub mod export;
pub mod lap;
pub mod laptime;
pub mod pace;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod util;
