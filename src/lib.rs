// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only rendering in main.rs.
pub mod app_dirs;
pub mod combo;
pub mod config;
pub mod difficulty;
pub mod feedback;
pub mod game;
pub mod keymap;
pub mod runtime;
pub mod store;
pub mod tracker;
pub mod util;

/// Cadence of the tick event stream; the flash delay counts these down.
pub const TICK_RATE_MS: u64 = 100;
