//! Settings are read once at start-up; see `settings/dev.toml` for the layout.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
