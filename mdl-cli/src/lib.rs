pub mod cli;
pub mod error;
pub mod progress_bars;
pub mod settings;
