pub mod commands;
pub mod config;
pub mod logging;

pub use commands::print_json;
pub use config::CliConfig;
pub use logging::init_logging;
