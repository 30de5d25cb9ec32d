pub mod app_logic;
pub mod core;

use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

/*
 * Installs the terminal logger. Safe to call repeatedly; only the first call
 * takes effect, which lets every test call it unconditionally.
 */
pub fn initialize_logging() {
    let _ = TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}
