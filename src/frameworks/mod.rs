// Frameworks: runtime configuration and the console driver.

pub mod config;
pub mod console;
