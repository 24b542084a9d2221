//! User configuration loaded from `~/.geolocation/config.ini`.
//!
//! - [`settings`] - one struct per INI section
//! - [`defaults`] - `DEFAULT_*` constants and `ConfigFile::default()`
//! - [`file`] - load/save and path helpers
//!
//! # Example
//!
//! ```
//! use geolocation::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let options = config.request_options();
//! assert_eq!(options.timeout_millis, 600_000);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, GrantMode, LoggingSettings, RequestSettings, SimulationSettings, WatchSettings,
};
