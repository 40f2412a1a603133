pub mod app;
pub mod config;
pub mod error;
pub mod services;
pub mod startup;
pub mod util;

pub use app::{AppState, setup_db};
pub use config::{AppConfig, ConfigLoad, load_dotenv, load_or_create};
pub use error::{AppError, Result};
pub use services::{AppServices, ChannelReport};
pub use startup::{AppPaths, DataDirResolution, ensure_app_data_dir, resolve_data_dir};
pub use util::time::parse_range;
