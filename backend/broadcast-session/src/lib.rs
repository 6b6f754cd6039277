pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorKind};
pub use services::session::{SessionController, SessionHandle};
