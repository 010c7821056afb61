pub mod action;
pub mod app;
pub mod config;
pub mod errors;
pub mod mutations;
pub mod remote;
pub mod segments;
pub mod session;
pub mod store;
pub mod sync;
pub mod tags;
pub mod view;

pub use app::AppState;
pub use config::AppConfig;
pub use errors::AppError;
pub use session::Session;
