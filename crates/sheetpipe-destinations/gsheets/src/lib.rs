mod auth;
mod gsheets_loader;

pub use auth::ServiceAccountKey;
pub use gsheets_loader::{GsheetsConfig, GsheetsLoader};
