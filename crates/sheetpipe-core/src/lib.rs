mod error;
mod extractor;
mod loader;
mod pipeline;
mod run;
mod schema;
mod staging;
mod table;

pub use error::{Error, Result};
pub use extractor::Extractor;
pub use loader::Loader;
pub use pipeline::{Pipeline, HANDOFF_KEY};
pub use run::{RunContext, RUN_ID_ENV};
pub use schema::{Column, ColumnType, TableSchema};
pub use staging::Staging;
pub use table::{Cell, Table};
