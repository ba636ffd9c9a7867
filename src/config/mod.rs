/// Client options schema.
pub mod schema;

pub use schema::{ClientOptions, DEFAULT_HOST, DEFAULT_PORT};
