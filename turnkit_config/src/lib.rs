mod schema;

pub use schema::{Config, MemoryConfig};
