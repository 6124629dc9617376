pub mod chunk;
pub mod reader;
pub mod types;
