pub mod board;
pub mod data_context;
