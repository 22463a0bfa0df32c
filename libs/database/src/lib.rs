pub mod listener;
pub mod notification;
pub mod pg_row;
pub mod pg_store;
pub mod resource;
pub mod store;
pub mod workflow;

#[cfg(any(test, feature = "test_util"))]
pub mod mem_store;
