pub mod dto;
pub mod resource;
mod util;
