pub mod ops;
pub mod share_code;
pub mod steps;
pub mod visibility;
