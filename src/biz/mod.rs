pub mod authentication;
pub mod crm;
pub mod notification;
pub mod session;
pub mod workflow;
