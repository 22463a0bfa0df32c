mod create_workflow;
mod join_request;
mod join_workflow;
mod member;
