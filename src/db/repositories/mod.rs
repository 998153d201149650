pub mod support_request;
pub mod user;
