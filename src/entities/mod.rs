pub mod prelude;

pub mod support_requests;
pub mod users;
