pub use super::support_requests::Entity as SupportRequests;
pub use super::users::Entity as Users;
