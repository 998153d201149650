pub mod account;
pub mod ticket;

pub use account::Role;
pub use ticket::{Platform, TicketKind, TicketStatus};
