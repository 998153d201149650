pub mod account_service;
pub mod account_service_impl;
pub mod ticket_service;
pub mod ticket_service_impl;

pub use account_service::{
    AccountError, AccountInfo, AccountService, AccountUpdate, LoginOutcome, RegisterAccount,
};
pub use account_service_impl::SeaOrmAccountService;
pub use ticket_service::{
    CreateTicket, TicketError, TicketInfo, TicketService, TicketUpdate,
};
pub use ticket_service_impl::SeaOrmTicketService;
