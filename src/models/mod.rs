pub mod attraction;
pub mod order;
pub mod ticket;
pub mod user;

pub use attraction::Attraction;
pub use order::{NewOrder, Order, OrderFilter, OrderStatus, OrderView};
pub use ticket::{NewTicketType, TicketFilter, TicketStatus, TicketType, TicketTypeChanges};
pub use user::{AuthUser, Role};
