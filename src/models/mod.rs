pub mod booking;
pub mod event;
pub mod ticket;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use event::Event;
pub use ticket::{Ticket, TicketStatus};
pub use user::User;
