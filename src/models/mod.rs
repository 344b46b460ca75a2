//! Data models for Athenaeum

pub mod author;
pub mod book;
pub mod genre;
pub mod loan;
pub mod notification;
pub mod reservation;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use genre::Genre;
pub use loan::{Loan, LoanDetails, LoanStatus};
pub use notification::{Notification, NotificationKind};
pub use reservation::{Reservation, ReservationStatus};
pub use user::{Principal, User, UserRole};
