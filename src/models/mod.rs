pub mod admin;
pub mod appointment;
pub mod barber;
pub mod service;

pub use admin::Admin;
pub use appointment::{Appointment, AppointmentStatus};
pub use barber::Barber;
pub use service::Service;
