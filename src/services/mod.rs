pub mod appointments;
pub mod notifications;
pub mod scheduling;
