pub mod booking_export;
pub mod bookings;
