pub mod admin_bookings;
pub mod bookings;
pub mod paystack_webhook;

#[cfg(test)]
mod tests;
