pub mod paystack_client;
