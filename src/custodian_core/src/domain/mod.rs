pub mod account_status;
pub mod email_address;
pub mod errors;
pub mod events;
pub mod phone_number;
pub mod user_account;
pub mod user_id;
pub mod verification_token;
