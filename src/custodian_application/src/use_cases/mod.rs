pub mod change_password;
pub mod create_account;
pub mod login;
pub mod request_password_reset;
pub mod verify_email;
