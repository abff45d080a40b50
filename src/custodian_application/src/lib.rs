pub mod persistence;
pub mod policy;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod test_support;

pub use policy::AccountPolicy;
pub use use_cases::{
    change_password::{ChangePasswordError, ChangePasswordUseCase},
    create_account::{CreateAccountError, CreateAccountResponse, CreateAccountUseCase},
    login::{LoginError, LoginResponse, LoginUseCase},
    request_password_reset::{
        PASSWORD_RESET_ACKNOWLEDGEMENT, PasswordResetResponse, RequestPasswordResetError,
        RequestPasswordResetUseCase,
    },
    verify_email::{VerifyEmailError, VerifyEmailResponse, VerifyEmailUseCase},
};
