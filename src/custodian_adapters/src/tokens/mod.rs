pub mod http_token_issuer;
pub mod jwt_token_issuer;

pub use http_token_issuer::HttpTokenIssuer;
pub use jwt_token_issuer::JwtTokenIssuer;
