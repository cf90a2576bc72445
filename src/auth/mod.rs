pub mod cleanup;
pub mod credentials;
pub mod middleware;
pub mod password;
pub mod service;
pub mod token;

pub use credentials::{validate_password, validate_username, validate_username_shape};
pub use middleware::{
    clear_session_cookie, client_ip, session_cookie, session_token, user_agent, MaybeSite,
    RequireSite,
};
pub use password::PasswordHasher;
pub use service::AuthService;
pub use token::{SessionClaims, TokenError};
