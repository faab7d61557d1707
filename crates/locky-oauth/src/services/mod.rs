//! Engine services.

pub mod keys;
pub mod login;
pub mod oauth;
pub mod session;
pub mod token;

pub use keys::KeyService;
pub use login::LoginService;
pub use oauth::OAuthService;
pub use session::SessionService;
pub use token::TokenService;
