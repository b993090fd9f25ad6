//! Authentication module
//!
//! Billomat authenticates every request with an account API key, and
//! registered apps additionally send their app id and secret:
//!
//! - `X-BillomatApiKey`
//! - `X-AppId` (optional)
//! - `X-AppSecret` (optional)

mod authenticator;

pub use authenticator::{
    Authenticator, Credentials, API_KEY_HEADER, APP_ID_HEADER, APP_SECRET_HEADER,
};
