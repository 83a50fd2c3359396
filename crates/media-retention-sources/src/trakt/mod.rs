pub mod auth;
pub mod client;

pub use auth::{DeviceCode, TokenInfo, TraktAuth};
pub use client::TraktClient;
