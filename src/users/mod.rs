//! User records and the HTTP adapter that fetches them.

mod api_types;
mod client;
mod types;

pub use client::UserApiClient;
pub use types::User;
