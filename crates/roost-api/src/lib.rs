pub mod admin;
pub mod auth;
pub mod convert;
pub mod error;
pub mod extract;
pub mod follows;
pub mod listings;
pub mod messages;
pub mod middleware;
pub mod moderation;
pub mod ratings;
pub mod router;
pub mod search;
pub mod state;
pub mod users;

pub use error::ApiError;
pub use router::router;
pub use state::{AppState, AppStateInner};

/// Page size when a request gives no `limit`.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}
