//! HTTP route handlers.

pub mod health;
pub mod mapping;
pub mod mastodon;
pub mod twitter;

pub use health::{HealthResponse, health_routes};
pub use mapping::mapping_routes;
pub use mastodon::{MastodonLoginUrlResponse, mastodon_routes};
pub use twitter::{TwitterLoginUrlResponse, twitter_routes};
