//! HTTP API handlers for kaypoh-rt

pub mod classify;
pub mod health;
pub mod search;
pub mod sse;

pub use classify::classify_routes;
pub use health::health_routes;
pub use search::search_routes;
pub use sse::event_stream;
