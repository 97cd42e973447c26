//! RoomSeek server: HTTP surface over the interpretation pipeline.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
