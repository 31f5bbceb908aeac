//! showroom-axum: the HTTP surface of the Showroom image service.
//!
//! Routes for per-vehicle images and the site-wide hero image on top of
//! [`showroom_blob`], plus the admin write gate and the structured error
//! responses.

pub mod app;
pub mod delivery;
pub mod gate;
pub mod middlewares;
pub mod multipart;
pub mod params;
pub mod routes;
pub mod state;
mod error;
pub use error::{image_error_to_showroom, ShowroomAxumError};
pub use gate::{Access, TokenGate, WriteGate};
pub use state::ShowroomState;

pub use app::ShowroomApp;
