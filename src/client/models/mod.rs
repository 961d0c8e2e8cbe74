//! Movie catalog API data models
//!
//! Domain types exchanged with the backend, organized by resource.

mod auth;
mod movie;
mod system;
mod upload;

pub use auth::{LoginRequest, RefreshResponse, Session, SessionUser, UserProfile};
pub use movie::{CreateMovieRequest, Movie, MoviePage, UpdateMovieRequest};
pub use system::{ApiInfo, HealthStatus, Message};
pub use upload::{UploadSignature, UploadSignatureRequest};
