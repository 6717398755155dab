pub mod auth;
pub mod boxes;
pub mod error;
pub mod likes;
pub mod middleware;
pub mod password;
pub mod routes;
pub mod token;
pub mod users;
pub mod views;

pub use auth::{AppState, AppStateInner};
pub use error::AppError;
pub use password::{CredentialHasher, HasherConfig};
pub use routes::router;
pub use token::TokenService;
