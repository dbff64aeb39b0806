pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{DetectError, InvalidInput};
pub use handler::{DetectionHandler, DetectionRequest, GuessFormatDecoder, ImageDecoder};
pub use routes::router;
pub use state::AppState;
