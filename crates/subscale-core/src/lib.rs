pub mod error;
pub mod consts;
pub mod geometry;
pub mod orientation;
pub mod transform;
pub mod viewport;
pub mod pyramid;
pub mod resolver;
pub mod decoder;
pub mod loader;
pub mod animation;
pub mod gesture;
pub mod events;
pub mod config;
pub mod state;
pub mod render;
pub mod engine;

pub use config::EngineConfig;
pub use engine::{Collaborators, ImageViewEngine, LoadStats};
pub use error::{Result, SubscaleError};
pub use events::{ChangeOrigin, EngineEvent};
pub use state::ImageViewState;
