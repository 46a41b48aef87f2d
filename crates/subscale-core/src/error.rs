use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubscaleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid orientation: {0} (expected -1, 0, 90, 180 or 270)")]
    InvalidOrientation(i32),

    #[error("Invalid pan limit code: {0}")]
    InvalidPanLimit(i32),

    #[error("Invalid easing code: {0}")]
    InvalidEasing(i32),

    #[error("Invalid zoom style code: {0}")]
    InvalidZoomStyle(i32),

    #[error("Invalid scale bounds: {0}")]
    InvalidScaleBounds(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Decoder has been recycled")]
    DecoderRecycled,

    #[error("Image is not ready")]
    NotReady,

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Worker pool error: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, SubscaleError>;
