use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("OSC encoding error: {0}")]
    Osc(#[from] rosc::OscError),

    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("Detection failed: {0}")]
    Detection(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
