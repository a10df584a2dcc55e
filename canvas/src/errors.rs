#[derive(thiserror::Error, Debug)]
pub enum CanvasError {
    #[error("could not decode base image: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("pixel ({x}, {y}) is outside the {width}x{height} canvas")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum LiveError {
    #[error("placement color has {0} channels, expected 3 or 4")]
    BadColor(usize),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error("could not serialize placement: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("could not send placement: {0}")]
    Send(#[from] std::io::Error),
}
