#[derive(thiserror::Error, Debug)]
pub enum PlayerError {
    #[error("could not open a window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("could not create a drawing surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no graphics adapter can draw to this window")]
    NoAdapter,
    #[error("could not open the graphics device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("lost the drawing surface: {0}")]
    Frame(#[from] wgpu::SurfaceError),
    #[error("canvas of {width}x{height} does not fit in a texture of at most {max}x{max}")]
    CanvasTooLarge { width: u32, height: u32, max: u32 },
}
