use bincode::config::Config;

/// Encoded width of one [`structures::PixelRecord`].
pub const RECORD_WIDTH: usize = 16;

// Fixed-width big-endian integers so every record has the same size and can be addressed by index
pub(crate) fn record_config() -> impl Config {
    bincode::config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}
