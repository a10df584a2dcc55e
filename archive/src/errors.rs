#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("history is {len} bytes long, which is not a multiple of the 16-byte record width")]
    MalformedStream { len: usize },
    #[error("could not access history: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode record: {0}")]
    Encode(String),
}

#[derive(thiserror::Error, Debug)]
pub enum RosterError {
    #[error("could not read roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse handles: {0}")]
    Csv(#[from] csv::Error),
}
