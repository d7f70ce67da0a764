use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("empty id not allowed")]
    EmptyId,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("codec error: {0}")]
    Codec(String),
}
