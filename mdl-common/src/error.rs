use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Chapter number is not a valid decimal: {value}")]
    InvalidChapterNumber { value: String },

    #[error("Name \"{name}\" is empty after removing path-illegal characters")]
    EmptyFileName { name: String },
}
