use thiserror::Error;

/// Failures raised by a content source while searching or listing.
///
/// None of these are fatal to a multi-source search: the failing source simply contributes
/// no results.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The remote answered with something that could not be understood.
    #[error("Source returned an invalid response: {message}")]
    InvalidResponse { message: String },

    /// A catalog file could not be read.
    #[error("Failed to read source file: {source}")]
    IOError {
        #[from]
        source: std::io::Error,
    },

    /// A catalog file is not valid TOML or is missing required fields.
    #[error("Failed to parse source definition: {source}")]
    DefinitionParseFail {
        #[from]
        source: toml::de::Error,
    },

    /// The requested manga is not known to this source.
    #[error("No manga found at {url}")]
    UnknownManga { url: String },

    /// The requested chapter is not known to this source.
    #[error("No chapter found at {url}")]
    UnknownChapter { url: String },

    /// No source is registered under this name.
    #[error("Source \"{name}\" is not registered")]
    UnknownSource { name: String },

    /// A catalog's `base_url` is not an absolute URL.
    #[error("Invalid base url {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },
}
