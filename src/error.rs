//! Fatal errors produced by the codecs and the story format loader
use std::ops::Range;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// An error that aborts a parse or compile call
#[derive(Debug, Error)]
pub enum Error {
    /// The input bytes were not valid UTF-8
    #[error("Input is not valid UTF-8 text: {0}")]
    NotText(#[from] std::str::Utf8Error),

    /// No `::` passage sigil was found in Twee input
    #[error("No passages found in Twee input")]
    NoPassages,

    /// A Twee passage header reduced to an empty name
    #[error("Malformed passage header: passage name is empty")]
    MalformedPassageHeader { range: Range<usize> },

    /// No `<tw-storydata>` element was found in Twine 2 HTML input
    #[error("No tw-storydata element found in HTML")]
    StoryDataNotFound,

    /// The story IFID is not shaped like a version 4 UUID
    #[error("Story IFID {0:?} is not a valid UUID v4")]
    InvalidIfid(String),

    /// The story has no name
    #[error("Story name is required")]
    MissingStoryName,

    /// The story format has an empty source
    #[error("Story format source is required")]
    MissingFormatSource,

    /// The story format has no version
    #[error("Story format version is required")]
    MissingFormatVersion,

    /// The story format version is not semantic-version shaped
    #[error("Story format version {0:?} is not a semantic version")]
    InvalidFormatVersion(String),

    /// No JSON object could be located in a story format file
    #[error("Could not find Twine2 JSON blob")]
    FormatJsonNotFound,

    /// The story format JSON could not be decoded
    #[error("Failed to parse story format JSON: {0}")]
    FormatJson(#[source] serde_json::Error),

    /// A StoryData field held a value of the wrong type
    #[error("Invalid StoryData field: {0}")]
    InvalidStoryDataField(#[source] serde_json::Error),

    /// Story JSON could not be decoded
    #[error("Failed to parse story JSON: {0}")]
    Json(#[source] serde_json::Error),
}

impl Error {
    /// Gets the name of this error's kind
    pub fn get_name(&self) -> &str {
        match self {
            Error::NotText(_) => "NotText",
            Error::NoPassages => "NoPassages",
            Error::MalformedPassageHeader { .. } => "MalformedPassageHeader",
            Error::StoryDataNotFound => "StoryDataNotFound",
            Error::InvalidIfid(_) => "InvalidIfid",
            Error::MissingStoryName => "MissingStoryName",
            Error::MissingFormatSource => "MissingFormatSource",
            Error::MissingFormatVersion => "MissingFormatVersion",
            Error::InvalidFormatVersion(_) => "InvalidFormatVersion",
            Error::FormatJsonNotFound => "FormatJsonNotFound",
            Error::FormatJson(_) => "FormatJson",
            Error::InvalidStoryDataField(_) => "InvalidStoryDataField",
            Error::Json(_) => "Json",
        }
    }

    /// Gets the byte range in the input this error refers to, if known
    pub fn get_range(&self) -> Option<Range<usize>> {
        match self {
            Error::MalformedPassageHeader { range } => Some(range.clone()),
            _ => None,
        }
    }
}
