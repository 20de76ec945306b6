use crate::error::{Error, Result};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use eyre::WrapErr;

use std::borrow::Cow;
use std::path::Path;

static SEMVER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$").unwrap()
});

/// Marks the story format family whose file appends a `setup` function
const SETUP_FAMILY_MARKER: &str = "harlowe";
const SETUP_KEY: &str = ",\"setup\":";

fn default_name() -> String {
    "Untitled Story Format".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryFormat {
    // name: (string) Optional. The name of the story format. (Omitting the name
    // will lead to an Untitled Story Format.)
    #[serde(default = "default_name")]
    pub name: String,

    // version: (string) Required, and semantic version-style formatting
    // (x.y.z, e.g., 1.2.1) of the version is also required.
    #[serde(default)]
    pub version: String,

    // author: (string) Optional.
    pub author: Option<String>,

    // description: (string) Optional.
    pub description: Option<String>,

    // image: (string) Optional. The filename of an image (ideally SVG) served
    // from the same directory as the format.js file.
    pub image: Option<String>,

    // url: (string) Optional. The URL of the directory containing the format.js
    // file.
    pub url: Option<String>,

    // license: (string) Optional.
    pub license: Option<String>,

    // proofing: (boolean) Optional (defaults to false). True if the story
    // format is a "proofing" format. The distinction is relevant only in the
    // Twine 2 UI.
    #[serde(default)]
    pub proofing: bool,

    // source: (string) Required. An adequately escaped string containing the
    // full HTML output of the story format, including the two placeholders
    // {{STORY_NAME}} and {{STORY_DATA}}. (The placeholders are not themselves
    // required.)
    #[serde(default)]
    pub source: String,
}

/// Cuts the trailing `setup` function literal, which isn't JSON, out of the
/// formats that carry one
fn excise_setup(contents: &str) -> Cow<str> {
    if contents.to_lowercase().contains(SETUP_FAMILY_MARKER) {
        if let Some(setup) = contents.rfind(SETUP_KEY) {
            return Cow::Owned(format!("{}}}", &contents[..setup]));
        }
    }
    Cow::Borrowed(contents)
}

impl StoryFormat {
    /// Parses the contents of a `format.js` file
    ///
    /// The JSON object may be wrapped in a callback such as
    /// `window.storyFormat({...});`; everything before the first `{` and after
    /// the last `}` is ignored.
    pub fn parse(contents: &str) -> Result<StoryFormat> {
        let contents = excise_setup(contents);

        let start = contents.find('{').ok_or(Error::FormatJsonNotFound)?;
        let end = contents.rfind('}').ok_or(Error::FormatJsonNotFound)?;
        if end < start {
            return Err(Error::FormatJsonNotFound);
        }

        let format: StoryFormat =
            serde_json::from_str(&contents[start..=end]).map_err(Error::FormatJson)?;

        if format.version.is_empty() {
            return Err(Error::MissingFormatVersion);
        }
        if !SEMVER_REGEX.is_match(&format.version) {
            return Err(Error::InvalidFormatVersion(format.version));
        }
        if format.source.is_empty() {
            return Err(Error::MissingFormatSource);
        }
        Ok(format)
    }

    /// Reads and parses a `format.js` file
    pub fn from_path<P: AsRef<Path>>(file_path: P) -> color_eyre::Result<StoryFormat> {
        let file_path = file_path.as_ref();
        let contents = std::fs::read_to_string(file_path)
            .wrap_err_with(|| format!("Failed to read story format file {:?}", file_path))?;
        let format = StoryFormat::parse(&contents)?;
        Ok(format)
    }

    /// The major version number, e.g. `3` for `3.3.8`
    pub fn major_version(&self) -> &str {
        self.version.split('.').next().unwrap_or_default()
    }
}
