//! Story JSON interchange codec
//!
//! ```json
//! {"name":"...","ifid":"...","start":"...","format":"...","formatVersion":"...",
//!  "creator":"...","creatorVersion":"...","zoom":1,"tagColors":{},"metadata":{},
//!  "passages":[{"name":"...","tags":[],"metadata":{},"text":"..."}]}
//! ```
//!
//! Every field is optional.
use crate::error::{Error, Result};
use crate::warning::Output;
use crate::Story;

use tracing::debug;

/// Parses a story from JSON. Passages are re-added through
/// [`Story::add_passage`], so duplicates are dropped with a warning
///
/// [`Story::add_passage`]: ../struct.Story.html#method.add_passage
pub fn parse(json: &str) -> Result<Output<Story>> {
    let mut story: Story = serde_json::from_str(json).map_err(Error::Json)?;
    story.ifid = story.ifid.to_uppercase();

    let mut warnings = Vec::new();
    for passage in story.take_passages() {
        warnings.append(&mut story.add_passage(passage)?);
    }

    debug!(name = %story.name, passages = story.size(), "Parsed story JSON");
    Ok(Output::new(story).with_warnings(warnings))
}

/// Compiles a story to pretty-printed JSON
pub fn compile(story: &Story) -> Result<String> {
    serde_json::to_string_pretty(story).map_err(Error::Json)
}
