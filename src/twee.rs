//! Twee 3 codec
//!
//! A Twee file is a sequence of passages, each introduced by a header line:
//!
//! ```text
//! :: Name [tag1 tag2] {"position":"100,100","size":"100,100"}
//! Body text
//! ```
//!
//! Anything before the first `::` is treated as free-form notes and ignored.
use crate::error::{Error, Result};
use crate::escape::{escape_name, escape_text, unescape_name, unescape_text};
use crate::ifid;
use crate::story::{STORY_DATA, STORY_TITLE};
use crate::warning::{Output, Warning, WarningKind};
use crate::{Passage, Story};

use serde_json::{Map, Value};
use std::ops::Range;
use tracing::debug;

const SIGIL: &str = "::";
const DELIMITER: &str = "\n::";

/// A passage split out of Twee source, with the byte offset of its header
struct Chunk<'a> {
    offset: usize,
    header: &'a str,
    body: &'a str,
}

impl<'a> Chunk<'a> {
    /// The byte range of the header line, including the sigil
    fn header_range(&self) -> Range<usize> {
        self.offset - SIGIL.len()..self.offset + self.header.len()
    }
}

fn split_chunks(text: &str) -> Result<Vec<Chunk>> {
    let start = text.find(SIGIL).ok_or(Error::NoPassages)? + SIGIL.len();
    let rest = &text[start..];

    let mut pieces = Vec::new();
    let mut pos = 0;
    for (idx, _) in rest.match_indices(DELIMITER) {
        pieces.push((start + pos, &rest[pos..idx]));
        pos = idx + DELIMITER.len();
    }
    pieces.push((start + pos, &rest[pos..]));

    Ok(pieces
        .into_iter()
        .map(|(offset, piece)| {
            let (header, body) = match piece.find('\n') {
                Some(newline) => (&piece[..newline], &piece[newline + 1..]),
                None => (piece, ""),
            };
            Chunk {
                offset,
                header,
                body,
            }
        })
        .collect())
}

/// Finds the last occurrence of `c` not escaped by a backslash
fn rfind_unescaped(s: &str, c: char) -> Option<usize> {
    s.rmatch_indices(c)
        .map(|(idx, _)| idx)
        .find(|&idx| (s[..idx].len() - s[..idx].trim_end_matches('\\').len()) % 2 == 0)
}

/// Finds the last `open`...`close` span, as long as it is well ordered
fn rfind_span(s: &str, open: char, close: char) -> Option<(usize, usize)> {
    match (rfind_unescaped(s, open), rfind_unescaped(s, close)) {
        (Some(start), Some(end)) if start < end => Some((start, end)),
        _ => None,
    }
}

struct Header {
    name: String,
    tags: Vec<String>,
    metadata: Option<Map<String, Value>>,
}

/// Parses a header line. Metadata is `None` if a span was found but was not
/// a JSON object
fn parse_header(header: &str) -> Header {
    let mut header = header.to_string();

    let mut metadata = Some(Map::new());
    if let Some((start, end)) = rfind_span(&header, '{', '}') {
        metadata = match serde_json::from_str(&header[start..=end]) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        };
        header.replace_range(start..=end, "");
    }

    let mut tags = Vec::new();
    if let Some((start, end)) = rfind_span(&header, '[', ']') {
        tags = header[start + 1..end]
            .split(' ')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(unescape_name)
            .collect();
        header.replace_range(start..=end, "");
    }

    Header {
        name: unescape_name(header.trim()),
        tags,
        metadata,
    }
}

/// Parses Twee source into a story
///
/// Every passage goes through [`Story::add_passage`], so `StoryTitle` and
/// `StoryData` set story fields instead of becoming passages. Warnings carry
/// the byte range of the offending passage header.
///
/// [`Story::add_passage`]: ../struct.Story.html#method.add_passage
pub fn parse(text: &str) -> Result<Output<Story>> {
    let mut story = Story::default();
    let mut warnings = Vec::new();

    for chunk in split_chunks(text)? {
        let range = chunk.header_range();
        let header = parse_header(chunk.header);
        if header.name.is_empty() {
            return Err(Error::MalformedPassageHeader { range });
        }

        let metadata = match header.metadata {
            Some(metadata) => metadata,
            None => {
                warnings.push(
                    Warning::new(WarningKind::MalformedPassageMetadata(header.name.clone()))
                        .or_context(range.clone()),
                );
                Map::new()
            }
        };

        let passage = Passage::new(header.name, unescape_text(chunk.body.trim()))
            .with_tags(header.tags)
            .with_metadata(metadata);
        for warning in story.add_passage(passage)? {
            warnings.push(warning.or_context(range.clone()));
        }
    }

    debug!(
        name = %story.name,
        passages = story.size(),
        warnings = warnings.len(),
        "Parsed Twee story"
    );
    Ok(Output::new(story).with_warnings(warnings))
}

/// Parses Twee source given as raw bytes, which must be UTF-8
pub fn parse_bytes(bytes: &[u8]) -> Result<Output<Story>> {
    parse(std::str::from_utf8(bytes)?)
}

fn push_passage(
    out: &mut String,
    name: &str,
    tags: &[String],
    metadata: &Map<String, Value>,
    text: &str,
) -> Result<()> {
    out.push_str(SIGIL);
    out.push(' ');
    out.push_str(&escape_name(name));
    if !tags.is_empty() {
        let tags: Vec<String> = tags.iter().map(|tag| escape_name(tag)).collect();
        out.push_str(&format!(" [{}]", tags.join(" ")));
    }
    if !metadata.is_empty() {
        let json = serde_json::to_string(metadata).map_err(Error::Json)?;
        out.push_str(&format!(" {}", json));
    }
    out.push('\n');
    out.push_str(&escape_text(text));
    out.push_str("\n\n");
    Ok(())
}

/// Compiles a story to Twee source
///
/// `StoryTitle` and `StoryData` are always written first. If the story's
/// IFID is missing or invalid a new one is written instead, with an
/// [`IfidRegenerated`] warning. The story itself is not modified.
///
/// [`IfidRegenerated`]: ../enum.WarningKind.html#variant.IfidRegenerated
pub fn compile(story: &Story) -> Result<Output<String>> {
    let mut warnings: Vec<Warning> = Vec::new();
    let mut story_data = story.story_data();
    if !ifid::is_valid(&story.ifid) {
        let new = ifid::generate();
        warnings.push(
            WarningKind::IfidRegenerated {
                old: story.ifid.clone(),
                new: new.clone(),
            }
            .into(),
        );
        story_data.ifid = Some(new);
    }

    let mut out = String::new();
    let empty = Map::new();
    push_passage(&mut out, STORY_TITLE, &[], &empty, &story.name)?;
    let story_data = serde_json::to_string(&story_data).map_err(Error::Json)?;
    push_passage(&mut out, STORY_DATA, &[], &empty, &story_data)?;

    for passage in story.passages() {
        push_passage(
            &mut out,
            &passage.name,
            &passage.tags,
            &passage.metadata,
            &passage.text,
        )?;
    }

    debug!(passages = story.size(), "Compiled Twee story");
    Ok(Output::new(out).with_warnings(warnings))
}
