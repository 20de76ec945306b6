use crate::error::{Error, Result};
use crate::warning::{Warning, WarningKind};
use crate::Passage;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::trace;

/// Reserved passage name whose body becomes the story name
pub const STORY_TITLE: &str = "StoryTitle";

/// Reserved passage name whose JSON body is merged into the story fields
pub const STORY_DATA: &str = "StoryData";

/// Tag marking a passage as part of the story's user script
pub const SCRIPT_TAG: &str = "script";

/// Tag marking a passage as part of the story's user stylesheet
pub const STYLESHEET_TAG: &str = "stylesheet";

pub const DEFAULT_ZOOM: f64 = 1.0;

/// A complete story: ordered passages plus story-level fields
///
/// Passages are kept in insertion order, which is document order for every
/// codec. All insertions go through [`add_passage`], which intercepts the
/// reserved `StoryTitle` and `StoryData` passages and drops duplicates.
///
/// [`add_passage`]: #method.add_passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Story {
    pub name: String,

    /// Uppercase UUID v4 string; may be empty
    pub ifid: String,

    /// Name of the starting passage; may be empty
    pub start: String,

    pub format: String,
    pub format_version: String,
    pub creator: String,
    pub creator_version: String,
    pub zoom: f64,

    /// Maps tag names to colors
    pub tag_colors: BTreeMap<String, String>,

    /// Open extension map
    pub metadata: Map<String, Value>,

    passages: Vec<Passage>,
}

impl Default for Story {
    fn default() -> Self {
        Story {
            name: String::new(),
            ifid: String::new(),
            start: String::new(),
            format: String::new(),
            format_version: String::new(),
            creator: String::new(),
            creator_version: String::new(),
            zoom: DEFAULT_ZOOM,
            tag_colors: BTreeMap::new(),
            metadata: Map::new(),
            passages: Vec::new(),
        }
    }
}

/// The story fields carried in band by a Twee `StoryData` passage
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(
        rename = "format-version",
        alias = "formatVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub format_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,

    #[serde(
        rename = "tag-colors",
        alias = "tagColors",
        skip_serializing_if = "Option::is_none"
    )]
    pub tag_colors: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Overwrites `target` unless `incoming` is absent or blank
fn fill(target: &mut String, incoming: Option<String>) {
    if let Some(value) = incoming {
        if !value.is_empty() {
            *target = value;
        }
    }
}

pub(crate) fn is_default_zoom(zoom: f64) -> bool {
    (zoom - DEFAULT_ZOOM).abs() < f64::EPSILON
}

/// Sets `target` only if it is blank
fn fill_blank(target: &mut String, incoming: String) {
    if target.is_empty() {
        *target = incoming;
    }
}

impl Story {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Story {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds a passage to the story
    ///
    /// * `StoryTitle` sets the story name from the body
    /// * `StoryData` merges its JSON body into the story fields. Blank
    ///   incoming values never overwrite existing ones
    /// * A passage whose name is already taken is dropped with a
    ///   [`DuplicatePassage`] warning
    /// * Everything else, including `script` and `stylesheet` tagged
    ///   passages, is appended
    ///
    /// Fails only if the StoryData body assigns a value of the wrong type to
    /// a known field.
    ///
    /// [`DuplicatePassage`]: enum.WarningKind.html#variant.DuplicatePassage
    pub fn add_passage(&mut self, passage: Passage) -> Result<Vec<Warning>> {
        match passage.name.as_str() {
            STORY_TITLE => {
                trace!(name = %passage.text, "Setting story name from StoryTitle");
                self.name = passage.text;
                Ok(Vec::new())
            }
            STORY_DATA => self.merge_story_data_text(&passage.text),
            name if self.passage_by_name(name).is_some() => {
                trace!(name, "Dropping duplicate passage");
                Ok(vec![WarningKind::DuplicatePassage(passage.name).into()])
            }
            _ => {
                trace!(name = %passage.name, "Adding passage");
                self.passages.push(passage);
                Ok(Vec::new())
            }
        }
    }

    fn merge_story_data_text(&mut self, text: &str) -> Result<Vec<Warning>> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value @ Value::Object(_)) => value,
            _ => return Ok(vec![WarningKind::MalformedStoryData.into()]),
        };
        let data: StoryData = serde_json::from_value(value).map_err(Error::InvalidStoryDataField)?;
        self.merge_story_data(data);
        Ok(Vec::new())
    }

    /// Merges StoryData fields into this story. Blank values are ignored
    pub fn merge_story_data(&mut self, data: StoryData) {
        fill(&mut self.ifid, data.ifid.map(|ifid| ifid.to_uppercase()));
        fill(&mut self.format, data.format);
        fill(&mut self.format_version, data.format_version);
        fill(&mut self.start, data.start);
        if let Some(zoom) = data.zoom {
            self.zoom = zoom;
        }
        if let Some(tag_colors) = data.tag_colors {
            self.tag_colors.extend(tag_colors);
        }
        if let Some(metadata) = data.metadata {
            self.metadata.extend(metadata);
        }
    }

    /// Gets the non-default story fields as StoryData
    pub fn story_data(&self) -> StoryData {
        let zoom = if is_default_zoom(self.zoom) {
            None
        } else {
            Some(self.zoom)
        };
        StoryData {
            ifid: non_empty(&self.ifid),
            format: non_empty(&self.format),
            format_version: non_empty(&self.format_version),
            start: non_empty(&self.start),
            zoom,
            tag_colors: Some(self.tag_colors.clone()).filter(|colors| !colors.is_empty()),
            metadata: Some(self.metadata.clone()).filter(|metadata| !metadata.is_empty()),
        }
    }

    /// Merges another story into this one
    ///
    /// Fields already set here win. Tag colors and metadata are merged by
    /// key, and every passage of `other` goes through [`add_passage`].
    ///
    /// [`add_passage`]: #method.add_passage
    pub fn merge(&mut self, other: Story) -> Result<Vec<Warning>> {
        fill_blank(&mut self.name, other.name);
        fill_blank(&mut self.ifid, other.ifid);
        fill_blank(&mut self.start, other.start);
        fill_blank(&mut self.format, other.format);
        fill_blank(&mut self.format_version, other.format_version);
        fill_blank(&mut self.creator, other.creator);
        fill_blank(&mut self.creator_version, other.creator_version);
        if is_default_zoom(self.zoom) {
            self.zoom = other.zoom;
        }
        for (tag, color) in other.tag_colors {
            self.tag_colors.entry(tag).or_insert(color);
        }
        for (key, value) in other.metadata {
            self.metadata.entry(key).or_insert(value);
        }

        let mut warnings = Vec::new();
        for passage in other.passages {
            warnings.append(&mut self.add_passage(passage)?);
        }
        Ok(warnings)
    }

    /// All passages, in document order
    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    /// The number of passages
    pub fn size(&self) -> usize {
        self.passages.len()
    }

    pub fn passage_by_name(&self, name: &str) -> Option<&Passage> {
        self.passages.iter().find(|p| p.name == name)
    }

    pub fn passage_by_name_mut(&mut self, name: &str) -> Option<&mut Passage> {
        self.passages.iter_mut().find(|p| p.name == name)
    }

    pub fn passages_by_tag(&self, tag: &str) -> Vec<&Passage> {
        self.passages.iter().filter(|p| p.has_tag(tag)).collect()
    }

    pub fn remove_passage_by_name(&mut self, name: &str) -> Option<Passage> {
        let index = self.passages.iter().position(|p| p.name == name)?;
        Some(self.passages.remove(index))
    }

    /// Passages tagged `script`
    pub fn scripts(&self) -> impl Iterator<Item = &Passage> {
        self.passages.iter().filter(|p| p.has_tag(SCRIPT_TAG))
    }

    /// Passages tagged `stylesheet`
    pub fn stylesheets(&self) -> impl Iterator<Item = &Passage> {
        self.passages.iter().filter(|p| p.has_tag(STYLESHEET_TAG))
    }

    /// Passages tagged neither `script` nor `stylesheet`
    pub fn regular_passages(&self) -> impl Iterator<Item = &Passage> {
        self.passages
            .iter()
            .filter(|p| !p.has_tag(SCRIPT_TAG) && !p.has_tag(STYLESHEET_TAG))
    }

    /// The bodies of all script passages, joined in order
    pub fn script(&self) -> String {
        self.scripts()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The bodies of all stylesheet passages, joined in order
    pub fn stylesheet(&self) -> String {
        self.stylesheets()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Takes the passages out of a story built without [`add_passage`], e.g.
    /// by deserialization, so that they can be re-added through it
    ///
    /// [`add_passage`]: #method.add_passage
    pub(crate) fn take_passages(&mut self) -> Vec<Passage> {
        std::mem::take(&mut self.passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let story = Story::default();
        assert_eq!(story.zoom, 1.0);
        assert_eq!(story.size(), 0);
        assert!(story.ifid.is_empty());
    }

    #[test]
    fn story_data_is_intercepted() {
        let mut story = Story::new("Test");
        let warnings = story
            .add_passage(Passage::new(STORY_DATA, r#"{"ifid":"X"}"#))
            .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(story.ifid, "X");
        assert_eq!(story.size(), 0);
    }

    #[test]
    fn story_title_is_intercepted() {
        let mut story = Story::default();
        story
            .add_passage(Passage::new(STORY_TITLE, "Cursed"))
            .unwrap();
        assert_eq!(story.name, "Cursed");
        assert_eq!(story.size(), 0);
    }

    #[test]
    fn blank_story_data_values_do_not_overwrite() {
        let mut story = Story::default();
        story.format = "Harlowe".to_string();
        story.start = "Start".to_string();
        story
            .add_passage(Passage::new(
                STORY_DATA,
                r#"{"format":"","format-version":"3.3.8","start":"Other","zoom":0.5,"tag-colors":{"red":"red"}}"#,
            ))
            .unwrap();
        assert_eq!(story.format, "Harlowe");
        assert_eq!(story.format_version, "3.3.8");
        assert_eq!(story.start, "Other");
        assert_eq!(story.zoom, 0.5);
        assert_eq!(story.tag_colors.get("red").map(String::as_str), Some("red"));
    }

    #[test]
    fn camel_case_aliases() {
        let mut story = Story::default();
        story
            .add_passage(Passage::new(
                STORY_DATA,
                r#"{"formatVersion":"2.36.1","tagColors":{"a":"green"}}"#,
            ))
            .unwrap();
        assert_eq!(story.format_version, "2.36.1");
        assert_eq!(story.tag_colors.len(), 1);
    }

    #[test]
    fn malformed_story_data_warns() {
        let mut story = Story::default();
        let warnings = story
            .add_passage(Passage::new(STORY_DATA, "{not json"))
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::MalformedStoryData);

        let warnings = story.add_passage(Passage::new(STORY_DATA, "[1, 2]")).unwrap();
        assert_eq!(warnings[0].kind, WarningKind::MalformedStoryData);
        assert_eq!(story.size(), 0);
    }

    #[test]
    fn wrongly_typed_story_data_fails() {
        let mut story = Story::default();
        let res = story.add_passage(Passage::new(STORY_DATA, r#"{"zoom":"big"}"#));
        match res {
            Err(Error::InvalidStoryDataField(_)) => (),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn duplicates_are_dropped() {
        let mut story = Story::default();
        story.add_passage(Passage::new("Start", "first")).unwrap();
        let warnings = story.add_passage(Passage::new("Start", "second")).unwrap();
        assert_eq!(
            warnings[0].kind,
            WarningKind::DuplicatePassage("Start".to_string())
        );
        assert_eq!(story.size(), 1);
        assert_eq!(story.passage_by_name("Start").unwrap().text, "first");
    }

    #[test]
    fn tagged_passages_stay_queryable() {
        let mut story = Story::default();
        story
            .add_passage(Passage::new("Script", "X").with_tags(vec![SCRIPT_TAG]))
            .unwrap();
        story
            .add_passage(Passage::new("Style", "body {}").with_tags(vec![STYLESHEET_TAG]))
            .unwrap();
        story
            .add_passage(Passage::new("Other Script", "Y").with_tags(vec![SCRIPT_TAG]))
            .unwrap();
        story.add_passage(Passage::new("Start", "Hi")).unwrap();

        assert_eq!(story.size(), 4);
        assert_eq!(story.passages_by_tag(SCRIPT_TAG).len(), 2);
        assert_eq!(story.script(), "X\nY");
        assert_eq!(story.stylesheet(), "body {}");
        let regular: Vec<_> = story.regular_passages().map(|p| p.name.as_str()).collect();
        assert_eq!(regular, vec!["Start"]);
    }

    #[test]
    fn remove_passage() {
        let mut story = Story::default();
        story.add_passage(Passage::new("A", "")).unwrap();
        story.add_passage(Passage::new("B", "")).unwrap();
        assert_eq!(story.remove_passage_by_name("A").map(|p| p.name), Some("A".to_string()));
        assert!(story.remove_passage_by_name("A").is_none());
        assert_eq!(story.size(), 1);
    }

    #[test]
    fn story_data_skips_defaults() {
        let mut story = Story::new("Name");
        story.ifid = "ABC".to_string();
        let json = serde_json::to_string(&story.story_data()).unwrap();
        assert_eq!(json, r#"{"ifid":"ABC"}"#);

        story.zoom = 0.6;
        story.format_version = "1.0.0".to_string();
        let json = serde_json::to_string(&story.story_data()).unwrap();
        assert_eq!(json, r#"{"ifid":"ABC","format-version":"1.0.0","zoom":0.6}"#);
    }

    #[test]
    fn merge_keeps_existing_fields() {
        let mut base = Story::new("Base");
        base.add_passage(Passage::new("Start", "base")).unwrap();

        let mut other = Story::new("Other");
        other.format = "SugarCube".to_string();
        other.tag_colors.insert("a".to_string(), "red".to_string());
        other.add_passage(Passage::new("Start", "other")).unwrap();
        other.add_passage(Passage::new("Next", "more")).unwrap();

        let warnings = base.merge(other).unwrap();
        assert_eq!(base.name, "Base");
        assert_eq!(base.format, "SugarCube");
        assert_eq!(base.tag_colors.len(), 1);
        assert_eq!(base.size(), 2);
        assert_eq!(base.passage_by_name("Start").unwrap().text, "base");
        assert_eq!(warnings.len(), 1);
    }
}
