//! Twine 2 HTML codec
//!
//! A compiled story is a `<tw-storydata>` element holding the user
//! stylesheet and script, the tag colors, and one `<tw-passagedata>` per
//! passage, substituted into a [`StoryFormat`]'s HTML scaffold. An archive is
//! several `<tw-storydata>` elements with no scaffold.
//!
//! The inline stylesheet and script become `stylesheet` and `script` tagged
//! passages named `UserStylesheet` and `UserScript`. If a passage of the
//! story already has that name, a numeric suffix is added (`UserScript 2`).
//!
//! Known limitation: the HTML parser normalizes line endings, so a `\r\n`
//! in a passage body comes back as `\n` after a compile and parse.
//!
//! [`StoryFormat`]: ../struct.StoryFormat.html
use crate::error::{Error, Result};
use crate::ifid;
use crate::passage::{POSITION, SIZE};
use crate::story::{SCRIPT_TAG, STYLESHEET_TAG};
use crate::utils;
use crate::warning::{Output, Warning, WarningKind};
use crate::{Passage, Story, StoryFormat};

use clap::{crate_name, crate_version};
use horrorshow::{html, Raw};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use serde_json::{Map, Value};
use tracing::{debug, trace};

const STORY_DATA_ELEMENT: &str = "tw-storydata";
const PASSAGE_DATA_ELEMENT: &str = "tw-passagedata";
const TAG_ELEMENT: &str = "tw-tag";

/// Name given to the passage holding the user stylesheet
pub const USER_STYLESHEET: &str = "UserStylesheet";

/// Name given to the passage holding the user script
pub const USER_SCRIPT: &str = "UserScript";

/// Name given to passages without a `name` attribute
pub const UNTITLED_PASSAGE: &str = "Untitled Passage";

/// Passage used as the start when the story names none
pub const DEFAULT_START: &str = "Start";

fn parse_dom(html: &str) -> RcDom {
    parse_document(RcDom::default(), ParseOpts::default()).one(html)
}

fn is_element(handle: &Handle, name: &str) -> bool {
    match &handle.data {
        NodeData::Element { name: qual, .. } => &*qual.local == name,
        _ => false,
    }
}

/// Collects every descendant of `handle` (and `handle` itself) named `name`,
/// in document order
fn find_elements(handle: &Handle, name: &str) -> Vec<Handle> {
    fn walk(handle: &Handle, name: &str, found: &mut Vec<Handle>) {
        if is_element(handle, name) {
            found.push(handle.clone());
        }
        for child in handle.children.borrow().iter() {
            walk(child, name, found);
        }
    }

    let mut found = Vec::new();
    walk(handle, name, &mut found);
    found
}

fn attribute(handle: &Handle, attribute: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attribute)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Gets an attribute that every well-formed document carries, warning if it
/// is absent
fn expected_attribute(
    handle: &Handle,
    element: &'static str,
    name: &'static str,
    warnings: &mut Vec<Warning>,
) -> Option<String> {
    let value = attribute(handle, name);
    if value.is_none() {
        warnings.push(
            WarningKind::MissingHtmlAttribute {
                element,
                attribute: name,
            }
            .into(),
        );
    }
    value
}

fn text_content(handle: &Handle) -> String {
    fn walk(handle: &Handle, text: &mut String) {
        for child in handle.children.borrow().iter() {
            match &child.data {
                NodeData::Text { contents } => text.push_str(&contents.borrow()),
                _ => walk(child, text),
            }
        }
    }

    let mut text = String::new();
    walk(handle, &mut text);
    text
}

fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(' ')
        .filter(|tag| !tag.is_empty() && *tag != "\"\"")
        .map(str::to_string)
        .collect()
}

/// Gets the contents of the first `element_name` child of a story, if they
/// are not blank
fn inline_contents(story_element: &Handle, element_name: &str) -> Option<String> {
    let element = find_elements(story_element, element_name)
        .into_iter()
        .next()?;
    let contents = text_content(&element);
    if contents.trim().is_empty() {
        None
    } else {
        Some(contents)
    }
}

/// `base`, or `base` with the lowest numeric suffix from 2 up that no
/// passage of the story is named yet
fn unused_name(story: &Story, base: &str) -> String {
    std::iter::once(base.to_string())
        .chain((2..).map(|n| format!("{} {}", base, n)))
        .find(|name| story.passage_by_name(name).is_none())
        .unwrap_or_else(|| base.to_string())
}

fn parse_story_element(element: &Handle) -> Result<Output<Story>> {
    let mut warnings = Vec::new();
    let mut story = Story::default();

    let mut story_attribute = |name: &'static str| {
        expected_attribute(element, STORY_DATA_ELEMENT, name, &mut warnings)
    };
    story.name = story_attribute("name").unwrap_or_default();
    story.ifid = story_attribute("ifid").unwrap_or_default().to_uppercase();
    story.creator = story_attribute("creator").unwrap_or_default();
    story.creator_version = story_attribute("creator-version").unwrap_or_default();
    story.format = story_attribute("format").unwrap_or_default();
    story.format_version = story_attribute("format-version").unwrap_or_default();
    if let Some(zoom) = story_attribute("zoom").and_then(|z| z.trim().parse::<f64>().ok()) {
        story.zoom = utils::round2(zoom);
    }
    let start_node = story_attribute("startnode").and_then(|s| s.trim().parse::<usize>().ok());

    for (index, node) in find_elements(element, PASSAGE_DATA_ELEMENT).iter().enumerate() {
        let pid = expected_attribute(node, PASSAGE_DATA_ELEMENT, "pid", &mut warnings)
            .and_then(|pid| pid.trim().parse::<usize>().ok())
            .unwrap_or(index + 1);
        let name = expected_attribute(node, PASSAGE_DATA_ELEMENT, "name", &mut warnings)
            .unwrap_or_else(|| UNTITLED_PASSAGE.to_string());
        let tags = attribute(node, "tags")
            .map(|tags| parse_tags(&tags))
            .unwrap_or_default();

        let mut metadata = Map::new();
        for key in &[POSITION, SIZE] {
            if let Some(value) = attribute(node, key) {
                metadata.insert(key.to_string(), Value::String(value));
            }
        }

        if start_node == Some(pid) {
            story.start = name.clone();
        }

        trace!(pid, name = %name, "Parsed passage data");
        let passage = Passage::new(name, text_content(node))
            .with_tags(tags)
            .with_metadata(metadata);
        warnings.append(&mut story.add_passage(passage)?);
    }

    let inline = [
        ("style", USER_STYLESHEET, STYLESHEET_TAG),
        ("script", USER_SCRIPT, SCRIPT_TAG),
    ];
    for (element_name, base, tag) in inline.iter() {
        if let Some(contents) = inline_contents(element, element_name) {
            let name = unused_name(&story, base);
            trace!(name = %name, "Adding inline {} passage", tag);
            let passage = Passage::new(name, contents).with_tags(vec![*tag]);
            warnings.append(&mut story.add_passage(passage)?);
        }
    }

    for tag in find_elements(element, TAG_ELEMENT) {
        if let (Some(name), Some(color)) = (attribute(&tag, "name"), attribute(&tag, "color")) {
            story.tag_colors.insert(name, color);
        }
    }

    debug!(
        name = %story.name,
        passages = story.size(),
        warnings = warnings.len(),
        "Parsed Twine 2 story"
    );
    Ok(Output::new(story).with_warnings(warnings))
}

/// Parses the first story in a Twine 2 HTML document
///
/// Missing attributes produce warnings and defaults. Only a missing
/// `<tw-storydata>` element is an error.
pub fn parse(html: &str) -> Result<Output<Story>> {
    let dom = parse_dom(html);
    let elements = find_elements(&dom.document, STORY_DATA_ELEMENT);
    let first = elements.first().ok_or(Error::StoryDataNotFound)?;

    let output = parse_story_element(first)?;
    if elements.len() > 1 {
        let warning: Warning = WarningKind::MultipleStories(elements.len()).into();
        return Ok(output.with_warnings(vec![warning]));
    }
    Ok(output)
}

/// Parses every story in a Twine 2 archive, in document order
pub fn parse_archive(html: &str) -> Result<Output<Vec<Story>>> {
    let dom = parse_dom(html);
    let mut stories = Vec::new();
    let mut warnings = Vec::new();
    for element in find_elements(&dom.document, STORY_DATA_ELEMENT) {
        let (story, mut story_warnings) = parse_story_element(&element)?.take();
        stories.push(story);
        warnings.append(&mut story_warnings);
    }
    debug!(stories = stories.len(), "Parsed Twine 2 archive");
    Ok(Output::new(stories).with_warnings(warnings))
}

/// Finds the pid of the start passage among the emitted passages
fn start_pid(story: &Story, passages: &[&Passage]) -> (usize, Option<Warning>) {
    let pid_of = |name: &str| passages.iter().position(|p| p.name == name).map(|i| i + 1);
    if story.start.is_empty() {
        return (pid_of(DEFAULT_START).unwrap_or(1), None);
    }

    match pid_of(&story.start) {
        Some(pid) => (pid, None),
        None => {
            let suggestion =
                utils::did_you_mean(&story.start, passages.iter().map(|p| p.name.as_str())).pop();
            let warning = WarningKind::StartPassageNotFound {
                name: story.start.clone(),
                suggestion,
            };
            (1, Some(warning.into()))
        }
    }
}

fn check_story(story: &Story) -> Result<()> {
    if !ifid::is_valid(&story.ifid) {
        return Err(Error::InvalidIfid(story.ifid.clone()));
    }
    if story.name.is_empty() {
        return Err(Error::MissingStoryName);
    }
    Ok(())
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

/// Builds the `<tw-storydata>` element for a story
///
/// The story's own format and format version win over the given ones.
fn story_markup(story: &Story, format_name: &str, format_version: &str) -> Result<Output<String>> {
    check_story(story)?;

    let passages: Vec<&Passage> = story.regular_passages().collect();
    let (start_pid, warning) = start_pid(story, &passages);
    let stylesheet = story.stylesheet();
    let script = story.script();

    let markup = format!(
        "{}",
        html! {
            tw-storydata(name = &story.name,
                         startnode = start_pid,
                         creator = or_default(&story.creator, crate_name!()),
                         creator-version = or_default(&story.creator_version, crate_version!()),
                         ifid = &story.ifid,
                         zoom = story.zoom,
                         format = or_default(&story.format, format_name),
                         format-version = or_default(&story.format_version, format_version),
                         options = "",
                         hidden = "") {
                style(role = "stylesheet",
                      id = "twine-user-stylesheet",
                      type = "text/twine-css") {
                    : Raw(&stylesheet)
                }

                script(role = "script",
                       id = "twine-user-script",
                       type = "text/twine-javascript") {
                    : Raw(&script)
                }

                @ for (tag, color) in story.tag_colors.iter() {
                    tw-tag(name = tag, color = color) {}
                }

                @ for (index, passage) in passages.iter().enumerate() {
                    tw-passagedata(pid = index + 1,
                                   name = &passage.name,
                                   tags = passage.tags.join(" "),
                                   position ?= passage.position(),
                                   size ?= passage.size()) {
                        : &passage.text
                    }
                }
            }
        }
    );

    Ok(Output::new(markup).with_warnings(warning.into_iter().collect()))
}

/// Compiles a story into a complete Twine 2 HTML document
///
/// The story must have a valid IFID and a name, and the format must have a
/// source. `script` and `stylesheet` tagged passages are merged into the
/// user script and stylesheet instead of being written as passages. Every
/// `{{STORY_NAME}}` and `{{STORY_DATA}}` in the format source is replaced.
pub fn compile(story: &Story, story_format: &StoryFormat) -> Result<Output<String>> {
    check_story(story)?;
    if story_format.source.is_empty() {
        return Err(Error::MissingFormatSource);
    }

    let (markup, warnings) =
        story_markup(story, &story_format.name, &story_format.version)?.take();
    let output = story_format
        .source
        .replace("{{STORY_NAME}}", &story.name)
        .replace("{{STORY_DATA}}", &markup);

    debug!(
        name = %story.name,
        format = %story_format.name,
        "Compiled Twine 2 story"
    );
    Ok(Output::new(output).with_warnings(warnings))
}

/// Compiles stories into a Twine 2 archive
pub fn compile_archive(stories: &[Story]) -> Result<Output<String>> {
    let mut markup = Vec::new();
    let mut warnings = Vec::new();
    for story in stories {
        let (story_markup, mut story_warnings) = story_markup(story, "", "")?.take();
        markup.push(story_markup);
        warnings.append(&mut story_warnings);
    }
    debug!(stories = stories.len(), "Compiled Twine 2 archive");
    Ok(Output::new(markup.join("\n")).with_warnings(warnings))
}
