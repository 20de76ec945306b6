//! Property-based tests for the codecs
//!
//! Each codec must give back the story it was handed, for any passage names,
//! tags and bodies the format can represent.

use proptest::prelude::*;
use std::collections::BTreeSet;
use tweeconv::escape::{escape_name, escape_text, unescape_name, unescape_text};
use tweeconv::{ifid, twee, twine2};
use tweeconv::{Error, Passage, Story, StoryFormat, WarningKind};

/// Passage names, including the characters Twee headers must escape
fn twee_names() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(
        "[A-Za-z\\[\\]{}][A-Za-z0-9 \\[\\]{}\\\\]{0,10}[A-Za-z0-9\\]}]",
        1..8,
    )
    .prop_filter("reserved passage names", |names| {
        !names.contains("StoryTitle") && !names.contains("StoryData")
    })
}

fn tags() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z\\[\\]{}]{1,6}", 0..3)
}

/// Bodies that may start lines with the passage sigil
fn twee_text() -> impl Strategy<Value = String> {
    "[a-z:\\\\ ]{0,6}(\n[a-z:\\\\ ]{0,6}){0,3}".prop_map(|text| text.trim().to_string())
}

fn twee_story() -> impl Strategy<Value = Story> {
    (twee_names(), prop::collection::vec((tags(), twee_text()), 8)).prop_map(
        |(names, bodies)| {
            let mut story = Story::new("Generated");
            story.ifid = ifid::generate();
            story.format = "Harlowe".to_string();
            for (name, (tags, text)) in names.into_iter().zip(bodies) {
                if story.start.is_empty() {
                    story.start = name.clone();
                }
                story
                    .add_passage(Passage::new(name, text).with_tags(tags))
                    .unwrap();
            }
            story
        },
    )
}

/// Stories whose passages hold characters that must be escaped in HTML
fn html_story() -> impl Strategy<Value = Story> {
    (
        prop::collection::btree_set("[A-Za-z][A-Za-z0-9 &<>\"']{0,10}[A-Za-z0-9]", 1..6),
        prop::collection::vec("[A-Za-z0-9 &<>\"'\n]{0,20}", 6),
    )
        .prop_map(|(names, bodies)| {
            let mut story = Story::new("A & B");
            story.ifid = ifid::generate();
            for (name, text) in names.into_iter().zip(bodies) {
                if story.start.is_empty() {
                    story.start = name.clone();
                }
                story
                    .add_passage(Passage::new(name, text).with_tags(vec!["tag"]))
                    .unwrap();
            }
            story
        })
}

fn story_format() -> StoryFormat {
    StoryFormat::parse(
        r#"window.storyFormat({"name":"Test","version":"1.2.3","source":"<html><head><title>{{STORY_NAME}}</title></head><body>{{STORY_DATA}}</body></html>"});"#,
    )
    .unwrap()
}

proptest! {
    #[test]
    fn name_escaping_is_reversible(name in "\\PC*") {
        prop_assert_eq!(unescape_name(&escape_name(&name)), name);
    }

    #[test]
    fn text_escaping_is_reversible(text in "([\\\\:a ]{0,5}\n?){0,6}") {
        prop_assert_eq!(unescape_text(&escape_text(&text)), text);
    }

    #[test]
    fn escaped_text_has_no_passage_sigils(text in "([\\\\:a ]{0,5}\n?){0,6}") {
        let escaped = escape_text(&text);
        prop_assert!(escaped.split('\n').all(|line| !line.starts_with("::")));
    }

    #[test]
    fn twee_round_trip(story in twee_story()) {
        let (source, warnings) = twee::compile(&story).unwrap().take();
        prop_assert!(warnings.is_empty());

        let (parsed, warnings) = twee::parse(&source).unwrap().take();
        prop_assert!(warnings.is_empty(), "{:?}", warnings);
        prop_assert_eq!(parsed.size(), story.size());
        prop_assert_eq!(&parsed.ifid, &story.ifid);
        prop_assert_eq!(&parsed.start, &story.start);
        prop_assert_eq!(parsed, story);
    }

    #[test]
    fn twine2_archive_round_trip(story in html_story()) {
        let (html, warnings) = twine2::compile_archive(&[story.clone()]).unwrap().take();
        prop_assert!(warnings.is_empty());

        let (mut stories, warnings) = twine2::parse_archive(&html).unwrap().take();
        prop_assert!(warnings.is_empty(), "{:?}", warnings);
        prop_assert_eq!(stories.len(), 1);
        let parsed = stories.remove(0);
        prop_assert_eq!(&parsed.name, &story.name);
        prop_assert_eq!(&parsed.ifid, &story.ifid);
        prop_assert_eq!(&parsed.start, &story.start);
        prop_assert_eq!(parsed.passages(), story.passages());
    }

    #[test]
    fn twine2_document_round_trip(story in html_story()) {
        let (html, warnings) = twine2::compile(&story, &story_format()).unwrap().take();
        prop_assert!(warnings.is_empty());
        prop_assert!(!html.contains("{{STORY_DATA}}"));

        let (parsed, warnings) = twine2::parse(&html).unwrap().take();
        prop_assert!(warnings.is_empty(), "{:?}", warnings);
        prop_assert_eq!(parsed.size(), story.size());
        prop_assert_eq!(&parsed.ifid, &story.ifid);
        prop_assert_eq!(&parsed.name, &story.name);
        prop_assert_eq!(&parsed.start, &story.start);
        prop_assert_eq!(&parsed.format, "Test");
        prop_assert_eq!(parsed.passages(), story.passages());
    }

    #[test]
    fn scripts_become_one_passage(scripts in prop::collection::vec("[a-z][a-z =;()]{0,20}", 1..4)) {
        let mut story = Story::new("Scripted");
        story.ifid = ifid::generate();
        story.add_passage(Passage::new("Start", "Hi")).unwrap();
        for (index, script) in scripts.iter().enumerate() {
            let passage = Passage::new(format!("Script {}", index), script.as_str())
                .with_tags(vec!["script"]);
            story.add_passage(passage).unwrap();
        }

        let html = twine2::compile_archive(&[story.clone()]).unwrap().take().0;
        prop_assert_eq!(html.matches("<tw-passagedata").count(), 1);

        let parsed = twine2::parse_archive(&html).unwrap().take().0.remove(0);
        let parsed_scripts: Vec<&Passage> = parsed.scripts().collect();
        prop_assert_eq!(parsed_scripts.len(), 1);
        prop_assert_eq!(&parsed_scripts[0].name, twine2::USER_SCRIPT);
        prop_assert_eq!(&parsed_scripts[0].text, &story.script());
    }

    #[test]
    fn missing_ifids_are_regenerated(ifid in "[0-9a-z-]{0,12}") {
        let mut story = Story::new("Story");
        story.ifid = ifid;
        story.add_passage(Passage::new("Start", "Hi")).unwrap();

        match twine2::compile_archive(&[story.clone()]) {
            Err(Error::InvalidIfid(_)) => (),
            other => prop_assert!(false, "Unexpected result: {:?}", other),
        }

        let (source, warnings) = twee::compile(&story).unwrap().take();
        prop_assert_eq!(warnings.len(), 1);
        let new = match &warnings[0].kind {
            WarningKind::IfidRegenerated { new, .. } => new.clone(),
            other => return Err(TestCaseError::fail(format!("Unexpected warning: {:?}", other))),
        };
        prop_assert!(ifid::is_valid(&new));

        let parsed = twee::parse(&source).unwrap().take().0;
        prop_assert_eq!(parsed.ifid, new);
    }

    #[test]
    fn story_data_survives_twee(
        zoom in (1u32..400).prop_map(|z| f64::from(z) / 100.0),
        colors in prop::collection::btree_map("[a-z]{1,6}", "[a-z]{3,6}", 0..4),
        format_version in "[0-9]\\.[0-9]\\.[0-9]",
    ) {
        let mut story = Story::new("Story");
        story.ifid = ifid::generate();
        story.zoom = zoom;
        story.tag_colors = colors;
        story.format_version = format_version;
        story.add_passage(Passage::new("Start", "Hi")).unwrap();

        let source = twee::compile(&story).unwrap().take().0;
        let parsed = twee::parse(&source).unwrap().take().0;
        prop_assert_eq!(parsed.zoom, story.zoom);
        prop_assert_eq!(&parsed.tag_colors, &story.tag_colors);
        prop_assert_eq!(&parsed.format_version, &story.format_version);
    }
}
