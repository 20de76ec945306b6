//! Handles the actual running of the converter

use crate::config::Target;
use crate::issue::Located;
use crate::linter;
use crate::{ifid, json, twee, twine2};
use crate::{Config, Error, InputFiles, Output, Story, StoryFormat, Warning, WarningKind};

use color_eyre::Result;
use eyre::{eyre, WrapErr};

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use termcolor::StandardStream;
use tracing::{debug, info};

/// The format of an input file, by extension
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputKind {
    Twee,
    Html,
    Json,
}

impl InputKind {
    /// Gets the kind of the file at `path`, if it is a known one
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        match extension.as_str() {
            "tw" | "twee" => Some(InputKind::Twee),
            "html" | "htm" => Some(InputKind::Html),
            "json" => Some(InputKind::Json),
            _ => None,
        }
    }
}

/// Expands the given inputs into a sorted list of files. Files named
/// directly are always included; files found in directories only if their
/// kind is known
pub fn collect_input_paths(inputs: &[String]) -> Result<Vec<PathBuf>> {
    fn walk(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
            .wrap_err_with(|| format!("Error while reading directory {:?}", dir))?
            .flatten()
            .map(|entry| entry.path())
            .collect();
        entries.sort();
        for path in entries {
            if path.is_dir() {
                walk(&path, paths)?;
            } else if InputKind::from_path(&path).is_some() {
                paths.push(path);
            }
        }
        Ok(())
    }

    let mut paths = Vec::new();
    for input in inputs {
        let path = PathBuf::from(input);
        if path.is_dir() {
            walk(&path, &mut paths)?;
        } else {
            paths.push(path);
        }
    }
    Ok(paths)
}

/// Everything parsed from the inputs of a run
#[derive(Default)]
pub struct Parsed {
    pub files: InputFiles,
    pub stories: Vec<Story>,
    pub errors: Vec<Located<Error>>,
    pub warnings: Vec<Located<Warning>>,
}

impl Parsed {
    fn record<T>(&mut self, file_id: Option<usize>, res: crate::Result<Output<T>>) -> Option<T> {
        match res {
            Ok(output) => {
                let (value, warnings) = output.take();
                self.warnings
                    .extend(warnings.into_iter().map(|warning| (file_id, warning)));
                Some(value)
            }
            Err(error) => {
                self.errors.push((file_id, error));
                None
            }
        }
    }
}

/// Parses every input file
///
/// All Twee files are merged into a single story, which comes first. Every
/// story of every HTML file and each JSON file add one story each.
pub fn parse_inputs(paths: &[PathBuf]) -> Result<Parsed> {
    let mut parsed = Parsed::default();
    let mut twee_story: Option<Story> = None;

    for path in paths {
        let bytes =
            std::fs::read(path).wrap_err_with(|| format!("Failed to read input file {:?}", path))?;
        let text = match std::str::from_utf8(&bytes) {
            Ok(text) => text.to_string(),
            Err(err) => {
                parsed.errors.push((None, Error::NotText(err)));
                continue;
            }
        };
        let file_id = Some(parsed.files.add(path.display().to_string(), text.clone()));

        debug!(?path, "Parsing input file");
        match InputKind::from_path(path).unwrap_or(InputKind::Twee) {
            InputKind::Twee => {
                if let Some(story) = parsed.record(file_id, twee::parse(&text)) {
                    match twee_story.as_mut() {
                        Some(merged) => {
                            let res = merged
                                .merge(story)
                                .map(|warnings| Output::new(()).with_warnings(warnings));
                            parsed.record(file_id, res);
                        }
                        None => twee_story = Some(story),
                    }
                }
            }
            InputKind::Html => {
                if let Some(mut stories) = parsed.record(file_id, twine2::parse_archive(&text)) {
                    if stories.is_empty() {
                        parsed.errors.push((file_id, Error::StoryDataNotFound));
                    }
                    parsed.stories.append(&mut stories);
                }
            }
            InputKind::Json => {
                if let Some(story) = parsed.record(file_id, json::parse(&text)) {
                    parsed.stories.push(story);
                }
            }
        }
    }

    if let Some(story) = twee_story {
        parsed.stories.insert(0, story);
    }
    Ok(parsed)
}

/// Gives the story a fresh IFID if its own is missing or invalid
fn ensure_ifid(story: &mut Story, warnings: &mut Vec<Located<Warning>>) {
    if !ifid::is_valid(&story.ifid) {
        let new = ifid::generate();
        let old = std::mem::replace(&mut story.ifid, new.clone());
        warnings.push((None, WarningKind::IfidRegenerated { old, new }.into()));
    }
}

/// Compiles a single story for the configured target
fn compile_story(config: &Config, story: &Story) -> Result<Output<String>> {
    let output = match config.target {
        Target::Html => {
            let format_file = config.format_file(story);
            let story_format = StoryFormat::from_path(&format_file).wrap_err_with(|| {
                format!("Failed to parse story format file: {:?}", &format_file)
            })?;
            info!(
                format = %story_format.name,
                version = %story_format.version,
                "Using story format"
            );
            twine2::compile(story, &story_format)?
        }
        Target::Twee => twee::compile(story)?,
        Target::Json => Output::new(json::compile(story)?),
        Target::Archive => twine2::compile_archive(std::slice::from_ref(story))?,
    };
    Ok(output)
}

/// Produces the output name and text for the configured target
fn convert(
    config: &Config,
    mut stories: Vec<Story>,
    warnings: &mut Vec<Located<Warning>>,
) -> Result<(String, String)> {
    for story in stories.iter_mut() {
        ensure_ifid(story, warnings);
    }

    let (name, output) = if config.target == Target::Archive && stories.len() > 1 {
        ("archive".to_string(), twine2::compile_archive(&stories)?)
    } else {
        if stories.len() > 1 {
            warnings.push((None, WarningKind::MultipleStories(stories.len()).into()));
        }
        let story = stories
            .into_iter()
            .next()
            .ok_or_else(|| eyre!("No stories found in the inputs"))?;
        let output = compile_story(config, &story)?;
        (story.name, output)
    };

    let (text, compile_warnings) = output.take();
    warnings.extend(compile_warnings.into_iter().map(|w| (None, w)));
    Ok((name, text))
}

/// Runs the converter
pub fn run() -> Result<()> {
    let config = Config::build()?;

    let mut stdout = StandardStream::stdout(config.use_color);

    let paths = collect_input_paths(&config.inputs)?;
    let Parsed {
        files,
        stories,
        errors,
        mut warnings,
    } = parse_inputs(&paths)?;

    if config.linting {
        return linter::lint(&files, errors, warnings, &config, &mut stdout);
    }

    // Parse problems are reported, and stop the run, before converting
    if !errors.is_empty() {
        return linter::lint(&files, errors, warnings, &config, &mut stdout);
    }

    let (story_name, output) = convert(&config, stories, &mut warnings)?;
    linter::lint(&files, Vec::new(), warnings, &config, &mut stdout)?;

    let file_name = config.output_file.clone().unwrap_or_else(|| {
        let stem = if story_name.is_empty() {
            "Untitled Story"
        } else {
            &story_name
        };
        format!("{}.{}", stem, config.target.extension())
    });
    let mut file = File::create(&file_name)
        .wrap_err_with(|| format!("Failed to create output file {}", &file_name))?;
    writeln!(file, "{}", output)
        .wrap_err_with(|| format!("Failed to write output file {}", &file_name))?;
    info!(file = %file_name, "Wrote output");

    if config.should_open {
        opener::open(&file_name)
            .wrap_err_with(|| format!("Failed to open output file {}", &file_name))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_kinds() {
        assert_eq!(
            InputKind::from_path(Path::new("a/story.tw")),
            Some(InputKind::Twee)
        );
        assert_eq!(
            InputKind::from_path(Path::new("story.TWEE")),
            Some(InputKind::Twee)
        );
        assert_eq!(
            InputKind::from_path(Path::new("story.htm")),
            Some(InputKind::Html)
        );
        assert_eq!(
            InputKind::from_path(Path::new("story.json")),
            Some(InputKind::Json)
        );
        assert_eq!(InputKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(InputKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn record_keeps_file_ids() {
        let mut parsed = Parsed::default();
        let story = parsed.record(Some(3), twee::parse(":: A\n\n:: A\n"));
        assert_eq!(story.map(|s| s.size()), Some(1));
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].0, Some(3));

        let story = parsed.record(Some(4), twee::parse("no passages"));
        assert!(story.is_none());
        assert_eq!(parsed.errors[0].0, Some(4));
    }

    #[test]
    fn missing_ifids_are_generated() {
        let mut story = Story::new("A");
        let mut warnings = Vec::new();
        ensure_ifid(&mut story, &mut warnings);
        assert!(ifid::is_valid(&story.ifid));
        assert_eq!(warnings[0].1.get_name(), "IfidRegenerated");

        let before = story.ifid.clone();
        ensure_ifid(&mut story, &mut warnings);
        assert_eq!(story.ifid, before);
        assert_eq!(warnings.len(), 1);
    }
}
