//! Advisory warnings and the [`Output`] wrapper that carries them
//!
//! [`Output`]: struct.Output.html
use std::fmt;
use std::ops::Range;

/// The kinds of non-fatal problems found while parsing or compiling
#[derive(Debug, Clone, PartialEq)]
pub enum WarningKind {
    /// A passage with this name already exists. The new one was discarded
    DuplicatePassage(String),

    /// The inline metadata of the named passage is not a JSON object
    MalformedPassageMetadata(String),

    /// The StoryData passage body is not a JSON object
    MalformedStoryData,

    /// An expected HTML attribute was absent and a default was used
    MissingHtmlAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// The story IFID was missing or invalid and a new one was generated
    IfidRegenerated { old: String, new: String },

    /// The start passage named by the story does not exist
    StartPassageNotFound {
        name: String,
        suggestion: Option<String>,
    },

    /// The input held more than one story where only one was expected
    MultipleStories(usize),
}

impl WarningKind {
    /// Gets the name of this kind, as used by allow and deny lists
    pub fn get_name(&self) -> &str {
        match self {
            WarningKind::DuplicatePassage(_) => "DuplicatePassage",
            WarningKind::MalformedPassageMetadata(_) => "MalformedPassageMetadata",
            WarningKind::MalformedStoryData => "MalformedStoryData",
            WarningKind::MissingHtmlAttribute { .. } => "MissingHtmlAttribute",
            WarningKind::IfidRegenerated { .. } => "IfidRegenerated",
            WarningKind::StartPassageNotFound { .. } => "StartPassageNotFound",
            WarningKind::MultipleStories(_) => "MultipleStories",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WarningKind::DuplicatePassage(name) => {
                write!(f, "Duplicate passage name \"{}\". Duplicate discarded", name)
            }
            WarningKind::MalformedPassageMetadata(name) => write!(
                f,
                "Metadata of passage \"{}\" is not a JSON object and was ignored",
                name
            ),
            WarningKind::MalformedStoryData => {
                write!(f, "StoryData is not a JSON object and was ignored")
            }
            WarningKind::MissingHtmlAttribute { element, attribute } => write!(
                f,
                "<{}> is missing the \"{}\" attribute; using a default",
                element, attribute
            ),
            WarningKind::IfidRegenerated { old, new } if old.is_empty() => {
                write!(f, "Story has no IFID; generated {}", new)
            }
            WarningKind::IfidRegenerated { old, new } => {
                write!(f, "Story IFID \"{}\" is invalid; generated {}", old, new)
            }
            WarningKind::StartPassageNotFound { name, .. } => {
                write!(f, "Start passage \"{}\" not found", name)
            }
            WarningKind::MultipleStories(count) => {
                write!(f, "Found {} stories; only the first is used", count)
            }
        }
    }
}

/// A non-fatal problem, optionally tied to a byte range of the input
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    pub context: Option<Range<usize>>,
}

impl Warning {
    pub fn new(kind: WarningKind) -> Self {
        Warning {
            kind,
            context: None,
        }
    }

    /// Attaches the given range if this warning has none yet
    pub fn or_context(mut self, range: Range<usize>) -> Self {
        if self.context.is_none() {
            self.context = Some(range);
        }
        self
    }

    pub fn get_name(&self) -> &str {
        self.kind.get_name()
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl From<WarningKind> for Warning {
    fn from(kind: WarningKind) -> Self {
        Warning::new(kind)
    }
}

/// The result of an operation along with any warnings it produced
#[derive(Debug)]
pub struct Output<T> {
    output: T,
    warnings: Vec<Warning>,
}

impl<T> Output<T> {
    pub fn new(output: T) -> Self {
        Output {
            output,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, mut warnings: Vec<Warning>) -> Self {
        self.warnings.append(&mut warnings);
        self
    }

    pub fn get_output(&self) -> &T {
        &self.output
    }

    pub fn get_warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Splits into the output and the warnings
    pub fn take(self) -> (T, Vec<Warning>) {
        (self.output, self.warnings)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Output<U> {
        Output {
            output: f(self.output),
            warnings: self.warnings,
        }
    }
}
