//! Tweeconv converts interactive fiction stories between Twee 3 source,
//! Twine 2 HTML and a JSON interchange form
//!
//! Stories are held in a format-independent [`Story`] model. Each codec
//! parses into that model and compiles out of it:
//!
//! - [`twee`]: Twee 3 source text
//! - [`twine2`]: Twine 2 published HTML and library archives
//! - [`json`]: the JSON interchange form
//!
//! Recoverable problems are reported as [`Warning`]s alongside the result of
//! an operation in an [`Output`]. Anything else fails with an [`Error`].
//!
//! [`Story`]: struct.Story.html
//! [`twee`]: twee/index.html
//! [`twine2`]: twine2/index.html
//! [`json`]: json/index.html
//! [`Warning`]: struct.Warning.html
//! [`Output`]: struct.Output.html
//! [`Error`]: enum.Error.html
//!
//! Some nice-to-haves that may eventually be worked on:
//! - [ ] Twine 1 HTML
//! - [ ] File/directory watcher
mod error;
pub use error::Error;
pub use error::Result;

mod warning;
pub use warning::Output;
pub use warning::Warning;
pub use warning::WarningKind;

pub mod escape;

pub mod ifid;

pub mod passage;
pub use passage::Passage;

pub mod story;
pub use story::Story;
pub use story::StoryData;

pub mod twee;

pub mod twine2;

pub mod json;

mod story_format;
pub use story_format::StoryFormat;

mod config;
pub use config::CliConfig;
pub use config::Config;
pub use config::ConfigFile;
pub use config::Target;

pub mod issue;
pub use issue::Issue;

mod input_files;
pub use input_files::InputFile;
pub use input_files::InputFiles;

pub mod utils;

pub mod linter;

pub mod convert;
