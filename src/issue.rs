use crate::Config;
use crate::Error;
use crate::InputFiles;
use crate::Warning;
use crate::WarningKind;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use color_eyre::Result;
use std::cmp::Ordering;
use std::io::Write;
use std::ops::Range;
use termcolor::{Color, ColorSpec, StandardStream, WriteColor};

/// A value along with the id of the input file it came from, if any
pub type Located<T> = (Option<usize>, T);

pub enum Issue {
    Error {
        error: Error,
        file_id: Option<usize>,
    },
    Warning {
        warning: Warning,
        file_id: Option<usize>,
        denied: bool,
    },
}

impl Issue {
    fn get_name(&self) -> &str {
        match self {
            Issue::Error { error, .. } => error.get_name(),
            Issue::Warning { warning, .. } => warning.get_name(),
        }
    }

    fn get_message(&self) -> String {
        match self {
            Issue::Error { error, .. } => format!("{}", error),
            Issue::Warning { warning, .. } => format!("{}", warning),
        }
    }

    fn get_file_id(&self) -> Option<usize> {
        match self {
            Issue::Error { file_id, .. } | Issue::Warning { file_id, .. } => *file_id,
        }
    }

    fn get_range(&self) -> Option<Range<usize>> {
        match self {
            Issue::Error { error, .. } => error.get_range(),
            Issue::Warning { warning, .. } => warning.context.clone(),
        }
    }

    fn get_file_id_and_range(&self) -> Option<(usize, Range<usize>)> {
        self.get_file_id()
            .and_then(|id| self.get_range().map(|range| (id, range)))
    }

    fn is_error(&self) -> bool {
        match self {
            Issue::Error { .. } | Issue::Warning { denied: true, .. } => true,
            Issue::Warning { denied: false, .. } => false,
        }
    }

    fn get_help_message(&self) -> Option<String> {
        match self {
            Issue::Warning { warning, .. } => match &warning.kind {
                WarningKind::StartPassageNotFound {
                    suggestion: Some(suggestion),
                    ..
                } => Some(format!(
                    "Found passage with similar name: \"{}\"",
                    suggestion
                )),
                WarningKind::IfidRegenerated { new, .. } => Some(format!(
                    "Add \"ifid\": \"{}\" to StoryData to keep the IFID stable",
                    new
                )),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn report(&self, files: &InputFiles) -> Diagnostic<usize> {
        let diagnostic = if self.is_error() {
            Diagnostic::error()
        } else {
            Diagnostic::warning()
        }
        .with_message(self.get_message())
        .with_code(self.get_name());

        let mut labels = Vec::new();
        if let Some((fid, range)) = self.get_file_id_and_range() {
            let label = Label::primary(fid, range);
            let label = match self {
                Issue::Warning { warning, .. } => match warning.kind {
                    WarningKind::DuplicatePassage(_) => {
                        label.with_message("Previously defined passage kept. Duplicate discarded.")
                    }
                    _ => label,
                },
                _ => label,
            };
            labels.push(label);
        }

        // Issues without a range still name the file they came from
        let mut notes = Vec::new();
        if labels.is_empty() {
            if let Some(file) = self.get_file_id().and_then(|id| files.get(id)) {
                notes.push(format!("In {}", file.name));
            }
        }
        if let Some(msg) = self.get_help_message() {
            notes.push(msg);
        }

        diagnostic.with_labels(labels).with_notes(notes)
    }
}

/// Turns errors and warnings into issues, dropping allowed warnings and
/// promoting denied ones, sorted by file and position. Returns true if any
/// issue is an error
pub fn filter_and_sort_issues(
    errors: Vec<Located<Error>>,
    warnings: Vec<Located<Warning>>,
    config: &Config,
) -> (Vec<Issue>, bool) {
    let mut issues = Vec::new();
    let mut is_err = false;

    let all = "all".to_string();
    let allow_all = config.allowed.contains(&all);
    let deny_all = config.denied.contains(&all);
    for (file_id, warning) in warnings {
        let name = warning.get_name().to_string();
        if allow_all || config.allowed.contains(&name) {
            continue;
        }
        let denied = deny_all || config.denied.contains(&name);
        if denied {
            is_err = true;
        }
        issues.push(Issue::Warning {
            warning,
            file_id,
            denied,
        });
    }

    for (file_id, error) in errors {
        is_err = true;
        issues.push(Issue::Error { error, file_id });
    }

    issues.sort_by(|left, right| {
        match (left.get_file_id_and_range(), right.get_file_id_and_range()) {
            (None, None) => Ordering::Equal,
            (None, _) => Ordering::Less,
            (_, None) => Ordering::Greater,
            (Some((lfid, lrange)), Some((rfid, rrange))) => {
                lfid.cmp(&rfid).then(lrange.start.cmp(&rrange.start))
            }
        }
    });

    (issues, is_err)
}

/// Prints an issue on a single line
pub fn print_issue(issue: &Issue, stdout: &mut StandardStream) -> Result<()> {
    let kind = if issue.is_error() {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        "Error"
    } else {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
        "Warning"
    };
    write!(stdout, "{}[{}]: ", kind, issue.get_name())?;
    stdout.reset()?;
    writeln!(stdout, "{}", issue.get_message())?;
    Ok(())
}
