//! Reports the errors and warnings of a run based on the given [`Config`]
//!
//! [`Config`]: struct.Config.html

use crate::issue::{self, Located};
use crate::Config;
use crate::Error;
use crate::InputFiles;
use crate::Warning;
use codespan_reporting::term;
use color_eyre::Result;
use eyre::eyre;
use std::io::Write;
use termcolor::StandardStream;

/// Outputs warnings/errors to the given stream.
///
/// Warnings are ignored or promoted to errors as specified in the config.
/// Fails if any error remains
pub fn lint(
    files: &InputFiles,
    errors: Vec<Located<Error>>,
    warnings: Vec<Located<Warning>>,
    config: &Config,
    stdout: &mut StandardStream,
) -> Result<()> {
    let (issues, is_err) = issue::filter_and_sort_issues(errors, warnings, config);

    if config.compact {
        for issue in &issues {
            issue::print_issue(issue, stdout)?;
        }
    } else {
        let term_config = term::Config::default();
        for issue in &issues {
            let diagnostic = issue.report(files);
            term::emit(&mut stdout.lock(), &term_config, files, &diagnostic)?;
        }
    }

    // Force reset of color
    stdout.flush()?;

    if is_err {
        Err(eyre!("Failed due to previous errors"))
    } else {
        Ok(())
    }
}
