use codespan_reporting::files::Files;
use std::ops::Range;

/// A single input file's name and contents
pub struct InputFile {
    pub name: String,
    pub source: String,
    line_starts: Vec<usize>,
}

/// Adapts the loaded input files for use by codespan
#[derive(Default)]
pub struct InputFiles {
    files: Vec<InputFile>,
}

impl InputFiles {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a file, returning its id
    pub fn add(&mut self, name: String, source: String) -> usize {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        self.files.push(InputFile {
            name,
            source,
            line_starts,
        });
        self.files.len() - 1
    }

    pub fn get(&self, id: usize) -> Option<&InputFile> {
        self.files.get(id)
    }
}

impl<'a> Files<'a> for InputFiles {
    type FileId = usize;
    type Name = &'a str;
    type Source = &'a str;

    fn name(&'a self, id: Self::FileId) -> Option<Self::Name> {
        self.get(id).map(|file| file.name.as_str())
    }

    fn source(&'a self, id: Self::FileId) -> Option<Self::Source> {
        self.get(id).map(|file| file.source.as_str())
    }

    fn line_index(&'a self, id: Self::FileId, byte_index: usize) -> Option<usize> {
        self.get(id).map(|file| {
            file.line_starts
                .binary_search(&byte_index)
                .unwrap_or_else(|next_line| next_line - 1)
        })
    }

    fn line_range(&'a self, id: Self::FileId, line_index: usize) -> Option<Range<usize>> {
        let file = self.get(id)?;
        let start = *file.line_starts.get(line_index)?;
        let end = file
            .line_starts
            .get(line_index + 1)
            .copied()
            .unwrap_or_else(|| file.source.len());
        Some(start..end)
    }
}
