//! Escaping of Twee structural sigils in passage names, tags and bodies
//!
//! Names and tags escape `\`, `[`, `]`, `{` and `}` with a backslash. Bodies
//! escape only the `::` passage sigil at the start of a line, so ordinary
//! content stays readable.

const NAME_METACHARACTERS: [char; 5] = ['\\', '[', ']', '{', '}'];

/// Escapes a passage name or tag for use in a Twee passage header
pub fn escape_name(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if NAME_METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Reverses [`escape_name`]
///
/// A backslash is dropped when it precedes one of the escaped characters. Any
/// other backslash is kept as is.
///
/// [`escape_name`]: fn.escape_name.html
pub fn unescape_name(escaped: &str) -> String {
    let mut raw = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if NAME_METACHARACTERS.contains(&next) {
                    raw.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        raw.push(c);
    }
    raw
}

/// Number of backslashes at the start of `line` if they are followed by `::`
fn sigil_escape_depth(line: &str) -> Option<usize> {
    let depth = line.len() - line.trim_start_matches('\\').len();
    if line[depth..].starts_with("::") {
        Some(depth)
    } else {
        None
    }
}

/// Escapes line-initial `::` in a passage body
pub fn escape_text(raw: &str) -> String {
    raw.split('\n')
        .map(|line| match sigil_escape_depth(line) {
            Some(_) => format!("\\{}", line),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reverses [`escape_text`]
///
/// [`escape_text`]: fn.escape_text.html
pub fn unescape_text(escaped: &str) -> String {
    escaped
        .split('\n')
        .map(|line| match sigil_escape_depth(line) {
            Some(depth) if depth > 0 => &line[1..],
            _ => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
