//! Input file patterns (`-i/--input`).
//!
//! Only the file-name component may hold wildcards: `*` matches any run of
//! characters and `?` matches exactly one. The directory part is literal.

use std::path::Path;

use tracing::debug;

use crate::error::{AppError, EXIT_CONFIG};

/// Expand every pattern into matching file paths.
///
/// Patterns without wildcards pass through unchanged. Matches of one pattern
/// are sorted; a pattern matching nothing is an error.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<String>, AppError> {
    let mut out = Vec::new();
    for pattern in patterns {
        if !has_wildcard(pattern) {
            out.push(pattern.clone());
            continue;
        }
        let matches = expand_one(pattern)?;
        debug!(pattern = %pattern, matches = matches.len(), "expanded input pattern");
        out.extend(matches);
    }
    Ok(out)
}

fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?'])
}

fn expand_one(pattern: &str) -> Result<Vec<String>, AppError> {
    let path = Path::new(pattern);
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if parent.is_some_and(|p| has_wildcard(&p.to_string_lossy())) {
        return Err(AppError::new(
            EXIT_CONFIG,
            format!("Wildcards are only supported in the file name: '{pattern}'."),
        ));
    }

    let dir = parent.unwrap_or(Path::new("."));
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Failed to list '{}': {e}", dir.display())))?;

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::new(EXIT_CONFIG, format!("Failed to list '{}': {e}", dir.display())))?;
        if !entry.path().is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if wildcard_match(name, file_name) {
            let full = match parent {
                Some(p) => p.join(file_name).display().to_string(),
                None => file_name.to_string(),
            };
            matches.push(full);
        }
    }

    if matches.is_empty() {
        return Err(AppError::new(EXIT_CONFIG, format!("No files match '{pattern}'.")));
    }
    matches.sort();
    Ok(matches)
}

/// Match `text` against `pattern` with `*` and `?` wildcards.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    // Last `*` seen and the text position it currently absorbs up to.
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some('*') => {
                star = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == t[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    pi = sp + 1;
                    ti = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}
