//! Minimal unified line diff.
//!
//! Diagnostic texts are a handful of lines, so the diff is a single
//! full-context hunk computed from a longest-common-subsequence table.
//! Within a changed run, removed lines come before added lines, as in
//! `git diff`.

/// One line of a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine<'a> {
    Same(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

/// Line-level edit script turning `old` into `new`.
pub fn diff_lines<'a>(old: &'a str, new: &'a str) -> Vec<DiffLine<'a>> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();

    // lcs[i][j] = length of the LCS of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(DiffLine::Same(a[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(DiffLine::Removed(a[i]));
            i += 1;
        } else {
            out.push(DiffLine::Added(b[j]));
            j += 1;
        }
    }
    out.extend(a[i..].iter().map(|l| DiffLine::Removed(*l)));
    out.extend(b[j..].iter().map(|l| DiffLine::Added(*l)));
    out
}

fn hunk_range(count: usize) -> String {
    match count {
        0 => "0,0".to_string(),
        1 => "1".to_string(),
        n => format!("1,{}", n),
    }
}

/// Renders a unified diff of `old` against `new` without file headers.
///
/// Returns an empty string when the texts are line-for-line identical.
pub fn unified_diff(old: &str, new: &str) -> String {
    let lines = diff_lines(old, new);
    if lines.iter().all(|l| matches!(l, DiffLine::Same(_))) {
        return String::new();
    }

    let old_count = old.lines().count();
    let new_count = new.lines().count();
    let mut out = format!("@@ -{} +{} @@", hunk_range(old_count), hunk_range(new_count));
    for line in lines {
        out.push('\n');
        match line {
            DiffLine::Same(l) => {
                out.push(' ');
                out.push_str(l);
            }
            DiffLine::Removed(l) => {
                out.push('-');
                out.push_str(l);
            }
            DiffLine::Added(l) => {
                out.push('+');
                out.push_str(l);
            }
        }
    }
    out
}
