//! Line-level scans over unified-diff text. Syntactic only.

/// A call pattern that must not slip into an unattended patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DangerousPattern {
    /// Literal text searched for on added lines.
    pub needle: &'static str,
    pub label: &'static str,
    pub concern: Concern,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Concern {
    CommandInjection,
    CodeInjection,
}

impl std::fmt::Display for Concern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CommandInjection => f.write_str("command injection"),
            Self::CodeInjection => f.write_str("code injection"),
        }
    }
}

pub const DANGEROUS_PATTERNS: [DangerousPattern; 5] = [
    DangerousPattern {
        needle: "subprocess.call(",
        label: "subprocess.call()",
        concern: Concern::CommandInjection,
    },
    DangerousPattern {
        needle: "os.system(",
        label: "os.system()",
        concern: Concern::CommandInjection,
    },
    DangerousPattern {
        needle: "Command::new(",
        label: "Command::new()",
        concern: Concern::CommandInjection,
    },
    DangerousPattern {
        needle: "eval(",
        label: "eval()",
        concern: Concern::CodeInjection,
    },
    DangerousPattern {
        needle: "exec(",
        label: "exec()",
        concern: Concern::CodeInjection,
    },
];

/// Lines the diff adds, without the leading `+`.
///
/// Hunk bodies are delimited by the `@@ -a,b +c,d @@` line counts, the same
/// way `git apply` reads them, so a body line `+++ x` is an added `++ x`.
/// Outside a body, `+++ ` right after a `--- ` line is a file header and is
/// skipped. Every other `+` line counts as added.
pub fn added_lines(diff: &str) -> Vec<&str> {
    let mut added = Vec::new();
    let mut hunk = Hunk::Outside;
    let mut previous = "";
    for line in diff.lines() {
        if line.starts_with("@@") {
            hunk = Hunk::open(line);
        } else if line.starts_with("diff --git ") {
            hunk = Hunk::Outside;
        } else {
            let in_body = hunk.in_body();
            if in_body {
                hunk.consume(line);
            }
            let file_header = !in_body && line.starts_with("+++ ") && previous.starts_with("--- ");
            if let Some(rest) = line.strip_prefix('+') {
                if !file_header {
                    added.push(rest);
                }
            }
        }
        previous = line;
    }
    added
}

/// Position relative to a hunk body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Hunk {
    Outside,
    /// Old and new lines still owed by the current hunk.
    Remaining { old: usize, new: usize },
    /// Hunk header without readable counts: body runs to the next header.
    Unbounded,
}

impl Hunk {
    fn open(header: &str) -> Self {
        match hunk_counts(header) {
            Some((0, 0)) => Self::Outside,
            Some((old, new)) => Self::Remaining { old, new },
            None => Self::Unbounded,
        }
    }

    fn in_body(&self) -> bool {
        !matches!(self, Self::Outside)
    }

    fn consume(&mut self, line: &str) {
        let Self::Remaining { old, new } = self else {
            return;
        };
        match line.as_bytes().first() {
            Some(b'+') => *new = new.saturating_sub(1),
            Some(b'-') => *old = old.saturating_sub(1),
            // "\ No newline at end of file"
            Some(b'\\') => {}
            _ => {
                *old = old.saturating_sub(1);
                *new = new.saturating_sub(1);
            }
        }
        if *old == 0 && *new == 0 {
            *self = Self::Outside;
        }
    }
}

/// `(old_len, new_len)` from `@@ -l[,s] +l[,s] @@`.
fn hunk_counts(header: &str) -> Option<(usize, usize)> {
    let rest = header.strip_prefix("@@ -")?;
    let (old, rest) = rest.split_once(" +")?;
    let (new, _) = rest.split_once(" @@")?;
    Some((range_len(old)?, range_len(new)?))
}

fn range_len(range: &str) -> Option<usize> {
    match range.split_once(',') {
        Some((start, len)) => {
            start.parse::<usize>().ok()?;
            len.parse().ok()
        }
        None => range.parse::<usize>().ok().map(|_| 1),
    }
}

/// Patterns present on at least one added line, in table order.
pub fn dangerous_calls(diff: &str) -> Vec<DangerousPattern> {
    let added = added_lines(diff);
    DANGEROUS_PATTERNS
        .iter()
        .filter(|pattern| added.iter().any(|line| line.contains(pattern.needle)))
        .copied()
        .collect()
}

/// Every path the diff names, first-seen order.
///
/// Sources are `--- a/x` / `+++ b/x` header pairs plus git's extended
/// headers: `diff --git a/x b/y`, `rename from|to` and `copy from|to`. A
/// `---` line only counts when the next line is a `+++` header, so removed
/// content starting with `--` is not mistaken for a header.
pub fn header_paths(diff: &str) -> Vec<String> {
    let lines: Vec<&str> = diff.lines().collect();
    let mut paths: Vec<String> = Vec::new();
    let mut push = |path: Option<String>| {
        if let Some(path) = path {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    };
    for (i, line) in lines.iter().enumerate() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            let (old, new) = split_git_pair(rest);
            push(header_path(old));
            push(new.and_then(header_path));
            continue;
        }
        if let Some(path) = EXTENDED_HEADERS
            .iter()
            .find_map(|prefix| line.strip_prefix(prefix))
        {
            push(plain_path(path));
            continue;
        }
        let Some(old) = line.strip_prefix("--- ") else {
            continue;
        };
        let Some(new) = lines.get(i + 1).and_then(|next| next.strip_prefix("+++ ")) else {
            continue;
        };
        push(header_path(old));
        push(header_path(new));
    }
    paths
}

/// Extended header lines whose remainder is a bare path.
const EXTENDED_HEADERS: [&str; 4] = ["rename from ", "rename to ", "copy from ", "copy to "];

/// Split `a/x b/y` (optionally quoted) at the last ` b/`.
fn split_git_pair(rest: &str) -> (&str, Option<&str>) {
    let split = rest
        .rfind(" \"b/")
        .or_else(|| rest.rfind(" b/"));
    match split {
        Some(at) => (&rest[..at], Some(&rest[at + 1..])),
        None => (rest, None),
    }
}

fn plain_path(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_matches('"');
    (!raw.is_empty()).then(|| raw.to_string())
}

fn header_path(raw: &str) -> Option<String> {
    // drop a trailing "\t<timestamp>"
    let raw = raw.split('\t').next().unwrap_or(raw).trim().trim_matches('"');
    if raw.is_empty() || raw == "/dev/null" {
        return None;
    }
    let path = raw
        .strip_prefix("a/")
        .or_else(|| raw.strip_prefix("b/"))
        .unwrap_or(raw);
    Some(path.to_string())
}
