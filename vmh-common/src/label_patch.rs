//! Label-anchored guard insertion.
//!
//! Routines are treated as plain lines. A patch names an anchor (the label
//! line) and a guard statement; the guard is inserted directly after every
//! anchor whose following line does not already carry one of the guard
//! markers. Re-running over patched text therefore inserts nothing.
//!
//! Matching is lexical. A line that merely begins with the anchor token is
//! treated as the label even when the runtime would not parse it as one.

use crate::routine::RoutineName;
use serde::Serialize;

/// How a label line is recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "token", rename_all = "snake_case")]
pub enum Anchor {
    /// Line, trimmed on both sides, starts with the token (e.g. `INHIB1()`).
    Entry(String),
    /// Line, trimmed on the right, is the token alone or the token followed
    /// by a space or `;` (e.g. `LOG ;comment`).
    Label(String),
}

impl Anchor {
    pub fn entry(token: impl Into<String>) -> Self {
        Self::Entry(token.into())
    }

    pub fn label(token: impl Into<String>) -> Self {
        Self::Label(token.into())
    }

    pub fn token(&self) -> &str {
        match self {
            Self::Entry(token) | Self::Label(token) => token,
        }
    }

    /// Label name without any formal parameter list.
    pub fn stem(&self) -> &str {
        let token = self.token();
        token.split('(').next().unwrap_or(token)
    }

    pub fn matches(&self, line: &str) -> bool {
        match self {
            Self::Entry(token) => line.trim().starts_with(token.as_str()),
            Self::Label(token) => {
                let line = line.trim_end();
                match line.strip_prefix(token.as_str()) {
                    Some("") => true,
                    Some(rest) => rest.starts_with(' ') || rest.starts_with(';'),
                    None => false,
                }
            }
        }
    }
}

/// A guard line inserted after an anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelPatch {
    /// Short name used in reports (`INHIB1`).
    pub name: String,
    pub anchor: Anchor,
    /// Substrings that mark the following line as already guarded.
    pub guards: Vec<String>,
    /// Line inserted after the anchor, without line terminator.
    pub insert: String,
}

impl LabelPatch {
    pub fn new(
        name: impl Into<String>,
        anchor: Anchor,
        guards: &[&str],
        insert: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            anchor,
            guards: guards.iter().map(|g| (*g).to_string()).collect(),
            insert: insert.into(),
        }
    }

    /// A missing following line (anchor at end of file) is never guarded.
    pub fn is_guarded(&self, following: Option<&str>) -> bool {
        following.is_some_and(|line| self.guards.iter().any(|g| line.contains(g.as_str())))
    }
}

/// All label patches for one routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutinePatch {
    pub routine: RoutineName,
    pub patches: Vec<LabelPatch>,
}

/// Patches for the Kernel sign-on routines that reference environment
/// variables the RPC broker never defines.
pub fn builtin_routine_patches() -> Vec<RoutinePatch> {
    vec![
        RoutinePatch {
            routine: RoutineName::new("XUSRB"),
            patches: vec![
                LabelPatch::new(
                    "INHIB1",
                    Anchor::entry("INHIB1()"),
                    &["D(XQVOL)"],
                    " S:'$D(XQVOL) XQVOL=\"ROU\"",
                ),
                LabelPatch::new(
                    "INHIB2",
                    Anchor::entry("INHIB2()"),
                    &["D(XUVOL)"],
                    " S:'$D(XUVOL) XUVOL=\"\"",
                ),
            ],
        },
        RoutinePatch {
            routine: RoutineName::new("XUS1"),
            patches: vec![LabelPatch::new(
                "LOG",
                Anchor::label("LOG"),
                &["D(XUENV)", "D(XUVOL)"],
                " S:'$D(XUENV) XUENV=\"\" S:'$D(XUVOL) XUVOL=\"\" S:'$D(XUDEV) XUDEV=\"\" S:'$D(XUCI) XUCI=\"\"",
            )],
        },
    ]
}

/// One inserted guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insertion {
    pub label: String,
    /// 1-based line number of the anchor in the unpatched source.
    pub line_number: usize,
    pub anchor_text: String,
}

/// A line that looks like one of the target labels; listed when nothing was
/// patched so operators can see why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateLabel {
    pub line_number: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchResult {
    /// Output lines, each with its original terminator.
    pub lines: Vec<String>,
    pub insertions: Vec<Insertion>,
}

impl PatchResult {
    pub fn is_modified(&self) -> bool {
        !self.insertions.is_empty()
    }

    pub fn into_text(self) -> String {
        self.lines.concat()
    }
}

fn line_ending(source: &str) -> &'static str {
    match source.find('\n') {
        Some(idx) if idx > 0 && source.as_bytes()[idx - 1] == b'\r' => "\r\n",
        _ => "\n",
    }
}

/// Insert guards after every unguarded anchor.
pub fn apply_label_patches(source: &str, patches: &[LabelPatch]) -> PatchResult {
    let eol = line_ending(source);
    let lines: Vec<&str> = source.split_inclusive('\n').collect();
    let mut out = Vec::with_capacity(lines.len() + patches.len());
    let mut insertions = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let following = lines.get(idx + 1).copied();
        let mut pending = Vec::new();

        for patch in patches {
            if patch.anchor.matches(line) && !patch.is_guarded(following) {
                pending.push(format!("{}{}", patch.insert, eol));
                insertions.push(Insertion {
                    label: patch.name.clone(),
                    line_number: idx + 1,
                    anchor_text: line.trim_end().to_string(),
                });
            }
        }

        let mut current = (*line).to_string();
        if !pending.is_empty() && !current.ends_with('\n') {
            current.push_str(eol);
        }
        out.push(current);
        out.extend(pending);
    }

    PatchResult {
        lines: out,
        insertions,
    }
}

/// Lines starting with any patch's label stem.
pub fn candidate_labels(source: &str, patches: &[LabelPatch]) -> Vec<CandidateLabel> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| patches.iter().any(|p| line.starts_with(p.anchor.stem())))
        .map(|(idx, line)| CandidateLabel {
            line_number: idx + 1,
            text: line.trim_end().to_string(),
        })
        .collect()
}
