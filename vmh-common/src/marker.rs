//! Literal marker substitution.

/// What a marker substitution would do to a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substitution {
    /// The new marker is already present.
    AlreadyApplied,
    /// Neither marker is present.
    MarkerMissing,
    Replace { content: String, occurrences: usize },
}

/// Plan replacing `old` with `new`.
///
/// Presence of `new` wins over presence of `old`, so a file that somehow
/// carries both is left alone.
pub fn plan_substitution(content: &str, old: &str, new: &str) -> Substitution {
    if content.contains(new) {
        return Substitution::AlreadyApplied;
    }
    let occurrences = content.matches(old).count();
    if occurrences == 0 {
        return Substitution::MarkerMissing;
    }
    Substitution::Replace {
        content: content.replace(old, new),
        occurrences,
    }
}
