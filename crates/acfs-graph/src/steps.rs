//! # Install-Step Classification
//!
//! Manifest install steps are free-form strings. Some are real shell
//! commands, some are multi-line blocks, and some are natural-language
//! placeholders that nobody automated yet. The emitter must never execute a
//! placeholder, and the graph validator flags modules whose install list is
//! nothing but placeholders.
//!
//! ## Precedence
//!
//! 1. Blank steps are [`StepKind::Blank`].
//! 2. Directive markers (`TODO`, `NOTE`, `FIXME`, `XXX` followed by `:`,
//!    whitespace or end of text) make a placeholder, even for multi-line steps.
//! 3. Multi-line text is a [`StepKind::Block`].
//! 4. Imperative-sentence prefixes (`Install the ...`, `Ensure ...`) make a
//!    placeholder.
//! 5. The legacy leading-quote convention (`"Configure it by hand"`, one
//!    quoted string with no expansions inside) makes a placeholder.
//! 6. Anything else is a [`StepKind::Command`].

/// Why a step was judged to be a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderReason {
    /// Starts with a `TODO`/`NOTE`/`FIXME`/`XXX` marker.
    Directive,
    /// Reads as an English instruction.
    Imperative,
    /// Wrapped in double quotes as a whole.
    LegacyQuote,
}

impl PlaceholderReason {
    /// Short label for logs and advisories.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directive => "directive marker",
            Self::Imperative => "imperative sentence",
            Self::LegacyQuote => "legacy quoted description",
        }
    }
}

/// Classification of one install step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Empty or whitespace only; emits nothing.
    Blank,
    /// A single-line shell command.
    Command,
    /// A multi-line shell block.
    Block,
    /// Text describing a manual step; never executed.
    Placeholder(PlaceholderReason),
}

impl StepKind {
    /// True for steps the emitter executes.
    pub fn is_executable(&self) -> bool {
        matches!(self, Self::Command | Self::Block)
    }

    /// True for placeholders.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

const DIRECTIVE_MARKERS: &[&str] = &["TODO", "NOTE", "FIXME", "XXX"];

/// Verbs that open a natural-language instruction. Shell commands are
/// lowercase, so a capitalised verb followed by more words reads as prose.
const IMPERATIVE_VERBS: &[&str] = &[
    "Add",
    "Check",
    "Configure",
    "Copy",
    "Create",
    "Download",
    "Enable",
    "Ensure",
    "Install",
    "Make",
    "Manually",
    "Move",
    "Open",
    "Remove",
    "Restart",
    "Run",
    "Set",
    "Setup",
    "Update",
    "Upgrade",
    "Use",
    "Verify",
];

/// Classify one install step.
pub fn classify(step: &str) -> StepKind {
    let trimmed = step.trim();
    if trimmed.is_empty() {
        return StepKind::Blank;
    }
    if has_directive_marker(trimmed) {
        return StepKind::Placeholder(PlaceholderReason::Directive);
    }
    if trimmed.contains('\n') {
        return StepKind::Block;
    }
    if is_imperative_sentence(trimmed) {
        return StepKind::Placeholder(PlaceholderReason::Imperative);
    }
    if is_legacy_quoted(trimmed) {
        return StepKind::Placeholder(PlaceholderReason::LegacyQuote);
    }
    StepKind::Command
}

fn has_directive_marker(text: &str) -> bool {
    let text = text.trim_start_matches(['#', '(', '[', ' ']);
    DIRECTIVE_MARKERS.iter().any(|marker| {
        text.strip_prefix(marker).is_some_and(|rest| {
            rest.is_empty()
                || rest.starts_with(':')
                || rest.starts_with(')')
                || rest.starts_with(']')
                || rest.starts_with(char::is_whitespace)
        })
    })
}

fn is_imperative_sentence(text: &str) -> bool {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return false;
    };
    IMPERATIVE_VERBS.contains(&first) && words.next().is_some()
}

fn is_legacy_quoted(text: &str) -> bool {
    let Some(inner) = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return false;
    };
    !inner.is_empty() && !inner.contains(['"', '$', '`'])
}
