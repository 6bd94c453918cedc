//! Line-oriented builder for generated bash scripts.

use crate::artifact::GENERATED_BANNER;

/// Relative paths of the runtime libraries every executable script sources.
pub const RUNTIME_LIBRARIES: &[&str] = &["logging.sh", "install_helpers.sh", "contract.sh"];

const INDENT: &str = "    ";

/// Accumulates script text.
#[derive(Debug, Default)]
pub(crate) struct Script {
    buf: String,
}

impl Script {
    fn header(purpose: &str) -> Self {
        let mut script = Self::default();
        script.raw("#!/usr/bin/env bash\n");
        script.raw(&format!("# {GENERATED_BANNER}\n"));
        for line in purpose.lines() {
            if line.is_empty() {
                script.raw("#\n");
            } else {
                script.raw(&format!("# {line}\n"));
            }
        }
        script
    }

    /// Header, strict mode, and the runtime library preamble.
    pub(crate) fn executable(purpose: &str) -> Self {
        let mut script = Self::header(purpose);
        script.blank();
        script.line(0, "set -euo pipefail");
        script.blank();
        script.line(
            0,
            "ACFS_GENERATED_SCRIPT_DIR=\"$(cd \"$(dirname \"${BASH_SOURCE[0]}\")\" && pwd)\"",
        );
        for lib in RUNTIME_LIBRARIES {
            script.line(0, format!("# shellcheck source=../lib/{lib}"));
            script.line(0, format!("source \"$ACFS_GENERATED_SCRIPT_DIR/../lib/{lib}\""));
        }
        script.blank();
        script
    }

    /// Header only: no strict mode, nothing sourced.
    pub(crate) fn data(purpose: &str) -> Self {
        let mut script = Self::header(purpose);
        script.blank();
        script
    }

    /// One indented line.
    pub(crate) fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        for _ in 0..depth {
            self.buf.push_str(INDENT);
        }
        self.buf.push_str(text.as_ref());
        self.buf.push('\n');
    }

    /// Text appended verbatim, used for heredoc bodies and terminators.
    pub(crate) fn raw(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub(crate) fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Finished text, ending in exactly one newline.
    pub(crate) fn finish(mut self) -> String {
        while self.buf.ends_with("\n\n") {
            self.buf.pop();
        }
        self.buf
    }
}
