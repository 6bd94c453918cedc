//! # Per-Module Install Functions
//!
//! Each generated module becomes `acfs_install_<ident>()`:
//!
//! 1. skip/enable list checks (`ACFS_SKIP_MODULES`, `ACFS_ENABLE_MODULES`);
//! 2. `acfs_require_contract "module:<id>"`;
//! 3. `log_step` with the escaped description;
//! 4. the installed check, returning early when it passes;
//! 5. the verified installer, then each install step;
//! 6. each verify step;
//! 7. `log_success`.
//!
//! Every executing block has a `DRY_RUN=true` branch that only logs. A
//! failure follows the module's policy: optional modules warn, record
//! themselves in `ACFS_SKIPPED_MODULES` and return 0; required modules log an
//! error and return 1.
//!
//! Category aggregates call these functions as `acfs_install_x || return 1`, so
//! `set -e` does not apply inside them. Every failure path is explicit.

use acfs_graph::{classify, StepKind};
use acfs_manifest::{Module, RunAs, VerifiedInstaller};

use crate::error::EmitError;
use crate::gate::CoveredRegistry;
use crate::heredoc::{delimiter, normalized_body, HeredocKind};
use crate::quote::{escape_dq, quote_with_placeholders, single_quote};
use crate::script::Script;

/// Shell function testing membership in a space-separated id list.
pub(crate) const LIST_HELPER: &str = "_acfs_module_listed";

const DRY_RUN_TEST: &str = "[[ \"${DRY_RUN:-false}\" == \"true\" ]]";

/// Longest step preview shown in dry-run logs.
const PREVIEW_CHARS: usize = 72;

/// Emit `acfs_install_<ident>()` for one module.
pub(crate) fn emit_module(
    script: &mut Script,
    module: &Module,
    registry: &CoveredRegistry,
) -> Result<(), EmitError> {
    emit_function(script, module, registry).map_err(|e| e.in_module(&module.id))
}

fn emit_function(
    script: &mut Script,
    module: &Module,
    registry: &CoveredRegistry,
) -> Result<(), EmitError> {
    let id = module.id.as_str();

    script.line(0, format!("{}() {{", module.id.install_function()));
    script.line(1, format!("local acfs_module={}", single_quote(id)));
    script.line(
        1,
        format!("if {LIST_HELPER} \"$acfs_module\" \"${{ACFS_SKIP_MODULES:-}}\"; then"),
    );
    script.line(2, format!("log_info \"{id}: skipped (listed in ACFS_SKIP_MODULES)\""));
    script.line(2, "return 0");
    script.line(1, "fi");
    if !module.enabled_by_default {
        script.line(
            1,
            format!("if ! {LIST_HELPER} \"$acfs_module\" \"${{ACFS_ENABLE_MODULES:-}}\"; then"),
        );
        script.line(
            2,
            format!("log_info \"{id}: not enabled by default (add it to ACFS_ENABLE_MODULES)\""),
        );
        script.line(2, "return 0");
        script.line(1, "fi");
    }

    script.line(1, format!("if ! acfs_require_contract \"module:{id}\"; then"));
    emit_failure(script, 2, module, "contract check failed");
    script.line(1, "fi");
    script.line(1, format!("log_step \"{id}: {}\"", escape_dq(&module.description)));

    emit_installed_check(script, module);

    if let Some(installer) = &module.verified_installer {
        emit_verified_installer(script, module, installer, registry)?;
    }

    let helper = module.run_as.shell_helper();
    for (i, step) in module.install.iter().enumerate() {
        let n = i + 1;
        match classify(step) {
            StepKind::Blank => {}
            StepKind::Placeholder(reason) => {
                script.line(
                    1,
                    format!(
                        "log_warn \"{id}: manual step required ({}): {}\"",
                        reason.as_str(),
                        escape_dq(step.trim())
                    ),
                );
            }
            StepKind::Command | StepKind::Block => {
                let delim = delimiter(HeredocKind::Install, &module.id, n, step);
                script.line(1, format!("if {DRY_RUN_TEST}; then"));
                script.line(
                    2,
                    format!("log_info \"dry-run: {id} install step {n}: {}\"", preview(step)),
                );
                emit_heredoc(script, &format!("elif ! {helper}"), &delim, step);
                script.line(1, "then");
                emit_failure(script, 2, module, &format!("install step {n} failed"));
                script.line(1, "fi");
            }
        }
    }

    for (i, step) in module.verify.iter().enumerate() {
        let n = i + 1;
        let delim = delimiter(HeredocKind::Verify, &module.id, n, step);
        script.line(1, format!("if {DRY_RUN_TEST}; then"));
        script.line(
            2,
            format!("log_info \"dry-run: {id} verify step {n}: {}\"", preview(step)),
        );
        emit_heredoc(script, &format!("elif ! {helper}"), &delim, step);
        script.line(1, "then");
        emit_failure(script, 2, module, &format!("verify step {n} failed"));
        script.line(1, "fi");
    }

    script.line(1, format!("log_success \"{id} installed\""));
    script.line(0, "}");
    script.blank();
    Ok(())
}

fn emit_installed_check(script: &mut Script, module: &Module) {
    let (Some(check), Some(run_as)) = (&module.installed_check, module.installed_check_run_as())
    else {
        return;
    };
    let id = module.id.as_str();
    let delim = delimiter(HeredocKind::Check, &module.id, 1, &check.command);
    script.line(1, format!("if {DRY_RUN_TEST}; then"));
    script.line(2, format!("log_info \"dry-run: {id} would run its installed check\""));
    emit_heredoc(
        script,
        &format!("elif {} >/dev/null 2>&1", run_as.shell_helper()),
        &delim,
        &check.command,
    );
    script.line(1, "then");
    script.line(2, format!("log_info \"{id}: already installed, skipping\""));
    script.line(2, "return 0");
    script.line(1, "fi");
}

fn emit_verified_installer(
    script: &mut Script,
    module: &Module,
    installer: &VerifiedInstaller,
    registry: &CoveredRegistry,
) -> Result<(), EmitError> {
    let source = registry
        .source(&installer.tool)
        .ok_or_else(|| EmitError::UncoveredTool {
            tool: installer.tool.clone(),
        })?;
    let id = module.id.as_str();
    let tool = installer.tool.as_str();
    let invocation = runner_invocation(module.run_as, installer)?;

    script.line(1, format!("# verified installer: {tool}"));
    script.line(1, format!("if {DRY_RUN_TEST}; then"));
    script.line(
        2,
        format!("log_info \"dry-run: {id} would fetch, verify and run installer '{tool}'\""),
    );
    script.line(1, "else");
    script.line(2, format!("local acfs_url={}", single_quote(&source.url)));
    script.line(2, format!("local acfs_sha256={}", single_quote(source.sha256.as_str())));
    script.line(2, "local acfs_installer");
    script.line(2, "acfs_installer=\"$(mktemp)\"");
    script.line(2, "local acfs_verified=false");
    script.line(2, "if [[ -n \"$acfs_url\" && -n \"$acfs_sha256\" ]] \\");
    script.line(
        3,
        "&& curl --proto '=https' --tlsv1.2 -fsSL \"$acfs_url\" -o \"$acfs_installer\" \\",
    );
    script.line(
        3,
        "&& [[ \"$(sha256sum \"$acfs_installer\" | cut -d ' ' -f 1)\" == \"$acfs_sha256\" ]]; then",
    );
    script.line(3, "acfs_verified=true");
    script.line(2, "fi");

    script.line(2, "if [[ \"$acfs_verified\" == \"true\" ]]; then");
    script.line(3, format!("if ! {invocation} <\"$acfs_installer\"; then"));
    script.line(4, "rm -f \"$acfs_installer\"");
    emit_failure(script, 4, module, &format!("installer '{tool}' failed"));
    script.line(3, "fi");
    script.line(3, "rm -f \"$acfs_installer\"");
    script.line(2, "else");
    script.line(3, "rm -f \"$acfs_installer\"");
    match &installer.fallback_url {
        Some(fallback) => {
            script.line(
                3,
                format!(
                    "log_warn \"{id}: checksum verification unavailable for '{tool}'; \
                     using the unverified fallback URL\""
                ),
            );
            script.line(
                3,
                format!(
                    "if ! curl --proto '=https' --tlsv1.2 -fsSL {} | {invocation}; then",
                    single_quote(fallback)
                ),
            );
            emit_failure(script, 4, module, &format!("fallback installer for '{tool}' failed"));
            script.line(3, "fi");
        }
        None => {
            emit_failure(
                script,
                3,
                module,
                &format!("checksum verification failed for '{tool}'; refusing to run it"),
            );
        }
    }
    script.line(2, "fi");
    script.line(1, "fi");
    Ok(())
}

/// `<helper> <runner> -s -- <args>`, with each argument quoted.
fn runner_invocation(run_as: RunAs, installer: &VerifiedInstaller) -> Result<String, EmitError> {
    let mut words = vec![
        run_as.runner_helper().to_string(),
        installer.runner.as_str().to_string(),
        "-s".to_string(),
        "--".to_string(),
    ];
    for arg in &installer.args {
        words.push(quote_with_placeholders(arg)?);
    }
    Ok(words.join(" "))
}

/// `<prefix> <<'DELIM'`, the body verbatim, then the terminator at column 0.
fn emit_heredoc(script: &mut Script, prefix: &str, delim: &str, body: &str) {
    script.line(1, format!("{prefix} <<'{delim}'"));
    script.raw(&normalized_body(body));
    script.raw(delim);
    script.raw("\n");
}

fn emit_failure(script: &mut Script, depth: usize, module: &Module, message: &str) {
    let id = module.id.as_str();
    let message = escape_dq(message);
    if module.optional {
        script.line(depth, format!("log_warn \"{id}: {message} (optional, continuing)\""));
        script.line(depth, format!("ACFS_SKIPPED_MODULES+=({})", single_quote(id)));
        script.line(depth, "return 0");
    } else {
        script.line(depth, format!("log_error \"{id}: {message}\""));
        script.line(depth, "return 1");
    }
}

/// First line of a step, shortened and escaped for a log string.
fn preview(step: &str) -> String {
    let first = step.trim().lines().next().unwrap_or_default();
    let mut short: String = first.chars().take(PREVIEW_CHARS).collect();
    if first.chars().count() > PREVIEW_CHARS || step.trim().contains('\n') {
        short.push_str(" ...");
    }
    escape_dq(&short)
}
