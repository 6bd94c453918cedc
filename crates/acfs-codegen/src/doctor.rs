//! # Doctor Checks
//!
//! `doctor_checks.sh` carries one table row per verify step:
//!
//! ```text
//! <check id> TAB <description> TAB <identity helper> TAB <required|optional> TAB <command>
//! ```
//!
//! Description and command are encoded with [`encode_field`] so a row is
//! always one line with exactly five non-empty fields. At run time each row
//! is split with `IFS=$'\t' read -r`, decoded with `printf '%b'` and the
//! command runs in a subshell through the identity helper.

use acfs_manifest::Module;

use crate::quote::{encode_field, single_quote};
use crate::script::Script;

/// One doctor check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorCheck {
    /// Module id, or `<id>.<n>` when the module has several verify steps.
    pub id: String,
    /// Module description.
    pub description: String,
    /// Identity helper the command runs through.
    pub helper: &'static str,
    /// False for optional modules.
    pub required: bool,
    /// Verify command.
    pub command: String,
}

impl DoctorCheck {
    /// The row as a shell word: single-quoted fields joined by `$'\t'`.
    fn shell_row(&self) -> String {
        let level = if self.required { "required" } else { "optional" };
        [
            single_quote(&self.id),
            single_quote(&encode_field(&self.description)),
            single_quote(self.helper),
            single_quote(level),
            single_quote(&encode_field(&self.command)),
        ]
        .join("$'\\t'")
    }
}

/// Checks for every module, in sequence order.
pub fn doctor_checks<'m>(modules: impl IntoIterator<Item = &'m Module>) -> Vec<DoctorCheck> {
    let mut checks = Vec::new();
    for module in modules {
        let single = module.verify.len() == 1;
        for (i, command) in module.verify.iter().enumerate() {
            let id = if single {
                module.id.to_string()
            } else {
                format!("{}.{}", module.id, i + 1)
            };
            checks.push(DoctorCheck {
                id,
                description: module.description.clone(),
                helper: module.run_as.shell_helper(),
                required: !module.optional,
                command: command.clone(),
            });
        }
    }
    checks
}

const RUNNER: &str = r#"acfs_doctor_run() {
    local acfs_row acfs_id acfs_desc acfs_helper acfs_level acfs_cmd
    local acfs_passed=0 acfs_warned=0 acfs_failed=0
    log_section "Doctor checks"
    for acfs_row in "${ACFS_DOCTOR_CHECKS[@]}"; do
        IFS=$'\t' read -r acfs_id acfs_desc acfs_helper acfs_level acfs_cmd <<<"$acfs_row"
        acfs_desc="$(printf '%b' "$acfs_desc")"
        acfs_cmd="$(printf '%b' "$acfs_cmd")"
        if [[ "${DRY_RUN:-false}" == "true" ]]; then
            log_info "dry-run: would check $acfs_id ($acfs_level): $acfs_desc"
            continue
        fi
        if ( "$acfs_helper" <<<"$acfs_cmd" ) >/dev/null 2>&1; then
            log_success "$acfs_id: $acfs_desc"
            acfs_passed=$((acfs_passed + 1))
        elif [[ "$acfs_level" == "required" ]]; then
            log_error "$acfs_id: $acfs_desc"
            acfs_failed=$((acfs_failed + 1))
        else
            log_warn "$acfs_id: $acfs_desc (optional)"
            acfs_warned=$((acfs_warned + 1))
        fi
    done
    log_info "doctor: $acfs_passed passed, $acfs_warned warning(s), $acfs_failed failure(s)"
    [[ "$acfs_failed" -eq 0 ]]
}
"#;

/// Render `doctor_checks.sh`.
pub(crate) fn render_doctor(checks: &[DoctorCheck]) -> String {
    let mut script = Script::executable(
        "Doctor checks: one row per verify step.\n\nExecute it to run every check, or source it and call acfs_doctor_run.",
    );
    script.line(0, "ACFS_DOCTOR_CHECKS=(");
    for check in checks {
        script.line(1, check.shell_row());
    }
    script.line(0, ")");
    script.blank();
    script.raw(RUNNER);
    script.blank();
    script.line(0, "if [[ \"${BASH_SOURCE[0]}\" == \"${0}\" ]]; then");
    script.line(1, "acfs_doctor_run \"$@\"");
    script.line(0, "fi");
    script.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use acfs_manifest::Manifest;

    fn manifest(modules_yaml: &str) -> Manifest {
        let source = format!(
            "version: 1\nname: T\nid: acfs\ndefaults:\n  user: ubuntu\n  workspace_root: /data\n  mode: vibe\nmodules:\n{modules_yaml}"
        );
        acfs_manifest::load_str(&source).unwrap().manifest
    }

    #[test]
    fn check_ids_number_multiple_verify_steps() {
        let m = manifest(
            "  - {id: base.system, description: b, run_as: root, install: [x], verify: [curl --version, git --version]}\n  \
             - {id: lang.bun, description: bun, optional: true, install: [x], verify: [bun --version]}\n",
        );
        let checks = doctor_checks(&m.modules);
        let ids: Vec<&str> = checks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["base.system.1", "base.system.2", "lang.bun"]);
        assert_eq!(checks[0].helper, "run_as_root_shell");
        assert!(checks[0].required);
        assert!(!checks[2].required);
    }

    #[test]
    fn rows_are_tab_joined_single_quoted_fields() {
        let check = DoctorCheck {
            id: "a".to_string(),
            description: "it's\tfine".to_string(),
            helper: "run_as_target_shell",
            required: true,
            command: "test -d ~/x\nls".to_string(),
        };
        assert_eq!(
            check.shell_row(),
            "'a'$'\\t''it'\\''s\\tfine'$'\\t''run_as_target_shell'$'\\t''required'$'\\t''test -d ~/x\\nls'"
        );
    }

    #[test]
    fn doctor_script_shape() {
        let m = manifest("  - {id: a, description: d, install: [x], verify: [\"true\"]}\n");
        let text = render_doctor(&doctor_checks(&m.modules));
        assert!(text.contains("ACFS_DOCTOR_CHECKS=(\n    'a'$'\\t''d'$'\\t''run_as_target_shell'$'\\t''required'$'\\t''true'\n)\n"));
        assert!(text.contains("IFS=$'\\t' read -r acfs_id"));
        assert!(text.contains("printf '%b' \"$acfs_cmd\""));
        assert!(text.ends_with("    acfs_doctor_run \"$@\"\nfi\n"));
    }
}
