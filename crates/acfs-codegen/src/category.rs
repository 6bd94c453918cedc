//! # Category Scripts
//!
//! `install_<category>.sh` holds the install functions of every generated
//! module in the category, in sequence order, plus the aggregate
//! `install_<category> [phase]`. With a phase argument the aggregate runs
//! only that phase's modules, which lets the master installer keep phase
//! batches sequential when categories interleave across phases.
//!
//! Executed directly (not sourced), the script runs its aggregate.

use std::collections::BTreeMap;

use acfs_core::Category;
use acfs_manifest::Module;

use crate::error::EmitError;
use crate::gate::CoveredRegistry;
use crate::module::{emit_module, LIST_HELPER};
use crate::quote::single_quote;
use crate::script::Script;

/// Render one category script. `modules` are the category's modules in
/// sequence order.
pub(crate) fn render_category(
    category: &Category,
    modules: &[&Module],
    registry: &CoveredRegistry,
) -> Result<String, EmitError> {
    let mut script = Script::executable(&format!(
        "Category: {category}\n\nSource it to get install_{category} and the per-module functions,\nor execute it to install the whole category."
    ));

    script.line(0, "if [[ -z \"${ACFS_SKIPPED_MODULES+x}\" ]]; then");
    script.line(1, "ACFS_SKIPPED_MODULES=()");
    script.line(0, "fi");
    script.blank();
    emit_list_helper(&mut script);

    let generated: Vec<&Module> = modules.iter().copied().filter(|m| m.generated).collect();
    for module in generated.iter().copied() {
        emit_module(&mut script, module, registry)?;
    }
    for module in modules.iter().filter(|m| !m.generated) {
        script.line(
            0,
            format!(
                "# {} is maintained by hand (generated: false); no install function.",
                module.id
            ),
        );
    }
    if generated.len() != modules.len() {
        script.blank();
    }

    let mut by_phase: BTreeMap<u8, Vec<&Module>> = BTreeMap::new();
    for module in generated.iter().copied() {
        by_phase.entry(module.effective_phase()).or_default().push(module);
    }

    script.line(0, format!("{}() {{", category.install_function()));
    script.line(1, "local acfs_phase=\"${1:-}\"");
    script.line(1, format!("log_section {}", single_quote(&format!("Category: {category}"))));
    for (phase, members) in &by_phase {
        script.line(
            1,
            format!("if [[ -z \"$acfs_phase\" || \"$acfs_phase\" == \"{phase}\" ]]; then"),
        );
        for module in members {
            script.line(2, format!("{} || return 1", module.id.install_function()));
        }
        script.line(1, "fi");
    }
    script.line(1, "return 0");
    script.line(0, "}");
    script.blank();

    script.line(0, "if [[ \"${BASH_SOURCE[0]}\" == \"${0}\" ]]; then");
    script.line(1, format!("{} \"$@\"", category.install_function()));
    script.line(0, "fi");

    Ok(script.finish())
}

fn emit_list_helper(script: &mut Script) {
    script.line(0, "# Usage: _acfs_module_listed <id> \"<space-separated ids>\"");
    script.line(0, format!("{LIST_HELPER}() {{"));
    script.line(1, "local acfs_needle=\"$1\" acfs_item");
    script.line(1, "local -a acfs_items=()");
    script.line(1, "read -r -a acfs_items <<<\"${2:-}\" || true");
    script.line(1, "for acfs_item in \"${acfs_items[@]}\"; do");
    script.line(2, "[[ \"$acfs_item\" == \"$acfs_needle\" ]] && return 0");
    script.line(1, "done");
    script.line(1, "return 1");
    script.line(0, "}");
    script.blank();
}

#[cfg(test)]
mod tests {
    use super::*;
    use acfs_manifest::{ChecksumRegistry, Manifest};

    fn manifest(modules_yaml: &str) -> Manifest {
        let source = format!(
            "version: 1\nname: T\nid: acfs\ndefaults:\n  user: ubuntu\n  workspace_root: /data\n  mode: vibe\nmodules:\n{modules_yaml}"
        );
        acfs_manifest::load_str(&source).unwrap().manifest
    }

    fn render(m: &Manifest, category: &str) -> String {
        let registry = crate::gate::check_coverage(m, &ChecksumRegistry::default()).unwrap();
        let cat = Category::parse(category).unwrap();
        let modules: Vec<&Module> = m
            .modules
            .iter()
            .filter(|module| module.effective_category() == cat)
            .collect();
        render_category(&cat, &modules, &registry).unwrap()
    }

    #[test]
    fn aggregate_filters_by_phase() {
        let m = manifest(
            "  - {id: shell.zsh, description: z, phase: 1, install: [x], verify: [x]}\n  \
             - {id: shell.tmux, description: t, phase: 3, install: [x], verify: [x]}\n  \
             - {id: shell.fish, description: f, phase: 1, install: [x], verify: [x]}\n",
        );
        let text = render(&m, "shell");
        let aggregate = &text[text.find("install_shell() {").unwrap()..];
        assert!(aggregate.contains(
            "    if [[ -z \"$acfs_phase\" || \"$acfs_phase\" == \"1\" ]]; then\n        acfs_install_shell_zsh || return 1\n        acfs_install_shell_fish || return 1\n    fi\n"
        ));
        assert!(aggregate.contains("\"$acfs_phase\" == \"3\" ]]; then\n        acfs_install_shell_tmux || return 1\n"));
        assert!(text.ends_with("if [[ \"${BASH_SOURCE[0]}\" == \"${0}\" ]]; then\n    install_shell \"$@\"\nfi\n"));
    }

    #[test]
    fn hand_maintained_modules_get_no_function() {
        let m = manifest(
            "  - {id: shell.zsh, description: z, install: [x], verify: [x]}\n  \
             - {id: shell.tmux, description: t, generated: false, verify: [x]}\n",
        );
        let text = render(&m, "shell");
        assert!(text.contains("acfs_install_shell_zsh() {"));
        assert!(!text.contains("install_shell_tmux() {"));
        assert!(!text.contains("install_shell_tmux ||"));
        assert!(text.contains("# shell.tmux is maintained by hand"));
    }

    #[test]
    fn skipped_array_initialised_without_clobbering() {
        let m = manifest("  - {id: base, description: b, install: [x], verify: [x]}\n");
        let text = render(&m, "base");
        assert!(text.contains("if [[ -z \"${ACFS_SKIPPED_MODULES+x}\" ]]; then\n    ACFS_SKIPPED_MODULES=()\nfi\n"));
        assert!(text.contains("_acfs_module_listed() {"));
    }
}
