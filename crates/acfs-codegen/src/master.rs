//! `install_all.sh`: sources every category script, then walks phases in
//! ascending order and calls each category aggregate restricted to that
//! phase. Categories are visited in first-appearance order.

use acfs_core::Category;
use acfs_graph::Sequence;

use crate::script::Script;

/// `(phase, categories with generated modules in that phase)`, both in
/// install order.
pub(crate) fn phase_plan(sequence: &Sequence<'_>) -> Vec<(u8, Vec<Category>)> {
    sequence
        .phases()
        .iter()
        .filter_map(|group| {
            let mut categories: Vec<Category> = Vec::new();
            for module in group.modules.iter().filter(|m| m.generated) {
                let category = module.effective_category();
                if !categories.contains(&category) {
                    categories.push(category);
                }
            }
            (!categories.is_empty()).then_some((group.phase, categories))
        })
        .collect()
}

pub(crate) fn render_master(categories: &[Category], plan: &[(u8, Vec<Category>)]) -> String {
    let mut script = Script::executable(
        "Master installer: every category, phase by phase.\n\nDRY_RUN=true logs what would run. ACFS_SKIP_MODULES and ACFS_ENABLE_MODULES\ntake space-separated module ids.",
    );

    for category in categories {
        script.line(
            0,
            format!("# shellcheck source={}", category.script_name()),
        );
        script.line(
            0,
            format!(
                "source \"$ACFS_GENERATED_SCRIPT_DIR/{}\"",
                category.script_name()
            ),
        );
    }
    script.blank();

    script.line(0, "main() {");
    for (phase, members) in plan {
        script.line(1, format!("log_section 'Phase {phase}'"));
        for category in members {
            script.line(
                1,
                format!("{} {phase} || return 1", category.install_function()),
            );
        }
    }
    script.line(1, "if [[ \"${#ACFS_SKIPPED_MODULES[@]}\" -gt 0 ]]; then");
    script.line(
        2,
        "log_warn \"Skipped optional modules: ${ACFS_SKIPPED_MODULES[*]}\"",
    );
    script.line(1, "fi");
    script.line(1, "log_success 'All phases complete'");
    script.line(0, "}");
    script.blank();
    script.line(0, "if [[ \"${BASH_SOURCE[0]}\" == \"${0}\" ]]; then");
    script.line(1, "main \"$@\"");
    script.line(0, "fi");
    script.finish()
}
