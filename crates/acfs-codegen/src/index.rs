//! `manifest_index.sh`: per-module metadata for generated and hand-written
//! scripts, so they never re-parse the manifest.
//!
//! Data only. No strict-mode preamble and nothing sourced, so sourcing it
//! cannot change the caller's shell options. Every variable is declared with
//! `declare -g`, which keeps it global when sourced inside a function.

use acfs_core::{Category, ContentDigest};
use acfs_graph::Sequence;
use acfs_manifest::{Manifest, Module};

use crate::quote::single_quote;
use crate::script::Script;

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn emit_array(script: &mut Script, name: &str, values: &[String]) {
    script.line(0, format!("declare -ga {name}=("));
    for value in values {
        script.line(1, single_quote(value));
    }
    script.line(0, ")");
}

fn emit_assoc(
    script: &mut Script,
    name: &str,
    modules: &[&Module],
    value: impl Fn(&Module) -> String,
) {
    script.line(0, format!("declare -gA {name}=("));
    for module in modules {
        script.line(
            1,
            format!("[{}]={}", single_quote(module.id.as_str()), single_quote(&value(module))),
        );
    }
    script.line(0, ")");
}

pub(crate) fn render_index(
    manifest: &Manifest,
    digest: &ContentDigest,
    sequence: &Sequence<'_>,
    categories: &[Category],
) -> String {
    let mut script = Script::data(
        "Manifest index: module metadata in install order.\n\nSafe to source: data only, no side effects.\nshellcheck disable=SC2034",
    );
    let modules: Vec<&Module> = sequence.iter().collect();

    script.line(0, format!("declare -g ACFS_MANIFEST_SHA256={}", single_quote(&digest.to_hex())));
    script.line(0, format!("declare -g ACFS_MANIFEST_NAME={}", single_quote(&manifest.name)));
    script.line(
        0,
        format!(
            "declare -g ACFS_MANIFEST_VERSION={}",
            single_quote(&manifest.version.to_string())
        ),
    );
    script.blank();

    let ids: Vec<String> = modules.iter().map(|m| m.id.to_string()).collect();
    emit_array(&mut script, "ACFS_MODULES_IN_ORDER", &ids);
    let names: Vec<String> = categories.iter().map(ToString::to_string).collect();
    emit_array(&mut script, "ACFS_CATEGORIES", &names);
    script.blank();

    emit_assoc(&mut script, "ACFS_MODULE_PHASE", &modules, |m| {
        m.effective_phase().to_string()
    });
    emit_assoc(&mut script, "ACFS_MODULE_DEPS", &modules, |m| {
        m.dependencies
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    });
    emit_assoc(&mut script, "ACFS_MODULE_CATEGORY", &modules, |m| {
        m.effective_category().to_string()
    });
    emit_assoc(&mut script, "ACFS_MODULE_TAGS", &modules, |m| m.tags.join(" "));
    emit_assoc(&mut script, "ACFS_MODULE_DEFAULT", &modules, |m| {
        flag(m.enabled_by_default).to_string()
    });
    emit_assoc(&mut script, "ACFS_MODULE_OPTIONAL", &modules, |m| {
        flag(m.optional).to_string()
    });
    emit_assoc(&mut script, "ACFS_MODULE_FUNC", &modules, |m| {
        if m.generated {
            m.id.install_function()
        } else {
            String::new()
        }
    });

    script.finish()
}
