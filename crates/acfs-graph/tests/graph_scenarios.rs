//! Integration tests: graph validation and sequencing over parsed manifests.

use std::path::PathBuf;

use acfs_graph::{sequence, validate, GraphErrorKind};
use acfs_manifest::Manifest;
use proptest::prelude::*;

fn parse(modules_yaml: &str) -> Manifest {
    let source = format!(
        "version: 1\nname: T\nid: acfs\ndefaults:\n  user: ubuntu\n  workspace_root: /data\n  mode: vibe\nmodules:\n{modules_yaml}"
    );
    acfs_manifest::load_str(&source).unwrap().manifest
}

fn ids(manifest: &Manifest) -> Vec<String> {
    let graph = validate(manifest).unwrap();
    sequence(&graph).iter().map(|m| m.id.to_string()).collect()
}

#[test]
fn two_module_cycle_names_both_members() {
    let m = parse(
        "  - {id: a, description: A, install: [x], verify: [x], dependencies: [b]}\n  \
         - {id: b, description: B, install: [x], verify: [x], dependencies: [a]}\n",
    );
    let errs = validate(&m).unwrap_err();
    assert_eq!(errs.len(), 1);
    let GraphErrorKind::Cycle { members } = &errs.errors()[0].kind else {
        panic!("expected a cycle: {errs}");
    };
    let mut names: Vec<&str> = members.iter().map(|id| id.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn dependency_in_later_phase_is_rejected() {
    let m = parse(
        "  - {id: base, description: B, phase: 2, install: [x], verify: [x]}\n  \
         - {id: shell, description: S, phase: 1, install: [x], verify: [x], dependencies: [base]}\n",
    );
    let errs = validate(&m).unwrap_err();
    assert_eq!(errs.len(), 1);
    let err = &errs.errors()[0];
    assert_eq!(err.path, "modules.shell.dependencies");
    assert_eq!(err.value, "base");
    assert_eq!(
        err.kind,
        GraphErrorKind::PhaseViolation {
            phase: 1,
            dependency_phase: 2
        }
    );
}

#[test]
fn single_unknown_dependency_is_exactly_one_error() {
    let m = parse(
        "  - {id: tools.jq, description: jq, install: [x], verify: [x], dependencies: [nonexistent]}\n",
    );
    let errs = validate(&m).unwrap_err();
    assert_eq!(errs.len(), 1);
    let err = &errs.errors()[0];
    assert_eq!(err.kind, GraphErrorKind::UnknownDependency);
    assert_eq!(err.path, "modules.tools.jq.dependencies");
    assert_eq!(err.value, "nonexistent");
}

#[test]
fn base_shell_agents_scenario() {
    let m = parse(
        "  - {id: agents, description: A, phase: 2, install: [x], verify: [x], dependencies: [shell]}\n  \
         - {id: shell, description: S, phase: 1, install: [x], verify: [x], dependencies: [base]}\n  \
         - {id: base, description: B, phase: 1, install: [x], verify: [x]}\n",
    );
    assert_eq!(ids(&m), vec!["base", "shell", "agents"]);
    let graph = validate(&m).unwrap();
    let cats: Vec<String> = sequence(&graph)
        .categories()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(cats, vec!["base", "shell", "agents"]);
}

#[test]
fn sample_manifest_sequences() {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop();
    path.pop();
    let loaded = acfs_manifest::load(&path.join("fixtures/acfs.manifest.yaml")).unwrap();
    let graph = validate(&loaded.manifest).unwrap();

    let advised: Vec<&str> = graph.advisories().iter().map(|a| a.module.as_str()).collect();
    assert_eq!(advised, vec!["tools.vault"]);

    assert_eq!(
        ids(&loaded.manifest),
        vec![
            "base.system",
            "users.ubuntu",
            "shell.zsh",
            "shell.tmux",
            "lang.bun",
            "lang.uv",
            "agents.claude",
            "tools.vault",
        ]
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Without edges the order is a stable sort of the manifest by phase.
    #[test]
    fn edge_free_manifest_is_phase_stable_permutation(phases in prop::collection::vec(1u8..=10, 1..24)) {
        let yaml: String = phases
            .iter()
            .enumerate()
            .map(|(i, p)| format!("  - {{id: m{i}, description: d, phase: {p}, install: [x], verify: [x]}}\n"))
            .collect();
        let m = parse(&yaml);

        let mut expected: Vec<(u8, usize)> = phases.iter().copied().zip(0..).collect();
        expected.sort_by_key(|&(p, _)| p);
        let expected: Vec<String> = expected.iter().map(|(_, i)| format!("m{i}")).collect();

        prop_assert_eq!(ids(&m), expected);
    }
}
