//! # Dependency Graph Validation
//!
//! Builds an index arena over the manifest's modules and runs every graph
//! check in one pass:
//!
//! 1. duplicate ids, including distinct ids that collapse to the same shell
//!    identifier;
//! 2. unknown dependencies;
//! 3. dependency cycles (iterative DFS with visiting/visited coloring);
//! 4. phase ordering: a dependency never runs in a later phase than its
//!    dependent.
//!
//! Findings 1-4 are fatal and collected into [`GraphErrors`]. Modules whose
//! install list is nothing but placeholders produce an [`Advisory`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use acfs_core::ModuleId;
use acfs_manifest::{Manifest, Module};

use crate::error::{Advisory, GraphError, GraphErrorKind, GraphErrors};
use crate::steps::{classify, StepKind};

/// A manifest whose dependency graph passed every fatal check.
///
/// Only [`validate`] constructs this, so the sequencer never sees a graph
/// with cycles, dangling edges or phase inversions.
#[derive(Debug, Clone)]
pub struct ValidatedGraph<'m> {
    pub(crate) manifest: &'m Manifest,
    /// `edges[i]` holds arena indices of module `i`'s dependencies, in
    /// declaration order and without repeats.
    pub(crate) edges: Vec<Vec<usize>>,
    advisories: Vec<Advisory>,
}

impl<'m> ValidatedGraph<'m> {
    /// The manifest this graph was built from.
    pub fn manifest(&self) -> &'m Manifest {
        self.manifest
    }

    /// Non-fatal findings.
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    /// Total number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    Visiting,
    Visited,
}

fn dependencies_path(module: &Module) -> String {
    format!("modules.{}.dependencies", module.id)
}

/// Validate the dependency graph of a schema-valid manifest.
///
/// # Errors
///
/// Returns every duplicate, unknown dependency, cycle and phase violation.
pub fn validate(manifest: &Manifest) -> Result<ValidatedGraph<'_>, GraphErrors> {
    let modules = &manifest.modules;
    let mut errors = Vec::new();

    let index = check_ids(modules, &mut errors);
    let edges = resolve_edges(modules, &index, &mut errors);
    check_cycles(modules, &edges, &mut errors);
    check_phases(modules, &edges, &mut errors);

    if !errors.is_empty() {
        tracing::debug!(violations = errors.len(), "dependency graph rejected");
        return Err(GraphErrors::new(errors));
    }

    let advisories = placeholder_advisories(modules);
    for advisory in &advisories {
        tracing::warn!(module = %advisory.module, "{}", advisory.message);
    }

    let graph = ValidatedGraph {
        manifest,
        edges,
        advisories,
    };
    tracing::debug!(
        modules = modules.len(),
        edges = graph.edge_count(),
        "dependency graph validated"
    );
    Ok(graph)
}

/// Map each id to its first arena index, reporting repeats and shell
/// identifier collisions.
fn check_ids<'a>(modules: &'a [Module], errors: &mut Vec<GraphError>) -> HashMap<&'a str, usize> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(modules.len());
    let mut idents: HashMap<String, usize> = HashMap::with_capacity(modules.len());

    for (i, module) in modules.iter().enumerate() {
        let path = format!("modules.{}.id", module.id);
        if let Some(&first) = index.get(module.id.as_str()) {
            errors.push(GraphError {
                kind: GraphErrorKind::DuplicateId {
                    first: modules[first].id.clone(),
                },
                module: module.id.clone(),
                path,
                value: module.id.to_string(),
            });
            continue;
        }
        index.insert(module.id.as_str(), i);

        match idents.get(&module.id.shell_ident()) {
            Some(&other) => errors.push(GraphError {
                kind: GraphErrorKind::DuplicateId {
                    first: modules[other].id.clone(),
                },
                module: module.id.clone(),
                path,
                value: module.id.to_string(),
            }),
            None => {
                idents.insert(module.id.shell_ident(), i);
            }
        }
    }
    index
}

fn resolve_edges(
    modules: &[Module],
    index: &HashMap<&str, usize>,
    errors: &mut Vec<GraphError>,
) -> Vec<Vec<usize>> {
    modules
        .iter()
        .map(|module| {
            let mut targets = Vec::with_capacity(module.dependencies.len());
            let mut unknown: BTreeSet<&ModuleId> = BTreeSet::new();
            for dep in &module.dependencies {
                match index.get(dep.as_str()) {
                    Some(&j) => {
                        if !targets.contains(&j) {
                            targets.push(j);
                        }
                    }
                    None => {
                        if unknown.insert(dep) {
                            errors.push(GraphError {
                                kind: GraphErrorKind::UnknownDependency,
                                module: module.id.clone(),
                                path: dependencies_path(module),
                                value: dep.to_string(),
                            });
                        }
                    }
                }
            }
            targets
        })
        .collect()
}

/// Iterative DFS over every node in manifest order. A back edge into a
/// `Visiting` node closes a cycle made of the path suffix starting there.
fn check_cycles(modules: &[Module], edges: &[Vec<usize>], errors: &mut Vec<GraphError>) {
    let mut color = vec![Color::Unvisited; modules.len()];
    let mut path: Vec<usize> = Vec::new();
    let mut reported: BTreeSet<Vec<usize>> = BTreeSet::new();

    for root in 0..modules.len() {
        if color[root] != Color::Unvisited {
            continue;
        }
        // (node, next edge to explore)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        color[root] = Color::Visiting;
        path.push(root);

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let Some(&target) = edges[node].get(next) else {
                color[node] = Color::Visited;
                path.pop();
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match color[target] {
                Color::Unvisited => {
                    color[target] = Color::Visiting;
                    path.push(target);
                    stack.push((target, 0));
                }
                Color::Visiting => {
                    let start = path.iter().rposition(|&n| n == target).unwrap_or(0);
                    let members = &path[start..];
                    let mut key = members.to_vec();
                    key.sort_unstable();
                    if reported.insert(key) {
                        errors.push(GraphError {
                            kind: GraphErrorKind::Cycle {
                                members: members.iter().map(|&n| modules[n].id.clone()).collect(),
                            },
                            module: modules[node].id.clone(),
                            path: dependencies_path(&modules[node]),
                            value: modules[target].id.to_string(),
                        });
                    }
                }
                Color::Visited => {}
            }
        }
    }
}

fn check_phases(modules: &[Module], edges: &[Vec<usize>], errors: &mut Vec<GraphError>) {
    for (i, module) in modules.iter().enumerate() {
        let phase = module.effective_phase();
        for &j in &edges[i] {
            let dependency_phase = modules[j].effective_phase();
            if dependency_phase > phase {
                errors.push(GraphError {
                    kind: GraphErrorKind::PhaseViolation {
                        phase,
                        dependency_phase,
                    },
                    module: module.id.clone(),
                    path: dependencies_path(module),
                    value: modules[j].id.to_string(),
                });
            }
        }
    }
}

/// Flag generated modules without a verified installer whose non-blank
/// install steps are all placeholders.
fn placeholder_advisories(modules: &[Module]) -> Vec<Advisory> {
    modules
        .iter()
        .filter(|m| m.generated && m.verified_installer.is_none())
        .filter_map(|m| {
            let kinds: Vec<StepKind> = m
                .install
                .iter()
                .map(|s| classify(s))
                .filter(|k| *k != StepKind::Blank)
                .collect();
            if kinds.is_empty() || !kinds.iter().all(StepKind::is_placeholder) {
                return None;
            }
            let mut reasons: BTreeMap<&str, usize> = BTreeMap::new();
            for kind in &kinds {
                if let StepKind::Placeholder(reason) = kind {
                    *reasons.entry(reason.as_str()).or_default() += 1;
                }
            }
            let reasons: Vec<&str> = reasons.keys().copied().collect();
            Some(Advisory {
                module: m.id.clone(),
                path: format!("modules.{}.install", m.id),
                message: format!(
                    "install steps are descriptions, not commands ({}); module is likely incomplete",
                    reasons.join(", ")
                ),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use acfs_manifest::{Defaults, Mode, RunAs};

    fn module(id: &str, phase: Option<u8>, deps: &[&str]) -> Module {
        Module {
            id: ModuleId::parse(id).unwrap(),
            description: format!("{id} module"),
            category: None,
            run_as: RunAs::TargetUser,
            verified_installer: None,
            optional: false,
            enabled_by_default: true,
            generated: true,
            installed_check: None,
            phase,
            install: vec!["true".to_string()],
            verify: vec!["true".to_string()],
            dependencies: deps.iter().map(|d| ModuleId::parse(*d).unwrap()).collect(),
            tags: vec![],
            notes: vec![],
            aliases: vec![],
            docs_url: None,
        }
    }

    fn manifest(modules: Vec<Module>) -> Manifest {
        Manifest {
            version: 1,
            name: "Test".to_string(),
            id: "acfs".to_string(),
            defaults: Defaults {
                user: "ubuntu".to_string(),
                workspace_root: "/data/projects".to_string(),
                mode: Mode::Vibe,
            },
            modules,
        }
    }

    fn kinds(errs: &GraphErrors) -> Vec<&'static str> {
        errs.errors().iter().map(|e| e.kind.as_str()).collect()
    }

    #[test]
    fn acyclic_manifest_validates() {
        let m = manifest(vec![
            module("base", None, &[]),
            module("shell", None, &["base"]),
            module("agents", Some(2), &["shell", "base"]),
        ]);
        let graph = validate(&m).unwrap();
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.advisories().is_empty());
    }

    #[test]
    fn duplicate_id_reported_at_second_declaration() {
        let m = manifest(vec![module("a", None, &[]), module("a", None, &[])]);
        let errs = validate(&m).unwrap_err();
        assert_eq!(kinds(&errs), vec!["duplicate-id"]);
        assert_eq!(errs.errors()[0].path, "modules.a.id");
    }

    #[test]
    fn shell_ident_collision_is_duplicate() {
        let m = manifest(vec![module("a.b_c", None, &[]), module("a_b.c", None, &[])]);
        let errs = validate(&m).unwrap_err();
        assert_eq!(errs.len(), 1);
        let err = &errs.errors()[0];
        assert_eq!(err.value, "a_b.c");
        assert!(matches!(
            &err.kind,
            GraphErrorKind::DuplicateId { first } if first.as_str() == "a.b_c"
        ));
    }

    #[test]
    fn repeated_unknown_dependency_reported_once() {
        let m = manifest(vec![module("a", None, &["ghost", "ghost", "spook"])]);
        let errs = validate(&m).unwrap_err();
        let values: Vec<&str> = errs.errors().iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["ghost", "spook"]);
    }

    #[test]
    fn self_dependency_is_one_member_cycle() {
        let m = manifest(vec![module("a", None, &["a"])]);
        let errs = validate(&m).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(matches!(
            &errs.errors()[0].kind,
            GraphErrorKind::Cycle { members } if members.len() == 1
        ));
    }

    #[test]
    fn three_cycle_reported_once_with_all_members() {
        let m = manifest(vec![
            module("a", None, &["b"]),
            module("b", None, &["c"]),
            module("c", None, &["a"]),
        ]);
        let errs = validate(&m).unwrap_err();
        assert_eq!(errs.len(), 1);
        let err = &errs.errors()[0];
        assert_eq!(err.module.as_str(), "c");
        assert_eq!(err.value, "a");
        let GraphErrorKind::Cycle { members } = &err.kind else {
            panic!("expected cycle, got {err}");
        };
        let names: Vec<&str> = members.iter().map(ModuleId::as_str).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn disjoint_cycles_both_reported() {
        let m = manifest(vec![
            module("a", None, &["b"]),
            module("b", None, &["a"]),
            module("c", None, &["d"]),
            module("d", None, &["c"]),
        ]);
        let errs = validate(&m).unwrap_err();
        assert_eq!(kinds(&errs), vec!["cycle", "cycle"]);
    }

    #[test]
    fn same_phase_and_earlier_phase_dependencies_allowed() {
        let m = manifest(vec![
            module("a", Some(2), &[]),
            module("b", Some(2), &["a"]),
            module("c", Some(5), &["a", "b"]),
        ]);
        assert!(validate(&m).is_ok());
    }

    #[test]
    fn all_violation_kinds_collected_together() {
        let m = manifest(vec![
            module("a", None, &[]),
            module("a", None, &[]),
            module("b", Some(1), &["c", "missing"]),
            module("c", Some(3), &[]),
            module("d", None, &["d"]),
        ]);
        let errs = validate(&m).unwrap_err();
        let found = kinds(&errs);
        for kind in ["duplicate-id", "unknown-dependency", "cycle", "phase-violation"] {
            assert!(found.contains(&kind), "missing {kind} in {errs}");
        }
    }

    #[test]
    fn placeholder_only_module_gets_advisory() {
        let mut vault = module("tools.vault", None, &[]);
        vault.install = vec![
            "Install the Vault CLI from HashiCorp".to_string(),
            "   ".to_string(),
            "TODO: pin version".to_string(),
        ];
        let mut mixed = module("tools.jq", None, &[]);
        mixed.install = vec!["TODO: pin".to_string(), "apt-get install -y jq".to_string()];
        let m = manifest(vec![vault, mixed]);
        let graph = validate(&m).unwrap();
        assert_eq!(graph.advisories().len(), 1);
        let advisory = &graph.advisories()[0];
        assert_eq!(advisory.path, "modules.tools.vault.install");
        assert!(advisory.message.contains("directive marker"));
        assert!(advisory.message.contains("imperative sentence"));
    }

    #[test]
    fn non_generated_modules_get_no_advisory() {
        let mut manual = module("shell.tmux", None, &[]);
        manual.generated = false;
        manual.install = vec!["Configure tmux by hand".to_string()];
        let m = manifest(vec![manual]);
        assert!(validate(&m).unwrap().advisories().is_empty());
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let ids: Vec<String> = (0..20_000).map(|i| format!("m{i}")).collect();
        let modules: Vec<Module> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let deps: Vec<&str> = if i + 1 < ids.len() {
                    vec![ids[i + 1].as_str()]
                } else {
                    vec![]
                };
                module(id, None, &deps)
            })
            .collect();
        let m = manifest(modules);
        assert!(validate(&m).is_ok());
    }
}
