//! # Phase-Grouped Topological Sequencing
//!
//! Orders a [`ValidatedGraph`] for installation. Modules are grouped by
//! ascending effective phase. Inside a phase, a post-order DFS over the
//! intra-phase dependency edges puts every dependency before its dependent.
//! Roots are visited in manifest order and dependencies in declaration order,
//! so an unchanged manifest always yields the same order.
//!
//! Cross-phase edges are ignored here. [`crate::graph::validate`] already
//! guarantees that they point to an earlier phase.

use std::collections::BTreeMap;

use acfs_core::Category;
use acfs_manifest::Module;

use crate::graph::ValidatedGraph;

/// Modules of one phase, in install order.
#[derive(Debug, Clone)]
pub struct PhaseGroup<'m> {
    /// Effective phase shared by every module in the group.
    pub phase: u8,
    /// Install order within the phase.
    pub modules: Vec<&'m Module>,
}

/// The full install order.
#[derive(Debug, Clone)]
pub struct Sequence<'m> {
    phases: Vec<PhaseGroup<'m>>,
}

impl<'m> Sequence<'m> {
    /// Phase groups in ascending phase order.
    pub fn phases(&self) -> &[PhaseGroup<'m>] {
        &self.phases
    }

    /// Every module in install order.
    pub fn iter(&self) -> impl Iterator<Item = &'m Module> + '_ {
        self.phases.iter().flat_map(|g| g.modules.iter().copied())
    }

    /// Number of sequenced modules.
    pub fn len(&self) -> usize {
        self.phases.iter().map(|g| g.modules.len()).sum()
    }

    /// True if nothing was sequenced.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Categories in order of first appearance in the install order.
    pub fn categories(&self) -> Vec<Category> {
        let mut seen = Vec::new();
        for module in self.iter() {
            let category = module.effective_category();
            if !seen.contains(&category) {
                seen.push(category);
            }
        }
        seen
    }
}

/// Compute the install order of a validated graph.
pub fn sequence<'m>(graph: &ValidatedGraph<'m>) -> Sequence<'m> {
    let modules = &graph.manifest.modules;

    let mut by_phase: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, module) in modules.iter().enumerate() {
        by_phase.entry(module.effective_phase()).or_default().push(i);
    }

    let mut visited = vec![false; modules.len()];
    let mut phases = Vec::with_capacity(by_phase.len());

    for (phase, members) in by_phase {
        let mut order = Vec::with_capacity(members.len());
        for root in members {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                match graph.edges[node].get(next) {
                    Some(&dep) => {
                        frame.1 += 1;
                        if !visited[dep] && modules[dep].effective_phase() == phase {
                            visited[dep] = true;
                            stack.push((dep, 0));
                        }
                    }
                    None => {
                        order.push(&modules[node]);
                        stack.pop();
                    }
                }
            }
        }
        phases.push(PhaseGroup {
            phase,
            modules: order,
        });
    }

    let sequence = Sequence { phases };
    tracing::debug!(
        modules = sequence.len(),
        phases = sequence.phases.len(),
        "sequenced modules"
    );
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::validate;
    use acfs_manifest::Manifest;

    fn manifest(modules: &[(&str, u8, &[&str])]) -> Manifest {
        let mut yaml = String::from(
            "version: 1\nname: T\nid: acfs\ndefaults:\n  user: ubuntu\n  workspace_root: /data\n  mode: vibe\nmodules:\n",
        );
        for (id, phase, deps) in modules {
            yaml.push_str(&format!(
                "  - id: {id}\n    description: d\n    phase: {phase}\n    install: [\"true\"]\n    verify: [\"true\"]\n    dependencies: [{}]\n",
                deps.join(", ")
            ));
        }
        acfs_manifest::load_str(&yaml).unwrap().manifest
    }

    fn order(m: &Manifest) -> Vec<String> {
        let graph = validate(m).unwrap();
        sequence(&graph).iter().map(|m| m.id.to_string()).collect()
    }

    #[test]
    fn dependency_moves_ahead_within_phase() {
        let m = manifest(&[("b", 1, &["a"]), ("a", 1, &[])]);
        assert_eq!(order(&m), vec!["a", "b"]);
    }

    #[test]
    fn phases_ascend_regardless_of_manifest_order() {
        let m = manifest(&[("late", 3, &[]), ("early", 1, &[]), ("mid", 2, &["early"])]);
        assert_eq!(order(&m), vec!["early", "mid", "late"]);
    }

    #[test]
    fn ties_keep_manifest_order() {
        let m = manifest(&[("c", 1, &[]), ("a", 1, &[]), ("b", 1, &[])]);
        assert_eq!(order(&m), vec!["c", "a", "b"]);
    }

    #[test]
    fn dependencies_visited_in_declaration_order() {
        let m = manifest(&[
            ("top", 1, &["y", "x"]),
            ("x", 1, &[]),
            ("y", 1, &[]),
        ]);
        assert_eq!(order(&m), vec!["y", "x", "top"]);
    }

    #[test]
    fn cross_phase_edges_do_not_pull_modules_forward() {
        let m = manifest(&[("agents", 2, &["base"]), ("other", 1, &[]), ("base", 1, &[])]);
        assert_eq!(order(&m), vec!["other", "base", "agents"]);
    }

    #[test]
    fn groups_and_categories() {
        let m = manifest(&[
            ("base.system", 1, &[]),
            ("lang.bun", 2, &[]),
            ("base.users", 1, &["base.system"]),
            ("shell.zsh", 2, &[]),
        ]);
        let graph = validate(&m).unwrap();
        let seq = sequence(&graph);
        let phases: Vec<u8> = seq.phases().iter().map(|g| g.phase).collect();
        assert_eq!(phases, vec![1, 2]);
        let cats: Vec<String> = seq.categories().iter().map(|c| c.to_string()).collect();
        assert_eq!(cats, vec!["base", "lang", "shell"]);
        assert_eq!(seq.len(), 4);
    }
}
