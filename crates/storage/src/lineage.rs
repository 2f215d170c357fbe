//! Genealogy naming and lineage queries.

use promptevo_core::{Candidate, CandidateId, CreationMethod};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hands out short genealogy names ("Genesis", "G2M01 from Genesis").
#[derive(Debug, Default)]
pub struct Namer {
    per_generation: HashMap<u32, u32>,
    seeds: u32,
}

impl Namer {
    /// Create a namer with empty counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for the next seed.
    pub fn seed(&mut self) -> String {
        self.seeds += 1;
        if self.seeds == 1 {
            "Genesis".to_string()
        } else {
            format!("Genesis-{}", self.seeds)
        }
    }

    /// Name for the next offspring of `generation`.
    pub fn offspring(&mut self, generation: u32, method: CreationMethod, parent_names: &[&str]) -> String {
        let count = self.per_generation.entry(generation).or_insert(0);
        let n = *count;
        *count += 1;

        let tag = match method {
            CreationMethod::Crossover => 'C',
            _ => 'M',
        };
        let parents: Vec<&str> = parent_names.iter().map(|p| base_name(p)).collect();
        format!("G{generation}{tag}{n:02} from {}", parents.join(" & "))
    }
}

/// The part of a genealogy name before " from ".
pub fn base_name(name: &str) -> &str {
    name.split(" from ").next().unwrap_or(name).trim()
}

/// One step of an ancestry path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncestryStep {
    /// Candidate at this step
    pub id: CandidateId,
    /// Its display name
    pub name: String,
    /// How it was created
    pub method: CreationMethod,
    /// Its generation
    pub generation: u32,
}

/// Read-only lineage view over a snapshot of the candidate store.
pub struct Lineage<'a> {
    by_id: HashMap<CandidateId, &'a Candidate>,
    children: HashMap<CandidateId, Vec<&'a Candidate>>,
    roots: Vec<&'a Candidate>,
}

impl<'a> Lineage<'a> {
    /// Index a snapshot.
    pub fn new(candidates: &'a [Candidate]) -> Self {
        let mut by_id = HashMap::new();
        let mut children: HashMap<CandidateId, Vec<&'a Candidate>> = HashMap::new();
        let mut roots = Vec::new();

        for candidate in candidates {
            by_id.insert(candidate.id, candidate);
            if candidate.parents.is_empty() {
                roots.push(candidate);
            }
            for parent in &candidate.parents {
                children.entry(*parent).or_default().push(candidate);
            }
        }

        Self { by_id, children, roots }
    }

    /// Path from a root to `id`, following the first parent at each step.
    pub fn ancestry(&self, id: CandidateId) -> Vec<AncestryStep> {
        let mut path = Vec::new();
        let mut current = self.by_id.get(&id).copied();

        while let Some(candidate) = current {
            path.push(AncestryStep {
                id: candidate.id,
                name: candidate.name.clone(),
                method: candidate.method,
                generation: candidate.generation,
            });
            // Parents are always older, so this terminates
            current = candidate.parents.first().and_then(|p| self.by_id.get(p).copied());
        }

        path.reverse();
        path
    }

    /// Every candidate descending from `id`, breadth first.
    pub fn descendants(&self, id: CandidateId) -> Vec<CandidateId> {
        let mut seen = std::collections::HashSet::new();
        let mut queue = std::collections::VecDeque::from([id]);
        let mut out = Vec::new();

        while let Some(next) = queue.pop_front() {
            for child in self.children.get(&next).into_iter().flatten() {
                if seen.insert(child.id) {
                    out.push(child.id);
                    queue.push_back(child.id);
                }
            }
        }

        out
    }

    /// Text rendering of the family tree, down to `max_depth` levels below each root.
    pub fn family_tree(&self, max_depth: usize) -> String {
        let mut lines = vec!["Prompt genealogy".to_string()];
        for root in &self.roots {
            self.render(root, 0, max_depth, &mut lines);
        }
        lines.join("\n")
    }

    fn render(&self, node: &Candidate, depth: usize, max_depth: usize, lines: &mut Vec<String>) {
        if depth > max_depth {
            return;
        }
        lines.push(format!(
            "{}├─ {} (G{}, {})",
            "  ".repeat(depth),
            node.name,
            node.generation,
            node.method
        ));

        let mut kids: Vec<&Candidate> = self.children.get(&node.id).cloned().unwrap_or_default();
        kids.sort_by(|a, b| a.generation.cmp(&b.generation).then_with(|| a.name.cmp(&b.name)));
        for child in kids {
            self.render(child, depth + 1, max_depth, lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str, generation: u32, parents: Vec<CandidateId>, method: CreationMethod) -> Candidate {
        Candidate::new(name, "You are a patient mentor.", generation, parents, method)
    }

    #[test]
    fn test_namer_formats() {
        let mut namer = Namer::new();
        assert_eq!(namer.seed(), "Genesis");
        assert_eq!(namer.seed(), "Genesis-2");
        assert_eq!(
            namer.offspring(1, CreationMethod::Mutation, &["Genesis"]),
            "G1M00 from Genesis"
        );
        assert_eq!(
            namer.offspring(1, CreationMethod::Crossover, &["G1M00 from Genesis", "Genesis"]),
            "G1C01 from G1M00 & Genesis"
        );
        assert_eq!(
            namer.offspring(2, CreationMethod::Mutation, &["G1C01 from G1M00 & Genesis"]),
            "G2M00 from G1C01"
        );
    }

    #[test]
    fn test_ancestry_and_descendants() {
        let root = child("Genesis", 0, vec![], CreationMethod::Seed);
        let a = child("G1M00 from Genesis", 1, vec![root.id], CreationMethod::Mutation);
        let b = child("G2C00 from G1M00 & Genesis", 2, vec![a.id, root.id], CreationMethod::Crossover);
        let snapshot = vec![root.clone(), a.clone(), b.clone()];
        let lineage = Lineage::new(&snapshot);

        let path: Vec<_> = lineage.ancestry(b.id).into_iter().map(|s| s.id).collect();
        assert_eq!(path, vec![root.id, a.id, b.id]);

        let descendants = lineage.descendants(root.id);
        assert_eq!(descendants.len(), 2);
        assert!(descendants.contains(&a.id) && descendants.contains(&b.id));
        assert!(lineage.descendants(b.id).is_empty());
    }

    #[test]
    fn test_family_tree_respects_depth() {
        let root = child("Genesis", 0, vec![], CreationMethod::Seed);
        let a = child("G1M00 from Genesis", 1, vec![root.id], CreationMethod::Mutation);
        let b = child("G2M00 from G1M00", 2, vec![a.id], CreationMethod::Mutation);
        let snapshot = vec![root, a, b];
        let lineage = Lineage::new(&snapshot);

        let full = lineage.family_tree(5);
        assert!(full.contains("├─ Genesis (G0, seed)"));
        assert!(full.contains("    ├─ G2M00 from G1M00 (G2, mutation)"));

        let shallow = lineage.family_tree(1);
        assert!(!shallow.contains("G2M00"));
    }
}
