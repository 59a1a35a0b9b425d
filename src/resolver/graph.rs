// src/resolver/graph.rs

//! Dependency graph data structures and algorithms
//!
//! Nodes live in an arena addressed by index, with a map from identifier to
//! index. Edges point from a dependent to its dependency. The graph is built
//! fresh from a lock snapshot on every pass and never persisted.

use crate::error::{Error, Result};
use crate::lock::Dependency;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use super::ResolutionPolicy;
use super::node::Node;

/// DFS marking for cycle detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Directed acyclic graph of packages and the dependencies they declare
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    policy: ResolutionPolicy,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    /// Outgoing edges per node, in insertion order
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Create an empty graph
    ///
    /// Under [`ResolutionPolicy::Updatable`] constraints are also recorded on
    /// installed packages that other installed packages depend on, so their
    /// upgrades can honor every parent.
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Reset the graph to the supplied nodes and the dependencies they declare
    ///
    /// Returns the dependencies that no supplied node provides, in the order
    /// they were first referenced. Parent constraints already present on the
    /// supplied nodes are discarded and rebuilt from the declarations. A
    /// package declaring the same dependency twice is rejected. On error the
    /// graph is left untouched.
    pub fn init(&mut self, mut nodes: Vec<Node>) -> Result<Vec<Node>> {
        let mut next = Self::new(self.policy);
        let mut implied = Vec::new();

        for node in &mut nodes {
            node.clear_parent_constraints();
            next.add_node(node.clone())?;
        }

        for node in &nodes {
            let mut declared = HashSet::new();
            for neighbor in node.neighbors() {
                let id = neighbor.identifier().to_string();
                if !declared.insert(id.clone()) {
                    return Err(Error::Build(format!(
                        "{} declares dependency {} more than once",
                        node.identifier(),
                        id
                    )));
                }
                if next.add_edge(node.identifier(), neighbor)? {
                    implied.push(id);
                }
            }
        }

        let implied = implied
            .iter()
            .filter_map(|id| next.index.get(id).map(|&i| next.nodes[i].clone()))
            .collect::<Vec<_>>();

        debug!(
            "Built dependency graph with {} nodes, {} implied",
            next.nodes.len(),
            implied.len()
        );

        *self = next;
        Ok(implied)
    }

    /// Insert a node, replacing any node with the same identifier
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        validate_identifier(node.identifier())?;

        match self.index.get(node.identifier()) {
            Some(&i) => self.nodes[i] = node,
            None => {
                self.index
                    .insert(node.identifier().to_string(), self.nodes.len());
                self.nodes.push(node);
                self.edges.push(Vec::new());
            }
        }

        Ok(())
    }

    /// Add an edge from an existing node to `to`
    ///
    /// `to` is inserted when absent; returns `true` in that case. A new edge
    /// contributes the dependency's constraint to the target's parent
    /// constraints. The first declaration of a dependency keeps its
    /// constraint as the effective one.
    pub fn add_edge(&mut self, from: &str, to: Node) -> Result<bool> {
        let from_idx = *self
            .index
            .get(from)
            .ok_or_else(|| Error::NodeNotFound(from.to_string()))?;

        validate_identifier(to.identifier())?;
        if to.identifier() == from {
            return Err(Error::CyclicDependency {
                node: from.to_string(),
                cycle: vec![from.to_string(), from.to_string()],
            });
        }

        self.nodes[from_idx].add_neighbors(std::slice::from_ref(&to))?;

        let constraint = to.constraints().unwrap_or_default().to_string();
        let (to_idx, created) = match self.index.get(to.identifier()) {
            Some(&i) => (i, false),
            None => {
                debug!("{} implies {}", from, to.identifier());
                self.add_node(to)?;
                (self.nodes.len() - 1, true)
            }
        };

        if self.edges[from_idx].contains(&to_idx) {
            return Ok(created);
        }
        self.edges[from_idx].push(to_idx);

        let target = &mut self.nodes[to_idx];
        if !target.is_installed() || self.policy == ResolutionPolicy::Updatable {
            target.add_parent_constraint(&constraint);
        }

        Ok(created)
    }

    /// Topological order of all identifiers, dependents before dependencies
    ///
    /// For every edge u → v, u precedes v. Independent nodes are ordered by
    /// identifier. Fails if the graph contains a cycle.
    pub fn sort(&self) -> Result<Vec<String>> {
        let mut order = self.post_order()?;
        order.reverse();
        Ok(order)
    }

    /// Topological order with dependencies before dependents
    pub fn install_order(&self) -> Result<Vec<String>> {
        self.post_order()
    }

    fn post_order(&self) -> Result<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut path = Vec::new();
        let mut finished = Vec::with_capacity(self.nodes.len());

        // Visit in reverse identifier order so the reversed result lists ties ascending
        let mut roots: Vec<usize> = (0..self.nodes.len()).collect();
        roots.sort_by(|&a, &b| self.id(b).cmp(self.id(a)));

        for root in roots {
            if marks[root] == Mark::Unvisited {
                self.visit(root, &mut marks, &mut path, &mut finished)?;
            }
        }

        Ok(finished.into_iter().map(|i| self.id(i).to_string()).collect())
    }

    fn visit(
        &self,
        idx: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        finished: &mut Vec<usize>,
    ) -> Result<()> {
        marks[idx] = Mark::Visiting;
        path.push(idx);

        let mut neighbors = self.edges[idx].clone();
        neighbors.sort_by(|&a, &b| self.id(b).cmp(self.id(a)));

        for next in neighbors {
            match marks[next] {
                Mark::Unvisited => self.visit(next, marks, path, finished)?,
                Mark::Visiting => {
                    let start = path.iter().position(|&i| i == next).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|&i| self.id(i).to_string()).collect();
                    cycle.push(self.id(next).to_string());
                    warn!("Detected dependency cycle: {}", cycle.join(" -> "));
                    return Err(Error::CyclicDependency {
                        node: self.id(next).to_string(),
                        cycle,
                    });
                }
                Mark::Visited => {}
            }
        }

        path.pop();
        marks[idx] = Mark::Visited;
        finished.push(idx);
        Ok(())
    }

    /// Get a node by identifier
    pub fn get_node(&self, identifier: &str) -> Result<&Node> {
        self.index
            .get(identifier)
            .map(|&i| &self.nodes[i])
            .ok_or_else(|| Error::NodeNotFound(identifier.to_string()))
    }

    pub fn node_exists(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// Direct dependencies of a node, in the order the edges were added
    pub fn node_neighbors(&self, identifier: &str) -> Result<Vec<Node>> {
        let idx = self.idx(identifier)?;
        Ok(self.edges[idx]
            .iter()
            .map(|&i| self.nodes[i].clone())
            .collect())
    }

    /// Identifiers of nodes with an edge to this node
    pub fn dependents(&self, identifier: &str) -> Result<Vec<String>> {
        let idx = self.idx(identifier)?;
        Ok(self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, out)| out.contains(&idx))
            .map(|(i, _)| self.id(i).to_string())
            .collect())
    }

    /// Every node reachable from `identifier`, keyed by identifier
    ///
    /// The starting node itself is not included.
    pub fn trace_node(&self, identifier: &str) -> Result<BTreeMap<String, Node>> {
        let start = self.idx(identifier)?;
        let mut tree = BTreeMap::new();
        let mut seen = HashSet::from([start]);
        let mut stack = self.edges[start].clone();

        while let Some(i) = stack.pop() {
            if !seen.insert(i) {
                continue;
            }
            tree.insert(self.id(i).to_string(), self.nodes[i].clone());
            stack.extend(self.edges[i].iter().copied());
        }

        Ok(tree)
    }

    /// A dependency view of any node, suitable for version resolution
    ///
    /// Installed packages take their first parent constraint as the effective
    /// constraint.
    pub fn dependency_for(&self, identifier: &str) -> Result<Dependency> {
        match self.get_node(identifier)? {
            Node::Dependency(dep) => Ok(dep.clone()),
            Node::Installed(pkg) => Ok(Dependency {
                package: pkg.source.clone(),
                package_type: Some(pkg.package_type),
                constraints: pkg.parent_constraints.first().cloned().unwrap_or_default(),
                parent_constraints: pkg.parent_constraints.clone(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    fn idx(&self, identifier: &str) -> Result<usize> {
        self.index
            .get(identifier)
            .copied()
            .ok_or_else(|| Error::NodeNotFound(identifier.to_string()))
    }

    fn id(&self, idx: usize) -> &str {
        self.nodes[idx].identifier()
    }
}

fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(Error::Build("empty package identifier".to_string()));
    }
    if identifier.chars().any(char::is_whitespace) {
        return Err(Error::Build(format!(
            "package identifier '{}' contains whitespace",
            identifier
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::{LockPackage, PackageType};

    fn installed(source: &str, deps: &[(&str, &str)]) -> Node {
        let mut pkg = LockPackage::new(source, PackageType::Provider, source, "v1.0.0");
        for (id, constraint) in deps {
            pkg = pkg.with_dependency(Dependency::new(*id, *constraint));
        }
        Node::from(pkg)
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|o| o == id).unwrap()
    }

    #[test]
    fn test_init_reports_implied_nodes_in_order() {
        let mut graph = DependencyGraph::default();
        let implied = graph
            .init(vec![
                installed("a", &[("c", ">=1.0.0"), ("b", "*")]),
                installed("b", &[("d", "^2.0")]),
            ])
            .unwrap();

        let ids: Vec<&str> = implied.iter().map(|n| n.identifier()).collect();
        assert_eq!(ids, vec!["c", "d"]);
        assert_eq!(graph.len(), 4);
        assert!(graph.get_node("b").unwrap().is_installed());
    }

    #[test]
    fn test_init_merges_shared_dependency() {
        let mut graph = DependencyGraph::default();
        let implied = graph
            .init(vec![
                installed("a", &[("lib", ">=1.0.0")]),
                installed("b", &[("lib", "1.0.0")]),
            ])
            .unwrap();

        assert_eq!(implied.len(), 1);
        assert_eq!(implied[0].constraints(), Some(">=1.0.0"));
        assert_eq!(implied[0].parent_constraints(), [">=1.0.0", "1.0.0"]);
    }

    #[test]
    fn test_init_resets_graph() {
        let mut graph = DependencyGraph::default();
        graph.init(vec![installed("a", &[("b", "*")])]).unwrap();
        graph.init(vec![installed("x", &[])]).unwrap();

        assert_eq!(graph.len(), 1);
        assert!(!graph.node_exists("a"));
    }

    #[test]
    fn test_failed_init_leaves_graph_untouched() {
        let mut graph = DependencyGraph::default();
        graph.init(vec![installed("a", &[("b", "*")])]).unwrap();

        let err = graph
            .init(vec![installed("x", &[("bad id", "*")])])
            .unwrap_err();
        assert!(matches!(err, Error::Build(_)));
        assert!(graph.node_exists("a"));
        assert!(graph.node_exists("b"));
        assert!(!graph.node_exists("x"));
    }

    #[test]
    fn test_init_rejects_duplicate_declaration() {
        let mut graph = DependencyGraph::default();
        graph.init(vec![installed("a", &[("b", "*")])]).unwrap();

        let err = graph
            .init(vec![installed("x", &[("lib", ">=1.0.0"), ("lib", "<1.0.0")])])
            .unwrap_err();

        match err {
            Error::Build(msg) => {
                assert!(msg.contains("x"));
                assert!(msg.contains("lib"));
            }
            other => panic!("expected build error, got {other}"),
        }
        assert!(graph.node_exists("a"));
        assert!(!graph.node_exists("x"));
        assert!(!graph.node_exists("lib"));
    }

    #[test]
    fn test_init_discards_stale_parent_constraints() {
        let mut lib = LockPackage::new("lib", PackageType::Provider, "lib", "v1.2.0");
        lib.parent_constraints.push("<1.0.0".to_string());
        let mut dep = Dependency::new("fn", ">=2.0.0");
        dep.add_parent_constraints(["0.0.1"]);
        let a = LockPackage::new("a", PackageType::Provider, "a", "v1.0.0")
            .with_dependency(Dependency::new("lib", ">=1.0.0"))
            .with_dependency(dep);

        let mut graph = DependencyGraph::new(ResolutionPolicy::Updatable);
        let implied = graph.init(vec![Node::from(a), Node::from(lib)]).unwrap();

        assert_eq!(graph.get_node("lib").unwrap().parent_constraints(), [">=1.0.0"]);
        assert_eq!(implied[0].parent_constraints(), [">=2.0.0"]);
    }

    #[test]
    fn test_default_policy_skips_installed_parent_constraints() {
        let mut graph = DependencyGraph::new(ResolutionPolicy::Default);
        graph
            .init(vec![installed("a", &[("b", ">=1.0.0")]), installed("b", &[])])
            .unwrap();
        assert!(graph.get_node("b").unwrap().parent_constraints().is_empty());

        let mut graph = DependencyGraph::new(ResolutionPolicy::Updatable);
        graph
            .init(vec![installed("a", &[("b", ">=1.0.0")]), installed("b", &[])])
            .unwrap();
        assert_eq!(graph.get_node("b").unwrap().parent_constraints(), [">=1.0.0"]);
    }

    #[test]
    fn test_add_node_replaces() {
        let mut graph = DependencyGraph::default();
        graph.add_node(Node::from(Dependency::new("a", "1.0.0"))).unwrap();
        graph.add_node(Node::from(Dependency::new("a", "2.0.0"))).unwrap();

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get_node("a").unwrap().constraints(), Some("2.0.0"));
    }

    #[test]
    fn test_add_node_rejects_empty_identifier() {
        let mut graph = DependencyGraph::default();
        let err = graph.add_node(Node::from(Dependency::new("", "*"))).unwrap_err();
        assert!(matches!(err, Error::Build(_)));
    }

    #[test]
    fn test_add_edge_missing_source() {
        let mut graph = DependencyGraph::default();
        let err = graph
            .add_edge("nope", Node::from(Dependency::new("b", "*")))
            .unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(ref id) if id == "nope"));
    }

    #[test]
    fn test_add_edge_self_loop() {
        let mut graph = DependencyGraph::default();
        graph.add_node(installed("a", &[])).unwrap();
        let err = graph
            .add_edge("a", Node::from(Dependency::new("a", "*")))
            .unwrap_err();
        assert!(matches!(err, Error::CyclicDependency { .. }));
    }

    #[test]
    fn test_add_edge_rejects_installed_target() {
        let mut graph = DependencyGraph::default();
        graph.add_node(installed("a", &[])).unwrap();
        let err = graph.add_edge("a", installed("b", &[])).unwrap_err();
        assert!(matches!(err, Error::Build(_)));
        assert!(!graph.node_exists("b"));
    }

    #[test]
    fn test_duplicate_edge_not_counted_twice() {
        let mut graph = DependencyGraph::default();
        graph.add_node(installed("a", &[])).unwrap();
        assert!(graph.add_edge("a", Node::from(Dependency::new("b", "1.0.0"))).unwrap());
        assert!(!graph.add_edge("a", Node::from(Dependency::new("b", "1.0.0"))).unwrap());

        assert_eq!(graph.node_neighbors("a").unwrap().len(), 1);
        assert_eq!(graph.get_node("b").unwrap().parent_constraints(), ["1.0.0"]);
    }

    #[test]
    fn test_sort_respects_edges() {
        let mut graph = DependencyGraph::default();
        graph
            .init(vec![
                installed("app", &[("db", "*"), ("web", "*")]),
                installed("web", &[("tls", "*")]),
                installed("db", &[("tls", "*")]),
            ])
            .unwrap();

        let order = graph.sort().unwrap();
        assert_eq!(order.len(), 4);
        assert!(position(&order, "app") < position(&order, "web"));
        assert!(position(&order, "app") < position(&order, "db"));
        assert!(position(&order, "web") < position(&order, "tls"));
        assert!(position(&order, "db") < position(&order, "tls"));
    }

    #[test]
    fn test_sort_is_deterministic_and_pure() {
        let mut graph = DependencyGraph::default();
        graph
            .init(vec![installed("c", &[]), installed("a", &[]), installed("b", &[])])
            .unwrap();

        let first = graph.sort().unwrap();
        let second = graph.sort().unwrap();
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, second);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_install_order_is_reverse_of_sort() {
        let mut graph = DependencyGraph::default();
        graph
            .init(vec![installed("a", &[("b", "*")]), installed("b", &[("c", "*")])])
            .unwrap();

        assert_eq!(graph.sort().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(graph.install_order().unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_detects_cycle() {
        let mut graph = DependencyGraph::default();
        graph
            .init(vec![
                installed("a", &[("b", "*")]),
                installed("b", &[("c", "*")]),
                installed("c", &[("a", "*")]),
            ])
            .unwrap();

        match graph.sort().unwrap_err() {
            Error::CyclicDependency { node, cycle } => {
                assert!(["a", "b", "c"].contains(&node.as_str()));
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 4);
            }
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn test_get_node_not_found() {
        let graph = DependencyGraph::default();
        assert!(matches!(graph.get_node("x"), Err(Error::NodeNotFound(_))));
        assert!(matches!(graph.node_neighbors("x"), Err(Error::NodeNotFound(_))));
    }

    #[test]
    fn test_dependents() {
        let mut graph = DependencyGraph::default();
        graph
            .init(vec![installed("a", &[("lib", "*")]), installed("b", &[("lib", "*")])])
            .unwrap();
        assert_eq!(graph.dependents("lib").unwrap(), vec!["a", "b"]);
        assert!(graph.dependents("a").unwrap().is_empty());
    }

    #[test]
    fn test_trace_node() {
        let mut graph = DependencyGraph::default();
        graph
            .init(vec![
                installed("a", &[("b", "*")]),
                installed("b", &[("c", "*"), ("d", "*")]),
                installed("x", &[("y", "*")]),
            ])
            .unwrap();

        let tree = graph.trace_node("a").unwrap();
        let ids: Vec<&String> = tree.keys().collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
        assert!(graph.trace_node("c").unwrap().is_empty());
        assert!(graph.trace_node("missing").is_err());
    }

    #[test]
    fn test_dependency_for_installed_node() {
        let mut graph = DependencyGraph::new(ResolutionPolicy::Updatable);
        graph
            .init(vec![
                installed("a", &[("lib", ">=1.0.0")]),
                installed("b", &[("lib", "<2.0.0")]),
                installed("lib", &[]),
            ])
            .unwrap();

        let dep = graph.dependency_for("lib").unwrap();
        assert_eq!(dep.package, "lib");
        assert_eq!(dep.package_type, Some(PackageType::Provider));
        assert_eq!(dep.constraints, ">=1.0.0");
        assert_eq!(dep.parent_constraints, vec![">=1.0.0", "<2.0.0"]);
    }
}
