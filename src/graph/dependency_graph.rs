// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Newtype wrapper for the stack dependency graph.
///
/// Stored as forward adjacency: each stack maps to the stacks that depend on
/// it. Every declared stack has an entry, even when nothing depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph(pub BTreeMap<String, BTreeSet<String>>);

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Register a stack with no edges yet.
    pub fn add_stack(&mut self, stack: impl Into<String>) {
        self.0.entry(stack.into()).or_default();
    }

    /// Record that `dependent` must be provisioned after `dependency`.
    pub fn add_edge(&mut self, dependency: impl Into<String>, dependent: impl Into<String>) {
        let dependent = dependent.into();
        self.add_stack(dependent.clone());
        self.0.entry(dependency.into()).or_default().insert(dependent);
    }

    pub fn has_edge(&self, dependency: &str, dependent: &str) -> bool {
        self.0
            .get(dependency)
            .is_some_and(|dependents| dependents.contains(dependent))
    }

    /// Direct dependents of a stack, in lexical order.
    pub fn dependents(&self, stack: &str) -> impl Iterator<Item = &str> + '_ {
        self.0
            .get(stack)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Get all stack names in the graph
    pub fn stacks(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of direct dependencies of every stack.
    pub fn in_degrees(&self) -> BTreeMap<&str, usize> {
        let mut degrees: BTreeMap<&str, usize> = self.0.keys().map(|k| (k.as_str(), 0)).collect();
        for dependent in self.0.values().flatten() {
            *degrees.entry(dependent.as_str()).or_insert(0) += 1;
        }
        degrees
    }

    /// Build reverse adjacency: stack -> stacks it depends on.
    pub fn build_reverse_dependencies(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut reverse: BTreeMap<String, BTreeSet<String>> =
            self.0.keys().map(|k| (k.clone(), BTreeSet::new())).collect();
        for (dependency, dependents) in &self.0 {
            for dependent in dependents {
                reverse
                    .entry(dependent.clone())
                    .or_default()
                    .insert(dependency.clone());
            }
        }
        reverse
    }

    /// Every stack reachable from `stack` through dependent edges, excluding `stack` itself.
    pub fn transitive_dependents(&self, stack: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut frontier: Vec<&str> = self.dependents(stack).collect();
        while let Some(next) = frontier.pop() {
            if next != stack && found.insert(next.to_string()) {
                frontier.extend(self.dependents(next));
            }
        }
        found
    }

    /// Kahn's algorithm with a lexically ordered ready set.
    ///
    /// On success every stack appears after all of its dependencies, and the
    /// same graph always yields the same order. On failure returns each cycle
    /// found among the stacks that could not be ordered; stacks that are merely
    /// downstream of a cycle are not included.
    pub fn topological_order(&self) -> Result<Vec<String>, Vec<Vec<String>>> {
        let mut in_degree = self.in_degrees();
        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(stack, _)| *stack)
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(stack) = ready.pop_first() {
            order.push(stack.to_string());
            for dependent in self.dependents(stack) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() == in_degree.len() {
            return Ok(order);
        }

        let remaining: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(stack, _)| *stack)
            .collect();
        Err(self.cycles_within(&remaining))
    }

    /// Strongly connected components of the subgraph induced by `within` that
    /// contain a cycle. Each component is sorted; components are sorted by
    /// their first member.
    fn cycles_within<'a>(&'a self, within: &BTreeSet<&'a str>) -> Vec<Vec<String>> {
        let mut tarjan = Tarjan::new(self, within);
        for &stack in within {
            if !tarjan.indices.contains_key(stack) {
                tarjan.connect(stack);
            }
        }
        let mut cycles = tarjan.components;
        cycles.sort();
        cycles
    }
}

/// Tarjan's strongly connected components over a subset of the graph.
struct Tarjan<'a, 'w> {
    graph: &'a DependencyGraph,
    within: &'w BTreeSet<&'a str>,
    next_index: usize,
    indices: BTreeMap<&'a str, usize>,
    lowlinks: BTreeMap<&'a str, usize>,
    stack: Vec<&'a str>,
    on_stack: BTreeSet<&'a str>,
    components: Vec<Vec<String>>,
}

impl<'a, 'w> Tarjan<'a, 'w> {
    fn new(graph: &'a DependencyGraph, within: &'w BTreeSet<&'a str>) -> Self {
        Self {
            graph,
            within,
            next_index: 0,
            indices: BTreeMap::new(),
            lowlinks: BTreeMap::new(),
            stack: Vec::new(),
            on_stack: BTreeSet::new(),
            components: Vec::new(),
        }
    }

    fn connect(&mut self, v: &'a str) {
        self.indices.insert(v, self.next_index);
        self.lowlinks.insert(v, self.next_index);
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack.insert(v);

        let graph = self.graph;
        let neighbours: Vec<&'a str> = graph
            .dependents(v)
            .filter(|w| self.within.contains(w))
            .collect();

        for w in neighbours {
            if !self.indices.contains_key(&w) {
                self.connect(w);
                let low = self.lowlinks[&v].min(self.lowlinks[&w]);
                self.lowlinks.insert(v, low);
            } else if self.on_stack.contains(&w) {
                let low = self.lowlinks[&v].min(self.indices[&w]);
                self.lowlinks.insert(v, low);
            }
        }

        if self.lowlinks[&v] == self.indices[&v] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack.remove(&w);
                component.push(w.to_string());
                if w == v {
                    break;
                }
            }
            if component.len() > 1 || self.graph.has_edge(v, v) {
                component.sort();
                self.components.push(component);
            }
        }
    }
}

impl From<BTreeMap<String, BTreeSet<String>>> for DependencyGraph {
    fn from(graph: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self(graph)
    }
}
