//! Strongly connected components (two-pass Kosaraju, iterative).
//!
//! Both passes keep an explicit stack of `(node, next neighbor index)` frames,
//! so deep graphs never grow the call stack.

/// Directed graph over dense node indices `0..node_count`.
#[derive(Debug, Clone, Default)]
pub struct IndexGraph {
    forward: Vec<Vec<usize>>,
    reverse: Vec<Vec<usize>>,
}

impl IndexGraph {
    pub fn new(node_count: usize) -> Self {
        Self {
            forward: vec![Vec::new(); node_count],
            reverse: vec![Vec::new(); node_count],
        }
    }

    pub fn node_count(&self) -> usize {
        self.forward.len()
    }

    /// Add an edge. Out-of-range endpoints are ignored.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        if from < self.forward.len() && to < self.forward.len() {
            self.forward[from].push(to);
            self.reverse[to].push(from);
        }
    }

    /// Components in discovery order of the second pass; each component lists
    /// its members in visit order.
    pub fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.node_count();
        let mut visited = vec![false; n];
        let mut finish_order = Vec::with_capacity(n);

        for start in 0..n {
            if !visited[start] {
                depth_first(&self.forward, start, &mut visited, &mut finish_order);
            }
        }

        let mut assigned = vec![false; n];
        let mut components = Vec::new();
        while let Some(node) = finish_order.pop() {
            if assigned[node] {
                continue;
            }
            let mut component = Vec::new();
            depth_first(&self.reverse, node, &mut assigned, &mut component);
            components.push(component);
        }
        components
    }
}

/// Iterative DFS from `start`, appending nodes to `finished` in post-order.
fn depth_first(adjacency: &[Vec<usize>], start: usize, visited: &mut [bool], finished: &mut Vec<usize>) {
    let mut stack = vec![(start, 0usize)];
    visited[start] = true;

    while let Some(frame) = stack.last_mut() {
        let (node, index) = *frame;
        match adjacency[node].get(index) {
            Some(&next) => {
                frame.1 += 1;
                if !visited[next] {
                    visited[next] = true;
                    stack.push((next, 0));
                }
            }
            None => {
                stack.pop();
                finished.push(node);
            }
        }
    }
}
