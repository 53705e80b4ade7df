// tripletrust-data/src/samplers/graph.rs

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::info;
use tripletrust_core::TripletRustError;

/// Precomputed pairwise similarity graph over sample ids.
///
/// Used by the graph-based hard negative strategy: the neighbours of an
/// anchor with the highest weights are the samples most easily confused with
/// it. Each neighbour list is sorted by descending weight (ties by ascending
/// id), so the strongest candidates are a prefix of the list.
#[derive(Debug, Clone, Default)]
pub struct SimilarityGraph {
    neighbors: HashMap<usize, Vec<(usize, f32)>>,
    num_edges: usize,
}

impl SimilarityGraph {
    /// Builds an undirected graph from `(a, b, weight)` edges.
    ///
    /// Self loops are ignored. A repeated edge keeps the last weight seen.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f32)>,
    {
        let mut weights: HashMap<(usize, usize), f32> = HashMap::new();
        for (a, b, w) in edges {
            if a == b {
                continue;
            }
            let key = if a < b { (a, b) } else { (b, a) };
            weights.insert(key, w);
        }

        let mut neighbors: HashMap<usize, Vec<(usize, f32)>> = HashMap::new();
        for (&(a, b), &w) in &weights {
            neighbors.entry(a).or_default().push((b, w));
            neighbors.entry(b).or_default().push((a, w));
        }
        for list in neighbors.values_mut() {
            list.sort_by(|x, y| y.1.total_cmp(&x.1).then(x.0.cmp(&y.0)));
        }

        SimilarityGraph {
            neighbors,
            num_edges: weights.len(),
        }
    }

    /// Parses a text edge list: one `a b weight` triple per line, separated by
    /// whitespace or commas. Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, TripletRustError> {
        let mut edges = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|f| !f.is_empty())
                .collect();
            if fields.len() != 3 {
                return Err(TripletRustError::DataSource(format!(
                    "similarity graph line {}: expected 'a b weight', got {:?}",
                    line_no + 1,
                    line
                )));
            }
            let bad = |what: &str| {
                TripletRustError::DataSource(format!(
                    "similarity graph line {}: invalid {} in {:?}",
                    line_no + 1,
                    what,
                    line
                ))
            };
            let a = fields[0].parse::<usize>().map_err(|_| bad("node id"))?;
            let b = fields[1].parse::<usize>().map_err(|_| bad("node id"))?;
            let w = fields[2].parse::<f32>().map_err(|_| bad("weight"))?;
            if !w.is_finite() {
                return Err(bad("weight"));
            }
            edges.push((a, b, w));
        }
        Ok(Self::from_edges(edges))
    }

    /// Loads a graph from an edge list file (see [`SimilarityGraph::parse`]).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TripletRustError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| TripletRustError::io(path, e))?;
        let graph = Self::parse(&text)?;
        info!(
            "Loaded similarity graph from {}: {} nodes, {} edges",
            path.display(),
            graph.num_nodes(),
            graph.num_edges()
        );
        Ok(graph)
    }

    /// Neighbours of `id` by descending weight; empty if `id` has none.
    pub fn neighbors(&self, id: usize) -> &[(usize, f32)] {
        self.neighbors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Weight of the edge between `a` and `b`, if present.
    pub fn weight(&self, a: usize, b: usize) -> Option<f32> {
        self.neighbors(a)
            .iter()
            .find(|(id, _)| *id == b)
            .map(|(_, w)| *w)
    }

    /// Largest node id appearing in any edge.
    pub fn max_node(&self) -> Option<usize> {
        self.neighbors.keys().copied().max()
    }

    /// Number of nodes with at least one edge.
    pub fn num_nodes(&self) -> usize {
        self.neighbors.len()
    }

    /// Number of undirected edges.
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edges_is_undirected_and_sorted() {
        let graph = SimilarityGraph::from_edges(vec![(0, 1, 0.2), (2, 0, 0.9), (0, 3, 0.5), (1, 1, 1.0)]);
        assert_eq!(graph.num_edges(), 3);
        assert_eq!(
            graph.neighbors(0).to_vec(),
            vec![(2usize, 0.9f32), (3, 0.5), (1, 0.2)]
        );
        assert_eq!(graph.neighbors(2).to_vec(), vec![(0usize, 0.9f32)]);
        assert_eq!(graph.weight(3, 0), Some(0.5));
        assert_eq!(graph.weight(1, 1), None);
        assert!(graph.neighbors(42).is_empty());
        assert_eq!(graph.max_node(), Some(3));
    }

    #[test]
    fn test_parse_edge_list() {
        let text = "# a b w\n0 1 0.5\n\n1,2,0.25\n";
        let graph = SimilarityGraph::parse(text).unwrap();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.weight(2, 1), Some(0.25));
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert!(matches!(
            SimilarityGraph::parse("0 1"),
            Err(TripletRustError::DataSource(_))
        ));
        assert!(matches!(
            SimilarityGraph::parse("0 x 0.1"),
            Err(TripletRustError::DataSource(_))
        ));
        assert!(matches!(
            SimilarityGraph::parse("0 1 NaN"),
            Err(TripletRustError::DataSource(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SimilarityGraph::load("/nonexistent/graph.txt").unwrap_err();
        assert!(matches!(err, TripletRustError::Io { .. }));
    }
}
