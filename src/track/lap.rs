use std::collections::HashMap;

use pathfinding::{matrix::Matrix, prelude::kuhn_munkres_min};

const SCALE_FACTOR: f64 = 1_000.0;
// Scaled costs are clamped here so that sums over a sub-problem stay within i64
const MAX_SCALED_COST: i64 = 1 << 48;

/// One admissible assignment of a source (row) to a target (column)
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub row: usize,
    pub col: usize,
    pub cost: f64,
}

/// Solves a linear assignment problem where every row may also stay unassigned
/// at its own alternative cost.
///
/// Only the listed candidates are admissible. The problem is split into independent
/// sub-problems (connected components of the candidate graph) and each one is solved
/// with the Hungarian algorithm (Kuhn-Munkres) on a padded cost matrix: one dummy
/// column per row, usable by that row only.
///
/// Returns the chosen `(row, col)` pairs.
pub fn solve_sparse(
    n_rows: usize,
    n_cols: usize,
    candidates: &[Candidate],
    alternative_costs: &[f64],
) -> Vec<(usize, usize)> {
    if n_rows == 0 || n_cols == 0 || candidates.is_empty() {
        return Vec::new();
    }
    // Rows are nodes [0, n_rows), columns are nodes [n_rows, n_rows + n_cols)
    let mut components = DisjointSet::new(n_rows + n_cols);
    for c in candidates {
        components.union(c.row, n_rows + c.col);
    }
    let mut groups: HashMap<usize, Vec<&Candidate>> = HashMap::new();
    for c in candidates {
        groups.entry(components.find(c.row)).or_default().push(c);
    }
    let mut roots: Vec<usize> = groups.keys().copied().collect();
    roots.sort_unstable();

    let mut assignments = Vec::new();
    for root in roots {
        let group = &groups[&root];
        assignments.extend(solve_dense(group, alternative_costs));
    }
    assignments.sort_unstable();
    assignments
}

fn solve_dense(candidates: &[&Candidate], alternative_costs: &[f64]) -> Vec<(usize, usize)> {
    // Local indexing of the rows and columns of this component
    let mut rows: Vec<usize> = candidates.iter().map(|c| c.row).collect();
    rows.sort_unstable();
    rows.dedup();
    let mut cols: Vec<usize> = candidates.iter().map(|c| c.col).collect();
    cols.sort_unstable();
    cols.dedup();
    let row_pos: HashMap<usize, usize> = rows.iter().enumerate().map(|(i, r)| (*r, i)).collect();
    let col_pos: HashMap<usize, usize> = cols.iter().enumerate().map(|(j, c)| (*c, j)).collect();

    let num_rows = rows.len();
    let num_cols = cols.len();
    let padded_cols = num_cols + num_rows;

    let alternatives: Vec<i64> = rows
        .iter()
        .map(|r| scale(alternative_costs.get(*r).copied().unwrap_or(0.0)))
        .collect();
    let max_alternative = alternatives.iter().copied().max().unwrap_or(0);
    // Anything above every alternative is never worth picking
    let blocked = max_alternative.saturating_mul(2).saturating_add(1);

    let mut cost_data = vec![blocked; num_rows * padded_cols];
    for (i, alt) in alternatives.iter().enumerate() {
        cost_data[i * padded_cols + num_cols + i] = *alt;
    }
    for c in candidates {
        let i = row_pos[&c.row];
        let j = col_pos[&c.col];
        let cost = scale(c.cost);
        let cell = &mut cost_data[i * padded_cols + j];
        if cost < *cell {
            *cell = cost;
        }
    }
    let cost_matrix = match Matrix::from_vec(num_rows, padded_cols, cost_data.clone()) {
        Ok(matrix) => matrix,
        Err(_) => return Vec::new(), // Return empty matches on error
    };
    let (_, assignments) = kuhn_munkres_min(&cost_matrix);
    assignments
        .iter()
        .enumerate()
        .filter(|&(i, &j)| j < num_cols && cost_data[i * padded_cols + j] < blocked)
        .map(|(i, &j)| (rows[i], cols[j]))
        .collect()
}

fn scale(cost: f64) -> i64 {
    if cost.is_nan() {
        return MAX_SCALED_COST;
    }
    ((cost * SCALE_FACTOR).round() as i64).clamp(0, MAX_SCALED_COST)
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        DisjointSet {
            parent: (0..n).collect(),
        }
    }
    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }
    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimal_not_greedy() {
        // Greedy would give row 0 -> col 0 (cost 1) and leave row 1 unassigned.
        let candidates = vec![
            Candidate { row: 0, col: 0, cost: 1.0 },
            Candidate { row: 0, col: 1, cost: 2.0 },
            Candidate { row: 1, col: 0, cost: 2.0 },
        ];
        let matches = solve_sparse(2, 2, &candidates, &[100.0, 100.0]);
        assert_eq!(matches, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_each_column_used_once() {
        let candidates = vec![
            Candidate { row: 0, col: 0, cost: 1.0 },
            Candidate { row: 1, col: 0, cost: 4.0 },
        ];
        let matches = solve_sparse(2, 1, &candidates, &[9.0, 9.0]);
        assert_eq!(matches, vec![(0, 0)]);
    }

    #[test]
    fn test_independent_components() {
        let candidates = vec![
            Candidate { row: 0, col: 0, cost: 1.0 },
            Candidate { row: 2, col: 3, cost: 1.0 },
            Candidate { row: 3, col: 2, cost: 1.0 },
        ];
        let matches = solve_sparse(4, 4, &candidates, &[5.0; 4]);
        assert_eq!(matches, vec![(0, 0), (2, 3), (3, 2)]);
    }

    #[test]
    fn test_huge_costs_do_not_overflow() {
        let candidates = vec![
            Candidate { row: 0, col: 0, cost: 1.0 },
            Candidate { row: 1, col: 1, cost: 1.0e30 },
        ];
        let matches = solve_sparse(2, 2, &candidates, &[f64::MAX, 1.0e40]);
        assert!(matches.contains(&(0, 0)));
    }

    #[test]
    fn test_empty_problem() {
        assert!(solve_sparse(3, 0, &[], &[1.0; 3]).is_empty());
    }
}
