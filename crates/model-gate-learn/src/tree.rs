//! Regression trees grown leaf-wise on gradient statistics
//!
//! Trees are stored as a flat arena of [`Node`]s with the root at index 0.
//! A row goes left when its feature value is `<= threshold`; missing values
//! (NaN) fail the comparison and always go right.

use serde::{Deserialize, Serialize};

/// One node of a tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        gain: f64,
    },
    Leaf {
        value: f64,
    },
}

/// Fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Tree with a single leaf
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    /// Output for one row
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Number of edges on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Multiply every leaf value by `factor`
    pub fn scale(&mut self, factor: f64) {
        for node in &mut self.nodes {
            if let Node::Leaf { value } = node {
                *value *= factor;
            }
        }
    }
}

/// Constraints on tree growth
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthConfig {
    pub num_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    pub min_child_weight: f64,
    pub min_split_gain: f64,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
}

impl GrowthConfig {
    /// L1 soft-thresholding of a gradient sum
    fn threshold_l1(&self, g: f64) -> f64 {
        if g > self.reg_alpha {
            g - self.reg_alpha
        } else if g < -self.reg_alpha {
            g + self.reg_alpha
        } else {
            0.0
        }
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let t = self.threshold_l1(g);
        let denom = h + self.reg_lambda;
        if denom <= 0.0 {
            0.0
        } else {
            t * t / denom
        }
    }

    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.reg_lambda;
        if denom <= 0.0 {
            0.0
        } else {
            -self.threshold_l1(g) / denom
        }
    }

    fn child_allowed(&self, count: usize, hess: f64) -> bool {
        count >= self.min_child_samples && hess >= self.min_child_weight
    }
}

/// Best split found for a leaf
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Leaf that may still be split
struct OpenLeaf {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    split: Option<SplitCandidate>,
}

/// Borrowed training inputs for one tree
pub struct GradientView<'a> {
    pub rows: &'a [Vec<f64>],
    pub gradients: &'a [f64],
    pub hessians: &'a [f64],
}

impl GradientView<'_> {
    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(g, h), &i| {
            (g + self.gradients[i], h + self.hessians[i])
        })
    }
}

/// Grow a tree best-first over `sample` rows, splitting only on `features`
pub fn grow_tree(
    data: &GradientView<'_>,
    sample: &[usize],
    features: &[usize],
    config: &GrowthConfig,
) -> Tree {
    let (g, h) = data.sums(sample);
    let mut nodes = vec![Node::Leaf {
        value: config.leaf_value(g, h),
    }];

    let mut open = vec![OpenLeaf {
        node: 0,
        rows: sample.to_vec(),
        depth: 0,
        split: find_split(data, sample, 0, features, config),
    }];
    let mut n_leaves = 1;

    while n_leaves < config.num_leaves {
        let best = open
            .iter()
            .enumerate()
            .filter_map(|(i, leaf)| leaf.split.map(|s| (i, s.gain)))
            .fold(None, |best: Option<(usize, f64)>, (i, gain)| match best {
                Some((_, best_gain)) if best_gain >= gain => best,
                _ => Some((i, gain)),
            });
        let Some((position, _)) = best else {
            break;
        };

        let leaf = open.swap_remove(position);
        let Some(split) = leaf.split else {
            break;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = leaf
            .rows
            .iter()
            .partition(|&&i| data.rows[i][split.feature] <= split.threshold);

        let left = nodes.len();
        let right = left + 1;
        for rows in [&left_rows, &right_rows] {
            let (g, h) = data.sums(rows);
            nodes.push(Node::Leaf {
                value: config.leaf_value(g, h),
            });
        }
        nodes[leaf.node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            gain: split.gain,
        };
        n_leaves += 1;

        let depth = leaf.depth + 1;
        for (node, rows) in [(left, left_rows), (right, right_rows)] {
            let split = find_split(data, &rows, depth, features, config);
            open.push(OpenLeaf {
                node,
                rows,
                depth,
                split,
            });
        }
    }

    Tree { nodes }
}

fn find_split(
    data: &GradientView<'_>,
    rows: &[usize],
    depth: usize,
    features: &[usize],
    config: &GrowthConfig,
) -> Option<SplitCandidate> {
    if config.max_depth.is_some_and(|max| depth >= max) {
        return None;
    }
    if rows.len() < 2 * config.min_child_samples {
        return None;
    }

    let (g_total, h_total) = data.sums(rows);
    let parent_score = config.score(g_total, h_total);
    let mut best: Option<SplitCandidate> = None;

    let mut present: Vec<(f64, f64, f64)> = Vec::with_capacity(rows.len());
    for &feature in features {
        present.clear();
        present.extend(rows.iter().filter_map(|&i| {
            let value = data.rows[i][feature];
            (!value.is_nan()).then(|| (value, data.gradients[i], data.hessians[i]))
        }));
        if present.len() < 2 {
            continue;
        }
        present.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (mut g_left, mut h_left) = (0.0, 0.0);
        for k in 0..present.len() - 1 {
            let (value, g, h) = present[k];
            g_left += g;
            h_left += h;

            let next = present[k + 1].0;
            if next <= value {
                continue;
            }
            let n_left = k + 1;
            let n_right = rows.len() - n_left;
            let (g_right, h_right) = (g_total - g_left, h_total - h_left);
            if !config.child_allowed(n_left, h_left) || !config.child_allowed(n_right, h_right) {
                continue;
            }

            let gain =
                config.score(g_left, h_left) + config.score(g_right, h_right) - parent_score;
            if gain <= config.min_split_gain || gain <= 0.0 {
                continue;
            }
            if best.map_or(true, |b| gain > b.gain) {
                let mid = value + (next - value) / 2.0;
                best = Some(SplitCandidate {
                    feature,
                    threshold: if mid < next { mid } else { value },
                    gain,
                });
            }
        }
    }

    best
}
