// src/components.rs - 8-connected component labeling

use log::debug;

use crate::mask2d::Mask2D;

/// Arena of component records joined by an index-based union-find.
///
/// Each record owns the items assigned to it; merging moves the items of
/// the absorbed root into the surviving root.
#[derive(Debug)]
pub(crate) struct ComponentArena<T> {
    parent: Vec<usize>,
    rank: Vec<u8>,
    items: Vec<Vec<T>>,
}

impl<T> ComponentArena<T> {
    pub(crate) fn new() -> Self {
        Self {
            parent: Vec::new(),
            rank: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Create a new singleton record and return its label
    pub(crate) fn make(&mut self) -> usize {
        let label = self.parent.len();
        self.parent.push(label);
        self.rank.push(0);
        self.items.push(Vec::new());
        label
    }

    /// Root of `label`, compressing the path on the way
    pub(crate) fn find(&mut self, label: usize) -> usize {
        let mut root = label;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = label;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Join the sets of `a` and `b`; returns the surviving root
    pub(crate) fn union(&mut self, a: usize, b: usize) -> usize {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return ra;
        }

        let (root, child) = match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => (rb, ra),
            std::cmp::Ordering::Greater => (ra, rb),
            std::cmp::Ordering::Equal => {
                self.rank[ra] += 1;
                (ra, rb)
            }
        };

        self.parent[child] = root;
        let moved = std::mem::take(&mut self.items[child]);
        self.items[root].extend(moved);
        root
    }

    pub(crate) fn push(&mut self, label: usize, item: T) {
        let root = self.find(label);
        self.items[root].push(item);
    }

    pub(crate) fn len(&self) -> usize {
        self.parent.len()
    }

    /// Item sets of every root, ordered by root label
    pub(crate) fn into_groups(mut self) -> Vec<Vec<T>> {
        let mut groups = Vec::new();
        for label in 0..self.parent.len() {
            if self.find(label) == label && !self.items[label].is_empty() {
                groups.push(std::mem::take(&mut self.items[label]));
            }
        }
        groups
    }
}

impl Mask2D {
    /// Split the mask into maximal 8-connected groups of set cells.
    ///
    /// Scanline labeling with a two-row cache: each set cell looks at its
    /// left, top-left, top and top-right neighbours. Every returned mask has
    /// tight bounds; together they partition the set cells of `self`.
    pub fn components(&self) -> Vec<Mask2D> {
        let b = self.bounds;
        if b.is_empty() {
            return Vec::new();
        }

        let width = b.width as usize;
        let mut arena = ComponentArena::new();
        let mut prev_row: Vec<Option<usize>> = vec![None; width];
        let mut cur_row: Vec<Option<usize>> = vec![None; width];

        for (row_index, row) in self.cells.chunks_exact(width).enumerate() {
            let y = b.y + row_index as i32;

            for (lx, &set) in row.iter().enumerate() {
                if !set {
                    cur_row[lx] = None;
                    continue;
                }

                let left = if lx > 0 { cur_row[lx - 1] } else { None };
                let top_left = if lx > 0 { prev_row[lx - 1] } else { None };
                let top = prev_row[lx];
                let top_right = if lx + 1 < width { prev_row[lx + 1] } else { None };

                let mut label = None;
                for neighbour in [left, top_left, top, top_right].into_iter().flatten() {
                    label = Some(match label {
                        None => neighbour,
                        Some(existing) => arena.union(existing, neighbour),
                    });
                }

                let label = label.unwrap_or_else(|| arena.make());
                arena.push(label, (b.x + lx as i32, y));
                cur_row[lx] = Some(label);
            }

            std::mem::swap(&mut prev_row, &mut cur_row);
        }

        let created = arena.len();
        let mut groups = arena.into_groups();
        for points in groups.iter_mut() {
            points.sort_unstable_by_key(|&(x, y)| (y, x));
        }
        groups.sort_by_key(|points| points.first().map(|&(x, y)| (y, x)));

        let components: Vec<Mask2D> = groups.iter().map(|points| Mask2D::from_points(points)).collect();

        debug!("Labeled {} component(s) from {} provisional label(s)", components.len(), created);
        components
    }

    /// One-step 3x3 dilation; bounds grow by one cell on each side
    pub fn dilate(&self) -> Mask2D {
        crate::morphology::dilate_square(self, 1)
    }
}
