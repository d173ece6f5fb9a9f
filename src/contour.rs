// src/contour.rs - Border extraction and ordered boundary tracing

use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::bounds::Bounds2D;
use crate::mask2d::Mask2D;

/// Direction vectors for Moore-Neighbor contour tracing, in scan priority order
static MOORE_NEIGHBORHOOD: [(i32, i32); 8] = [
    (1, 0),   // E
    (1, 1),   // SE
    (0, 1),   // S
    (-1, 1),  // SW
    (-1, 0),  // W
    (-1, -1), // NW
    (0, -1),  // N
    (1, -1),  // NE
];

/// Ordered run of border points
type Curve = VecDeque<(i32, i32)>;

/// Two points touch under 8-connectivity (and are not the same point)
#[inline]
pub(crate) fn is_adjacent(a: (i32, i32), b: (i32, i32)) -> bool {
    let dx = (a.0 - b.0).abs();
    let dy = (a.1 - b.1).abs();
    dx <= 1 && dy <= 1 && (dx + dy) > 0
}

impl Mask2D {
    /// Is the set cell at `(x, y)` missing one of its 4 neighbours?
    fn is_border_cell(&self, x: i32, y: i32) -> bool {
        self.contains(x, y)
            && !(self.contains(x, y - 1)
                && self.contains(x - 1, y)
                && self.contains(x + 1, y)
                && self.contains(x, y + 1))
    }

    /// Mask of border cells (same bounds as `self`).
    ///
    /// A set cell is on the border unless its top, left, right and bottom
    /// neighbours are all set. Shapes at most two cells thick are all border.
    pub fn contour_mask(&self) -> Mask2D {
        let b = self.bounds;
        if b.width <= 2 || b.height <= 2 {
            return self.clone();
        }

        let mut border = Mask2D::blank(b);
        for y in b.y..b.max_y() {
            for x in b.x..b.max_x() {
                if self.is_border_cell(x, y) {
                    border.cells[b.offset(x, y)] = true;
                }
            }
        }
        border
    }

    /// Unordered border points in ascending row-major order
    pub fn contour_points(&self) -> Vec<(i32, i32)> {
        self.contour_mask().points()
    }

    /// Border points as interleaved `x0, y0, x1, y1, ...`
    pub fn contour_points_flat(&self) -> Vec<i32> {
        self.contour_mask().points_flat()
    }

    /// Border points ordered along a single connected curve.
    ///
    /// This is best effort: the border is traced into fragments which are then
    /// stitched together. Fragments that cannot be attached anywhere are
    /// dropped, so masks with several objects or holes may lose part of their
    /// boundary.
    pub fn connected_contour(&self) -> Vec<(i32, i32)> {
        let border = self.contour_mask();
        let fragments = trace_fragments(&border);
        stitch_fragments(fragments)
    }
}

/// Walk the border mask into ordered fragments, seeding in row-major order.
fn trace_fragments(border: &Mask2D) -> Vec<Vec<(i32, i32)>> {
    let b: Bounds2D = border.bounds;
    let mut fragments = Vec::new();
    if b.is_empty() {
        return fragments;
    }

    let mut visited = vec![false; border.cells.len()];
    let is_border = |x: i32, y: i32| b.contains(x, y) && border.cells[b.offset(x, y)];

    for seed_offset in 0..border.cells.len() {
        if !border.cells[seed_offset] || visited[seed_offset] {
            continue;
        }

        let mut current = (
            b.x + (seed_offset % b.width as usize) as i32,
            b.y + (seed_offset / b.width as usize) as i32,
        );
        visited[seed_offset] = true;
        let mut fragment = vec![current];
        // Act as if we just stepped East
        let mut last_dir = 0usize;

        loop {
            let start = (last_dir + 6) % 8;
            let mut next = None;

            for i in 0..8 {
                let dir = (start + i) % 8;
                let (dx, dy) = MOORE_NEIGHBORHOOD[dir];
                let candidate = (current.0 + dx, current.1 + dy);
                if is_border(candidate.0, candidate.1) {
                    next = Some((dir, candidate));
                    break;
                }
            }

            let Some((dir, candidate)) = next else {
                break;
            };
            let offset = b.offset(candidate.0, candidate.1);
            if visited[offset] {
                break;
            }

            visited[offset] = true;
            fragment.push(candidate);
            current = candidate;
            last_dir = dir;
        }

        fragments.push(fragment);
    }

    fragments
}

/// Orientation that makes `first ++ second` a connected curve, as
/// `(reverse first, reverse second)`. `None` when no ends touch.
fn join_orientation(first: &Curve, second: &Curve) -> Option<(bool, bool)> {
    let (&head, &tail) = (first.front()?, first.back()?);
    let (&o_head, &o_tail) = (second.front()?, second.back()?);

    if is_adjacent(tail, o_head) {
        Some((false, false))
    } else if is_adjacent(tail, o_tail) {
        Some((false, true))
    } else if is_adjacent(head, o_tail) {
        Some((true, true))
    } else if is_adjacent(head, o_head) {
        Some((true, false))
    } else {
        None
    }
}

fn oriented(curve: &Curve, reverse: bool) -> Vec<(i32, i32)> {
    if reverse {
        curve.iter().rev().copied().collect()
    } else {
        curve.iter().copied().collect()
    }
}

/// `first ++ second` with the given reversals, reusing the larger buffer.
///
/// The result may come out reversed as a whole; only the smaller curve is copied.
fn concat(mut first: Curve, rev_first: bool, mut second: Curve, rev_second: bool) -> Curve {
    if first.len() >= second.len() {
        let small = oriented(&second, rev_second);
        if rev_first {
            // rev(result) = rev(small) ++ first
            for point in small {
                first.push_front(point);
            }
        } else {
            first.extend(small);
        }
        first
    } else {
        let small = oriented(&first, rev_first);
        if rev_second {
            // rev(result) = second ++ rev(small)
            second.extend(small.into_iter().rev());
        } else {
            for point in small.into_iter().rev() {
                second.push_front(point);
            }
        }
        second
    }
}

/// Live fragment other than `skip` with an end 8-adjacent to `point`
fn touching_end(
    ends: &HashMap<(i32, i32), Vec<usize>>,
    fragments: &[Option<Curve>],
    skip: usize,
    point: (i32, i32),
) -> Option<usize> {
    MOORE_NEIGHBORHOOD.iter().find_map(|&(dx, dy)| {
        let near = (point.0 + dx, point.1 + dy);
        ends.get(&near)?.iter().copied().find(|&j| {
            j != skip
                && fragments[j]
                    .as_ref()
                    .is_some_and(|f| f.front() == Some(&near) || f.back() == Some(&near))
        })
    })
}

/// Join fragments whose ends touch until no two remaining ends are adjacent.
///
/// Ends are looked up through a point index, so each join costs the length
/// of the smaller fragment.
fn merge_touching(fragments: Vec<Vec<(i32, i32)>>) -> Vec<Curve> {
    let mut fragments: Vec<Option<Curve>> = fragments.into_iter().map(|f| Some(Curve::from(f))).collect();
    let mut ends: HashMap<(i32, i32), Vec<usize>> = HashMap::new();
    for (i, fragment) in fragments.iter().enumerate() {
        if let Some(fragment) = fragment {
            for end in curve_ends(fragment) {
                ends.entry(end).or_default().push(i);
            }
        }
    }

    for i in 0..fragments.len() {
        loop {
            let Some(current) = fragments[i].as_ref() else {
                break;
            };
            let [head, tail] = curve_ends(current);
            let Some(j) = touching_end(&ends, &fragments, i, tail).or_else(|| touching_end(&ends, &fragments, i, head))
            else {
                break;
            };

            let (Some(chain), Some(other)) = (fragments[i].take(), fragments[j].take()) else {
                break;
            };
            let joined = match join_orientation(&chain, &other) {
                Some((rev_chain, rev_other)) => concat(chain, rev_chain, other, rev_other),
                None => {
                    fragments[i] = Some(chain);
                    fragments[j] = Some(other);
                    break;
                }
            };
            for end in curve_ends(&joined) {
                ends.entry(end).or_default().push(i);
            }
            fragments[i] = Some(joined);
        }
    }

    fragments.into_iter().flatten().collect()
}

fn curve_ends(curve: &Curve) -> [(i32, i32); 2] {
    match (curve.front(), curve.back()) {
        (Some(&head), Some(&tail)) => [head, tail],
        _ => [(i32::MIN, i32::MIN); 2],
    }
}

const NIL: usize = usize::MAX;

/// Ordered curve kept as a doubly linked list over a point arena, with a
/// point index, so fragments can be spliced in anywhere.
struct Chain {
    points: Vec<(i32, i32)>,
    prev: Vec<usize>,
    next: Vec<usize>,
    head: usize,
    tail: usize,
    nodes: HashMap<(i32, i32), usize>,
}

impl Chain {
    fn new(curve: Curve) -> Self {
        let mut chain = Self {
            points: Vec::with_capacity(curve.len()),
            prev: Vec::with_capacity(curve.len()),
            next: Vec::with_capacity(curve.len()),
            head: NIL,
            tail: NIL,
            nodes: HashMap::with_capacity(curve.len()),
        };
        for point in curve {
            chain.push_back(point);
        }
        chain
    }

    fn alloc(&mut self, point: (i32, i32)) -> usize {
        let node = self.points.len();
        self.points.push(point);
        self.prev.push(NIL);
        self.next.push(NIL);
        self.nodes.insert(point, node);
        node
    }

    fn push_back(&mut self, point: (i32, i32)) {
        let node = self.alloc(point);
        if self.tail == NIL {
            self.head = node;
        } else {
            self.next[self.tail] = node;
            self.prev[node] = self.tail;
        }
        self.tail = node;
    }

    fn push_front(&mut self, point: (i32, i32)) {
        let node = self.alloc(point);
        if self.head == NIL {
            self.tail = node;
        } else {
            self.prev[self.head] = node;
            self.next[node] = self.head;
        }
        self.head = node;
    }

    fn insert_after(&mut self, at: usize, point: (i32, i32)) -> usize {
        if at == self.tail {
            self.push_back(point);
            return self.tail;
        }
        let node = self.alloc(point);
        let after = self.next[at];
        self.next[at] = node;
        self.prev[node] = at;
        self.next[node] = after;
        self.prev[after] = node;
        node
    }

    fn ends(&self) -> Option<[(i32, i32); 2]> {
        (self.head != NIL).then(|| [self.points[self.head], self.points[self.tail]])
    }

    /// Node strictly inside the chain that is 8-adjacent to `point`
    fn interior_neighbour(&self, point: (i32, i32)) -> Option<usize> {
        MOORE_NEIGHBORHOOD.iter().find_map(|&(dx, dy)| {
            let node = *self.nodes.get(&(point.0 + dx, point.1 + dy))?;
            (node != self.head && node != self.tail).then_some(node)
        })
    }

    /// Attach `fragment` at an end, or else after an adjacent interior point
    fn attach(&mut self, fragment: &Curve) -> bool {
        let (Some(&o_head), Some(&o_tail)) = (fragment.front(), fragment.back()) else {
            return true;
        };
        let Some([head, tail]) = self.ends() else {
            for &point in fragment {
                self.push_back(point);
            }
            return true;
        };

        if is_adjacent(tail, o_head) {
            fragment.iter().for_each(|&p| self.push_back(p));
        } else if is_adjacent(tail, o_tail) {
            fragment.iter().rev().for_each(|&p| self.push_back(p));
        } else if is_adjacent(head, o_tail) {
            fragment.iter().rev().for_each(|&p| self.push_front(p));
        } else if is_adjacent(head, o_head) {
            fragment.iter().for_each(|&p| self.push_front(p));
        } else if let Some(mut at) = self.interior_neighbour(o_head) {
            for &point in fragment {
                at = self.insert_after(at, point);
            }
        } else if let Some(mut at) = self.interior_neighbour(o_tail) {
            for &point in fragment.iter().rev() {
                at = self.insert_after(at, point);
            }
        } else {
            return false;
        }
        true
    }

    fn into_vec(self) -> Vec<(i32, i32)> {
        let mut ordered = Vec::with_capacity(self.points.len());
        let mut node = self.head;
        while node != NIL {
            ordered.push(self.points[node]);
            node = self.next[node];
        }
        ordered
    }
}

/// Merge fragments into a single curve, dropping what cannot be attached.
fn stitch_fragments(fragments: Vec<Vec<(i32, i32)>>) -> Vec<(i32, i32)> {
    let mut merged = merge_touching(fragments);

    // Longest chain is the base; earliest seed wins ties
    let Some(base_index) = merged
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.len().cmp(&b.len()).then(ib.cmp(ia)))
        .map(|(index, _)| index)
    else {
        return Vec::new();
    };
    let mut chain = Chain::new(merged.remove(base_index));

    let mut pending: Vec<Option<Curve>> = merged.into_iter().map(Some).collect();
    let mut waiting: HashMap<(i32, i32), Vec<usize>> = HashMap::new();
    for (id, fragment) in pending.iter().enumerate() {
        if let Some(fragment) = fragment {
            for end in curve_ends(fragment) {
                waiting.entry(end).or_default().push(id);
            }
        }
    }

    // A fragment can only become attachable when points land next to its
    // ends or a chain end next to it turns interior, so only those are retried.
    let mut queue: VecDeque<usize> = (0..pending.len()).collect();
    while let Some(id) = queue.pop_front() {
        let Some(fragment) = pending[id].take() else {
            continue;
        };
        let old_ends = chain.ends();
        if !chain.attach(&fragment) {
            pending[id] = Some(fragment);
            continue;
        }

        let touched = fragment.iter().copied().chain(old_ends.into_iter().flatten());
        for point in touched {
            for &(dx, dy) in &MOORE_NEIGHBORHOOD {
                if let Some(ids) = waiting.get(&(point.0 + dx, point.1 + dy)) {
                    queue.extend(ids.iter().copied().filter(|&w| pending[w].is_some()));
                }
            }
        }
    }

    let dropped: Vec<&Curve> = pending.iter().flatten().collect();
    if !dropped.is_empty() {
        debug!(
            "Connected contour dropped {} fragment(s) ({} points)",
            dropped.len(),
            dropped.iter().map(|f| f.len()).sum::<usize>()
        );
    }

    chain.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_3x3() -> Mask2D {
        let mut mask = Mask2D::filled(Bounds2D::new(0, 0, 3, 3));
        mask.set(1, 1, false);
        mask
    }

    fn assert_chain(points: &[(i32, i32)]) {
        for pair in points.windows(2) {
            assert!(is_adjacent(pair[0], pair[1]), "{:?} -> {:?} not adjacent", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_ring_border_is_everything() {
        let ring = ring_3x3();
        assert_eq!(ring.contour_points().len(), 8);
    }

    #[test]
    fn test_full_square_excludes_interior() {
        let square = Mask2D::filled(Bounds2D::new(0, 0, 5, 5));
        let border = square.contour_points();
        assert_eq!(border.len(), 16);
        assert!(!border.contains(&(2, 2)));
        assert!(border.windows(2).all(|w| (w[0].1, w[0].0) < (w[1].1, w[1].0)));
    }

    #[test]
    fn test_border_mask_with_negative_origin() {
        let square = Mask2D::filled(Bounds2D::new(-7, -3, 5, 5));
        let border = square.contour_mask();
        assert_eq!(border.bounds(), square.bounds());
        assert_eq!(border.point_count(), 16);
        assert!(!border.contains(-5, -1));
        assert!(border.contains(-7, -3));
        assert!(border.contains(-3, 1));
    }

    #[test]
    fn test_thin_shapes_are_all_border() {
        let line = Mask2D::filled(Bounds2D::new(0, 0, 6, 2));
        assert_eq!(line.contour_points().len(), 12);
    }

    #[test]
    fn test_single_pixel_contour() {
        let dot = Mask2D::from_points(&[(4, 4)]);
        assert_eq!(dot.contour_points(), vec![(4, 4)]);
        assert_eq!(dot.connected_contour(), vec![(4, 4)]);
    }

    #[test]
    fn test_connected_contour_of_square_is_closed_chain() {
        let square = Mask2D::filled(Bounds2D::new(2, 3, 4, 4));
        let chain = square.connected_contour();
        assert_eq!(chain.len(), 12);
        assert_eq!(chain[0], (2, 3));
        assert_chain(&chain);
        assert!(is_adjacent(chain[0], chain[chain.len() - 1]));
    }

    #[test]
    fn test_connected_contour_of_ring() {
        let chain = ring_3x3().connected_contour();
        assert_eq!(chain.len(), 8);
        assert_chain(&chain);
    }

    #[test]
    fn test_connected_contour_of_l_shape() {
        let mut points = Vec::new();
        for y in 0..6 {
            for x in 0..3 {
                points.push((x, y));
            }
        }
        for y in 3..6 {
            for x in 3..7 {
                points.push((x, y));
            }
        }
        let shape = Mask2D::from_points(&points);
        let chain = shape.connected_contour();
        assert_chain(&chain);
        assert_eq!(chain.len(), shape.contour_points().len());
    }

    #[test]
    fn test_disjoint_objects_lose_fragments() {
        let a = Mask2D::filled(Bounds2D::new(0, 0, 3, 3));
        let b = Mask2D::filled(Bounds2D::new(10, 0, 3, 3));
        let both = Mask2D::union(&a, &b);
        let chain = both.connected_contour();
        assert_eq!(chain.len(), 8);
        assert_chain(&chain);
    }

    #[test]
    fn test_join_orientation_cases() {
        let chain: Curve = [(0, 0), (1, 0)].into();
        assert_eq!(join_orientation(&chain, &[(2, 0), (3, 0)].into()), Some((false, false)));
        assert_eq!(join_orientation(&chain, &[(3, 0), (2, 0)].into()), Some((false, true)));
        assert_eq!(join_orientation(&chain, &[(-2, 0), (-1, 0)].into()), Some((true, true)));
        assert_eq!(join_orientation(&[(5, 5), (0, 0)].into(), &[(-1, 1), (-2, 2)].into()), Some((false, false)));
        assert_eq!(join_orientation(&chain, &[(9, 9)].into()), None);
    }

    #[test]
    fn test_concat_keeps_larger_buffer_forward() {
        let long: Curve = [(0, 0), (1, 0), (2, 0), (3, 0)].into();
        let short: Curve = [(-2, 0), (-1, 0)].into();

        let joined: Vec<_> = concat(long.clone(), true, short.clone(), true).into();
        assert_eq!(joined, vec![(-2, 0), (-1, 0), (0, 0), (1, 0), (2, 0), (3, 0)]);

        let joined: Vec<_> = concat(short, false, long, false).into();
        assert_eq!(joined, vec![(-2, 0), (-1, 0), (0, 0), (1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn test_chain_attaches_at_ends_and_inside() {
        let mut chain = Chain::new([(0, 0), (1, 0), (2, 0), (3, 0)].into());
        assert!(chain.attach(&[(5, 0), (4, 0)].into()));
        assert!(chain.attach(&[(-2, 0), (-1, 0)].into()));
        assert!(chain.attach(&[(1, 2), (1, 1)].into()));
        assert!(!chain.attach(&[(9, 9)].into()));

        assert_eq!(
            chain.into_vec(),
            vec![(-2, 0), (-1, 0), (0, 0), (1, 1), (1, 2), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0)]
        );
    }

    #[test]
    fn test_stitch_follows_growing_ends() {
        let fragments = vec![
            vec![(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)],
            vec![(7, 1)],
            vec![(5, 0), (6, 0)],
        ];
        assert_eq!(
            stitch_fragments(fragments),
            vec![(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0), (6, 0), (7, 1)]
        );
    }

    #[test]
    fn test_stitch_retries_after_insertion() {
        // The short arm only touches the long one after that is spliced in
        let base: Vec<(i32, i32)> = (-3..=5).map(|x| (x, 0)).collect();
        let arm = vec![(3, 3), (2, 3)];
        let spur = vec![(1, 1), (1, 2), (1, 3), (1, 4), (1, 5)];

        assert_eq!(
            stitch_fragments(vec![base, arm, spur]),
            vec![
                (-3, 0),
                (-2, 0),
                (-1, 0),
                (0, 0),
                (1, 1),
                (1, 2),
                (1, 3),
                (1, 4),
                (2, 3),
                (3, 3),
                (1, 5),
                (1, 0),
                (2, 0),
                (3, 0),
                (4, 0),
                (5, 0),
            ]
        );
    }

    #[test]
    fn test_noisy_mask_contour_stays_fast() {
        // Fixed linear congruential noise, about half the cells set
        let mut state: u32 = 0x2545_f491;
        let mut points = Vec::new();
        for y in 0..300 {
            for x in 0..300 {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                if state >> 31 == 1 {
                    points.push((x, y));
                }
            }
        }
        let noise = Mask2D::from_points(&points);

        let started = std::time::Instant::now();
        let chain = noise.connected_contour();
        let elapsed = started.elapsed();

        assert!(elapsed.as_secs() < 10, "ordered contour took {:?}", elapsed);
        assert!(!chain.is_empty());
        let border = noise.contour_mask();
        let unique: std::collections::HashSet<_> = chain.iter().copied().collect();
        assert_eq!(unique.len(), chain.len());
        assert!(chain.iter().all(|&(x, y)| border.contains(x, y)));
    }
}
