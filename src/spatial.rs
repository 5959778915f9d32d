//! Static k-d tree for nearest-point queries.
//!
//! The tree is stored implicitly: the points are reordered so that, for any
//! subrange, the median along that depth's axis sits in the middle.

/// Result of a nearest-neighbour query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest<const D: usize> {
    pub point: [f64; D],
    pub distance: f64,
}

#[derive(Debug, Clone)]
pub struct KdTree<const D: usize> {
    points: Vec<[f64; D]>,
}

impl<const D: usize> KdTree<D> {
    /// Build a tree over `points`. The tree takes ownership and reorders them.
    pub fn build(mut points: Vec<[f64; D]>) -> Self {
        build_recursive(&mut points, 0);
        KdTree { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Find the point closest to `target` (Euclidean). Returns `None` for an
    /// empty tree.
    pub fn nearest(&self, target: &[f64; D]) -> Option<Nearest<D>> {
        let mut best: Option<(usize, f64)> = None;
        self.search(0, self.points.len(), 0, target, &mut best);

        best.map(|(index, distance_squared)| Nearest {
            point: self.points[index],
            distance: distance_squared.sqrt(),
        })
    }

    fn search(
        &self,
        lo: usize,
        hi: usize,
        depth: usize,
        target: &[f64; D],
        best: &mut Option<(usize, f64)>,
    ) {
        if lo >= hi {
            return;
        }

        let mid = lo + (hi - lo) / 2;
        let point = &self.points[mid];

        let d2 = distance_squared(point, target);
        if best.is_none_or(|(_, b)| d2 < b) {
            *best = Some((mid, d2));
        }

        let axis = depth % D;
        let delta = target[axis] - point[axis];
        let (near, far) = if delta < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.search(near.0, near.1, depth + 1, target, best);

        // The far side can only help if the splitting plane is closer than
        // the current best
        if best.is_none_or(|(_, b)| delta * delta < b) {
            self.search(far.0, far.1, depth + 1, target, best);
        }
    }
}

fn build_recursive<const D: usize>(points: &mut [[f64; D]], depth: usize) {
    if points.len() <= 1 {
        return;
    }

    let axis = depth % D;
    let mid = points.len() / 2;
    points.select_nth_unstable_by(mid, |a, b| a[axis].total_cmp(&b[axis]));

    let (left, right) = points.split_at_mut(mid);
    build_recursive(left, depth + 1);
    build_recursive(&mut right[1..], depth + 1);
}

fn distance_squared<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
