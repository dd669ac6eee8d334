//! Balanced k-d tree over place records with great-circle nearest neighbour search.

use std::sync::Arc;
use tracing::{info, warn};

use super::distance::{haversine_km, meridian_distance_km};
use crate::error::{GeolocError, Result};
use crate::models::{Coordinate, PlaceRecord};

/// Partitions at least this large build their two subtrees in parallel
const PARALLEL_BUILD_THRESHOLD: usize = 4096;

/// Slack absorbing rounding differences between pruning bounds and scored distances
const BOUND_SLACK_KM: f64 = 1e-6;

/// Splitting dimension of a node; latitude at even depth, longitude at odd depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn next(self) -> Self {
        match self {
            Axis::Latitude => Axis::Longitude,
            Axis::Longitude => Axis::Latitude,
        }
    }

    fn value(self, coordinate: Coordinate) -> f64 {
        match self {
            Axis::Latitude => coordinate.latitude,
            Axis::Longitude => coordinate.longitude,
        }
    }
}

/// A matched record and its distance from the query point
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub record: Arc<PlaceRecord>,
    pub distance_km: f64,
}

#[derive(Debug)]
struct KdNode {
    record: Arc<PlaceRecord>,
    axis: Axis,
    left: Option<Box<KdNode>>,
    right: Option<Box<KdNode>>,
}

/// Immutable spatial index. Nodes share the records owned by the record store.
#[derive(Debug)]
pub struct KdTree {
    root: Box<KdNode>,
    len: usize,
}

impl KdTree {
    /// Build a balanced tree from records.
    ///
    /// Records without finite, in-range coordinates are skipped. Fails with
    /// [`GeolocError::EmptyDataset`] if nothing is left to index.
    pub fn build<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<PlaceRecord>>,
    {
        let mut total = 0usize;
        let mut valid: Vec<Arc<PlaceRecord>> = records
            .into_iter()
            .inspect(|_| total += 1)
            .filter(|record| record.has_valid_coordinates())
            .collect();

        let skipped = total - valid.len();
        if skipped > 0 {
            warn!(
                "Skipped {} of {} records with invalid coordinates",
                skipped, total
            );
        }

        info!("Building k-d tree for {} places...", valid.len());

        let len = valid.len();
        let root = build_node(&mut valid, Axis::Latitude).ok_or(GeolocError::EmptyDataset)?;
        let tree = Self { root, len };

        info!("k-d tree built with {} entries, depth {}", tree.len, tree.depth());

        Ok(tree)
    }

    /// The `k` records closest to `point`, nearest first.
    ///
    /// Equidistant records keep the order in which the traversal met them; which of them
    /// comes first is not otherwise guaranteed.
    pub fn nearest(&self, point: Coordinate, k: usize) -> Vec<Neighbor> {
        let mut best = Candidates::new(k);
        if k > 0 {
            self.root.search(point, &mut best);
        }
        best.items
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; an empty tree cannot be built
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

fn build_node(records: &mut [Arc<PlaceRecord>], axis: Axis) -> Option<Box<KdNode>> {
    if records.is_empty() {
        return None;
    }

    // Stable sort: equal keys keep their incoming order
    records.sort_by(|a, b| axis.value(a.coordinate()).total_cmp(&axis.value(b.coordinate())));

    let parallel = records.len() >= PARALLEL_BUILD_THRESHOLD;
    let median = records.len() / 2;
    let (left, rest) = records.split_at_mut(median);
    let (pivot, right) = rest.split_first_mut()?;
    let record = Arc::clone(pivot);

    let next = axis.next();
    let (left, right) = if parallel {
        rayon::join(|| build_node(left, next), || build_node(right, next))
    } else {
        (build_node(left, next), build_node(right, next))
    };

    Some(Box::new(KdNode {
        record,
        axis,
        left,
        right,
    }))
}

impl KdNode {
    fn search(&self, point: Coordinate, best: &mut Candidates) {
        best.offer(&self.record, haversine_km(point, self.record.coordinate()));

        let split = self.axis.value(self.record.coordinate());
        let (near, far) = if self.axis.value(point) < split {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        if let Some(near) = near {
            near.search(point, best);
        }

        if let Some(far) = far {
            // A closer record can only exist across the split if the split itself is closer
            // than the current k-th best
            if self.distance_to_split(point, split) - BOUND_SLACK_KM < best.worst() {
                far.search(point, best);
            }
        }
    }

    /// Lower bound on the distance from `point` to any record on the other side of the split
    fn distance_to_split(&self, point: Coordinate, split: f64) -> f64 {
        match self.axis {
            Axis::Latitude => haversine_km(point, Coordinate::new(split, point.longitude)),
            // The far side of a longitude split is bounded by the split meridian and the
            // antimeridian
            Axis::Longitude => {
                meridian_distance_km(point, split).min(meridian_distance_km(point, 180.0))
            }
        }
    }

    fn depth(&self) -> usize {
        let left = self.left.as_ref().map_or(0, |node| node.depth());
        let right = self.right.as_ref().map_or(0, |node| node.depth());
        1 + left.max(right)
    }
}

/// The k best neighbours seen so far, ascending by distance
struct Candidates {
    k: usize,
    items: Vec<Neighbor>,
}

impl Candidates {
    fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k.min(64)),
        }
    }

    fn worst(&self) -> f64 {
        if self.items.len() < self.k {
            f64::INFINITY
        } else {
            self.items.last().map_or(f64::INFINITY, |n| n.distance_km)
        }
    }

    fn offer(&mut self, record: &Arc<PlaceRecord>, distance_km: f64) {
        if distance_km >= self.worst() {
            return;
        }
        let at = self.items.partition_point(|n| n.distance_km <= distance_km);
        self.items.insert(
            at,
            Neighbor {
                record: Arc::clone(record),
                distance_km,
            },
        );
        self.items.truncate(self.k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic xorshift generator for reproducible datasets
    struct XorShift(u64);

    impl XorShift {
        fn next_f64(&mut self) -> f64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }

        fn range(&mut self, lo: f64, hi: f64) -> f64 {
            lo + (hi - lo) * self.next_f64()
        }
    }

    fn place(id: u64, lat: f64, lon: f64) -> Arc<PlaceRecord> {
        Arc::new(PlaceRecord::new(id, &format!("place-{}", id), lat, lon, "GR"))
    }

    fn random_places(
        rng: &mut XorShift,
        n: usize,
        lat: (f64, f64),
        lon: (f64, f64),
    ) -> Vec<Arc<PlaceRecord>> {
        (0..n)
            .map(|i| {
                let lon = rng.range(lon.0, lon.1);
                // Wrap longitudes so ranges may straddle the antimeridian
                let lon = if lon > 180.0 { lon - 360.0 } else { lon };
                place(i as u64, rng.range(lat.0, lat.1), lon)
            })
            .collect()
    }

    fn brute_force(records: &[Arc<PlaceRecord>], point: Coordinate) -> Vec<f64> {
        let mut distances: Vec<f64> = records
            .iter()
            .map(|r| haversine_km(point, r.coordinate()))
            .collect();
        distances.sort_by(|a, b| a.total_cmp(b));
        distances
    }

    fn assert_matches_brute_force(
        records: Vec<Arc<PlaceRecord>>,
        rng: &mut XorShift,
        lat: (f64, f64),
        lon: (f64, f64),
        queries: usize,
    ) {
        let tree = KdTree::build(records.clone()).unwrap();
        for _ in 0..queries {
            let lon = rng.range(lon.0, lon.1);
            let lon = if lon > 180.0 { lon - 360.0 } else { lon };
            let point = Coordinate::new(rng.range(lat.0, lat.1), lon);

            let expected = brute_force(&records, point);
            let found = tree.nearest(point, 1);
            assert_eq!(found.len(), 1);
            assert!(
                (found[0].distance_km - expected[0]).abs() < 1e-9,
                "query {:?}: tree {} brute {}",
                point,
                found[0].distance_km,
                expected[0]
            );
            let exact = haversine_km(point, found[0].record.coordinate());
            assert_eq!(exact, found[0].distance_km);
        }
    }

    #[test]
    fn test_empty_dataset_fails() {
        let err = KdTree::build(Vec::new()).unwrap_err();
        assert_eq!(err, GeolocError::EmptyDataset);
    }

    #[test]
    fn test_only_invalid_records_fails() {
        let records = vec![place(1, f64::NAN, 23.0), place(2, 91.0, 23.0), place(3, 0.0, -181.0)];
        let err = KdTree::build(records).unwrap_err();
        assert_eq!(err, GeolocError::EmptyDataset);
    }

    #[test]
    fn test_invalid_records_are_excluded() {
        let records = vec![place(1, 37.98, 23.72), place(2, f64::NAN, 0.0), place(3, 40.64, 22.94)];
        let tree = KdTree::build(records).unwrap();
        assert_eq!(tree.len(), 2);
        let found = tree.nearest(Coordinate::new(0.0, 0.0), 5);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|n| n.record.geoname_id != 2));
    }

    #[test]
    fn test_single_record_always_matches() {
        let tree = KdTree::build(vec![place(7, 37.9838, 23.7275)]).unwrap();
        assert_eq!(tree.depth(), 1);
        for point in [
            Coordinate::new(37.98, 23.73),
            Coordinate::new(-37.98, -156.27),
            Coordinate::new(90.0, 0.0),
            Coordinate::new(-90.0, 180.0),
        ] {
            let found = tree.nearest(point, 1);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].record.geoname_id, 7);
        }
    }

    #[test]
    fn test_small_tree() {
        let tree = KdTree::build(vec![
            place(1, 0.01, 0.01),
            place(2, 0.01, 0.05),
            place(3, 0.03, 0.09),
            place(4, 0.04, 0.03),
            place(5, 0.04, 0.07),
            place(6, 0.07, 0.03),
            place(7, 0.07, 0.01),
            place(8, 0.08, 0.05),
            place(9, 0.08, 0.09),
        ])
        .unwrap();

        let id = |lat, lon| tree.nearest(Coordinate::new(lat, lon), 1)[0].record.geoname_id;
        assert_eq!(id(0.02, 0.02), 1);
        assert_eq!(id(0.05, 0.03), 4);
        assert_eq!(id(0.05, 0.08), 5);
        assert_eq!(id(0.09, 0.06), 8);
    }

    #[test]
    fn test_tree_is_balanced() {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
        let tree = KdTree::build(random_places(&mut rng, 1000, (34.0, 42.0), (19.0, 30.0))).unwrap();
        assert_eq!(tree.len(), 1000);
        // floor(log2(1000)) + 1
        assert!(tree.depth() <= 10, "depth {}", tree.depth());
    }

    #[test]
    fn test_nearest_matches_brute_force_regional() {
        let mut rng = XorShift(42);
        let lat = (34.0, 42.0);
        let lon = (19.0, 30.0);
        let records = random_places(&mut rng, 2000, lat, lon);
        assert_matches_brute_force(records, &mut rng, lat, lon, 300);
    }

    #[test]
    fn test_nearest_matches_brute_force_global() {
        let mut rng = XorShift(7);
        let lat = (-90.0, 90.0);
        let lon = (-180.0, 180.0);
        let records = random_places(&mut rng, 1500, lat, lon);
        assert_matches_brute_force(records, &mut rng, lat, lon, 300);
    }

    #[test]
    fn test_nearest_matches_brute_force_across_antimeridian() {
        let mut rng = XorShift(1234);
        let lat = (-20.0, 20.0);
        let lon = (170.0, 190.0);
        let records = random_places(&mut rng, 800, lat, lon);
        assert_matches_brute_force(records, &mut rng, lat, lon, 300);
    }

    #[test]
    fn test_nearest_matches_brute_force_near_pole() {
        let mut rng = XorShift(99);
        let lat = (80.0, 90.0);
        let lon = (-180.0, 180.0);
        let records = random_places(&mut rng, 800, lat, lon);
        assert_matches_brute_force(records, &mut rng, lat, lon, 300);
    }

    #[test]
    fn test_parallel_build_matches_brute_force() {
        let mut rng = XorShift(2024);
        let lat = (-60.0, 70.0);
        let lon = (-180.0, 180.0);
        let records = random_places(&mut rng, PARALLEL_BUILD_THRESHOLD * 3, lat, lon);
        assert_matches_brute_force(records, &mut rng, lat, lon, 100);
    }

    #[test]
    fn test_k_nearest_sorted() {
        let mut rng = XorShift(5);
        let records = random_places(&mut rng, 500, (34.0, 42.0), (19.0, 30.0));
        let tree = KdTree::build(records.clone()).unwrap();

        let point = Coordinate::new(38.0, 23.7);
        let found = tree.nearest(point, 8);
        let expected = brute_force(&records, point);

        assert_eq!(found.len(), 8);
        for (neighbor, distance) in found.iter().zip(&expected) {
            assert!((neighbor.distance_km - distance).abs() < 1e-9);
        }
    }

    #[test]
    fn test_k_larger_than_tree() {
        let tree = KdTree::build(vec![place(1, 1.0, 1.0), place(2, 2.0, 2.0)]).unwrap();
        let found = tree.nearest(Coordinate::new(0.0, 0.0), 10);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].record.geoname_id, 1);
        assert_eq!(found[1].record.geoname_id, 2);
        assert!(tree.nearest(Coordinate::new(0.0, 0.0), 0).is_empty());
    }

    #[test]
    fn test_far_query_returns_finite_distance() {
        let tree = KdTree::build(vec![place(1, 37.98, 23.72), place(2, 40.64, 22.94)]).unwrap();
        let found = tree.nearest(Coordinate::new(-45.0, -120.0), 1);
        assert_eq!(found.len(), 1);
        assert!(found[0].distance_km.is_finite());
        assert!(found[0].distance_km > 10_000.0);
    }

    #[test]
    fn test_deterministic_results() {
        let mut rng = XorShift(77);
        let records = random_places(&mut rng, 300, (34.0, 42.0), (19.0, 30.0));
        let a = KdTree::build(records.clone()).unwrap();
        let b = KdTree::build(records).unwrap();
        let point = Coordinate::new(37.5, 22.1);
        assert_eq!(
            a.nearest(point, 1)[0].record.geoname_id,
            b.nearest(point, 1)[0].record.geoname_id
        );
    }
}
