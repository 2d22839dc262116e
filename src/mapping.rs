//! Assignment of curve fragments to contour samples.

use serde::{Deserialize, Serialize};

use crate::config::BalanceStrategy;
use crate::fragment::FragmentRing;
use crate::math::{dist2, ring_next, ring_prev, Point2d};
use crate::FitError;

/// The pending relocation direction of a segment's start boundary.
///
/// Shrinking moves the start forward, handing the segment's first fragment
/// to the previous segment. Growing moves it backward, taking the last
/// fragment of the previous segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Flow {
    /// Must shrink on the next pass to restore length balance.
    MustShrink = -2,
    /// Has shrunk and may shrink further.
    Shrink = -1,
    /// Has not moved.
    #[default]
    Idle = 0,
    /// Has grown and may grow further.
    Grow = 1,
    /// Must grow on the next pass to restore length balance.
    MustGrow = 2,
}

impl Flow {
    fn may_shrink(self) -> bool {
        self <= Flow::Idle
    }

    fn may_grow(self) -> bool {
        self >= Flow::Idle
    }
}

/// A contiguous run of fragments matched to one contour sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Index of the first fragment.
    pub start: usize,
    /// Total length of the segment's fragments.
    pub len: f64,
    /// Squared distance between the contour sample and the first fragment.
    pub err: f64,
    /// Pending relocation direction.
    pub flow: Flow,
}

/// A partition of the fragment ring into one segment per contour sample.
#[derive(Clone, Debug)]
pub struct SegmentMap {
    segments: Vec<Segment>,
    /// Number of fragments being partitioned.
    fragment_count: usize,
    /// Number of boundary moves made so far.
    relocations: u64,
}

impl SegmentMap {
    /// Creates an evenly spaced partition of `fragments`.
    pub fn new(fragments: &FragmentRing, contour: &[Point2d]) -> Result<Self, FitError> {
        let samples = contour.len();
        let count = fragments.len();
        if samples == 0 {
            return Err(FitError::EmptyContour);
        }
        if count <= samples {
            return Err(FitError::TooFewFragments {
                fragments: count,
                samples,
            });
        }

        let segments = (0..samples)
            .map(|i| Segment {
                start: i * count / samples,
                len: 0.0,
                err: 0.0,
                flow: Flow::Idle,
            })
            .collect();
        let mut map = Self {
            segments,
            fragment_count: count,
            relocations: 0,
        };
        map.refresh(fragments, contour);
        Ok(map)
    }

    /// Gets all segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first fragment of every segment.
    pub fn starts(&self) -> impl Iterator<Item = usize> + '_ {
        self.segments.iter().map(|seg| seg.start)
    }

    /// The number of boundary moves made since creation.
    pub fn relocations(&self) -> u64 {
        self.relocations
    }

    /// The sum of all segment errors.
    pub fn total_error(&self) -> f64 {
        self.segments.iter().map(|seg| seg.err).sum()
    }

    /// The sum of all segment lengths.
    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(|seg| seg.len).sum()
    }

    /// Clears all pending relocation directions.
    pub fn reset_flows(&mut self) {
        for seg in &mut self.segments {
            seg.flow = Flow::Idle;
        }
    }

    /// The number of fragments in segment `i`.
    pub fn fragment_count(&self, i: usize) -> usize {
        let n = self.segments.len();
        if n == 1 {
            return self.fragment_count;
        }
        let next = self.segments[ring_next(i, n)].start;
        (next + self.fragment_count - self.segments[i].start) % self.fragment_count
    }

    /// Recomputes segment lengths and errors for changed fragments, keeping
    /// the segment boundaries.
    pub fn refresh(&mut self, fragments: &FragmentRing, contour: &[Point2d]) {
        debug_assert_eq!(fragments.len(), self.fragment_count);
        let n = self.segments.len();
        let count = self.fragment_count;
        for i in 0..n {
            let start = self.segments[i].start;
            let len = (0..self.fragment_count(i))
                .map(|k| fragments.get((start + k) % count).len)
                .sum();
            let seg = &mut self.segments[i];
            seg.len = len;
            seg.err = dist2(contour[i], fragments.get(start).pos);
        }
    }

    /// Runs one forward and one backward sweep of boundary relocations.
    ///
    /// The forward sweep lets segments shrink when their second fragment is
    /// closer to their contour sample, and the backward sweep lets them grow
    /// when the previous segment's last fragment is closer. A move that
    /// would push a neighbouring pair out of `max_ratio` balance is either
    /// deferred by demanding a move of the neighbour
    /// ([BalanceStrategy::Inline]) or rejected ([BalanceStrategy::PrePass]).
    ///
    /// Returns true if a boundary moved or a new demand was raised.
    pub fn relocate_step(
        &mut self,
        fragments: &FragmentRing,
        contour: &[Point2d],
        max_ratio: f64,
        strategy: BalanceStrategy,
    ) -> bool {
        let n = self.segments.len();
        let count = self.fragment_count;
        let demand = strategy == BalanceStrategy::Inline;
        let mut changed = false;

        for curr in 0..n {
            let prev = ring_prev(curr, n);
            let prev_prev = ring_prev(prev, n);
            let next = ring_next(curr, n);
            let seg = self.segments[curr];

            if self.fragment_count(curr) < 2 || !seg.flow.may_shrink() {
                continue;
            }
            let second = ring_next(seg.start, count);
            let err_second = dist2(contour[curr], fragments.get(second).pos);
            if !(err_second < seg.err || seg.flow == Flow::MustShrink) {
                continue;
            }

            let frag_len = fragments.get(seg.start).len;
            let new_prev = self.segments[prev].len + frag_len;
            let new_curr = seg.len - frag_len;
            if self.segments[prev_prev].len * max_ratio < new_prev {
                if demand {
                    changed |= self.demand(prev, Flow::MustShrink);
                }
            } else if new_curr * max_ratio < self.segments[next].len {
                if demand {
                    changed |= self.demand(next, Flow::MustShrink);
                }
            } else if new_prev <= new_curr * max_ratio {
                self.segments[prev].len += frag_len;
                let seg = &mut self.segments[curr];
                seg.len -= frag_len;
                seg.start = second;
                seg.flow = Flow::Shrink;
                seg.err = err_second;
                self.relocations += 1;
                changed = true;
            }
        }

        for curr in (0..n).rev() {
            let prev = ring_prev(curr, n);
            let prev_prev = ring_prev(prev, n);
            let next = ring_next(curr, n);
            let seg = self.segments[curr];

            if self.fragment_count(prev) < 2 || !seg.flow.may_grow() {
                continue;
            }
            let last_prev = ring_prev(seg.start, count);
            let err_last_prev = dist2(contour[curr], fragments.get(last_prev).pos);
            if !(err_last_prev < seg.err || seg.flow == Flow::MustGrow) {
                continue;
            }

            let frag_len = fragments.get(last_prev).len;
            let new_prev = self.segments[prev].len - frag_len;
            let new_curr = seg.len + frag_len;
            if self.segments[prev_prev].len > new_prev * max_ratio {
                if demand {
                    changed |= self.demand(prev, Flow::MustGrow);
                }
            } else if new_curr > self.segments[next].len * max_ratio {
                if demand {
                    changed |= self.demand(next, Flow::MustGrow);
                }
            } else if new_prev * max_ratio >= new_curr {
                self.segments[prev].len -= frag_len;
                let seg = &mut self.segments[curr];
                seg.len += frag_len;
                seg.start = last_prev;
                seg.flow = Flow::Grow;
                seg.err = err_last_prev;
                self.relocations += 1;
                changed = true;
            }
        }

        changed
    }

    /// Raises a mandatory relocation on segment `i` unless it already flows
    /// the opposite way. Returns true if the flow changed.
    fn demand(&mut self, i: usize, flow: Flow) -> bool {
        let seg = &mut self.segments[i];
        let allowed = match flow {
            Flow::MustShrink => seg.flow.may_shrink(),
            _ => seg.flow.may_grow(),
        };
        if allowed && seg.flow != flow {
            seg.flow = flow;
            true
        } else {
            false
        }
    }

    /// Moves fragments out of over-long segments until every adjacent pair
    /// is within `max_ratio`, or no fragment can move without tipping the
    /// pair the other way.
    ///
    /// Alternates forward sweeps, which hand the last fragment of a segment
    /// to the next one, with backward sweeps, which hand the first fragment
    /// to the previous one. Segment errors are updated for moved starts.
    pub fn balance(
        &mut self,
        fragments: &FragmentRing,
        contour: &[Point2d],
        max_ratio: f64,
        max_passes: usize,
    ) -> Result<(), FitError> {
        let n = self.segments.len();
        let count = self.fragment_count;
        let mut forward = true;
        let mut quiet = 0;
        let mut passes = 0;

        // Done once a sweep in each direction moved nothing.
        while quiet < 2 {
            if passes == max_passes {
                return Err(FitError::Unstable { passes });
            }
            passes += 1;

            let mut changed = false;
            if forward {
                for curr in 0..n {
                    let next = ring_next(curr, n);
                    if self.fragment_count(curr) < 2 || curr == next {
                        continue;
                    }
                    let (len, next_len) = (self.segments[curr].len, self.segments[next].len);
                    let last = ring_prev(self.segments[next].start, count);
                    let frag_len = fragments.get(last).len;
                    if len > next_len * max_ratio && next_len + frag_len <= (len - frag_len) * max_ratio {
                        self.segments[curr].len -= frag_len;
                        let seg = &mut self.segments[next];
                        seg.len += frag_len;
                        seg.start = last;
                        seg.err = dist2(contour[next], fragments.get(last).pos);
                        self.relocations += 1;
                        changed = true;
                    }
                }
            } else {
                for curr in (0..n).rev() {
                    let prev = ring_prev(curr, n);
                    if self.fragment_count(curr) < 2 || curr == prev {
                        continue;
                    }
                    let (len, prev_len) = (self.segments[curr].len, self.segments[prev].len);
                    let first = self.segments[curr].start;
                    let frag_len = fragments.get(first).len;
                    if len > prev_len * max_ratio && prev_len + frag_len <= (len - frag_len) * max_ratio {
                        self.segments[prev].len += frag_len;
                        let second = ring_next(first, count);
                        let seg = &mut self.segments[curr];
                        seg.len -= frag_len;
                        seg.start = second;
                        seg.err = dist2(contour[curr], fragments.get(second).pos);
                        self.relocations += 1;
                        changed = true;
                    }
                }
            }

            quiet = if changed { 0 } else { quiet + 1 };
            forward = !forward;
        }
        Ok(())
    }

    /// Checks that the segments partition the fragment ring and that their
    /// lengths add up to the ring length.
    pub fn is_consistent(&self, fragments: &FragmentRing) -> bool {
        let count = self.fragment_count;
        let partitioned = fragments.len() == count
            && self.segments.iter().all(|seg| seg.start < count)
            && (0..self.len()).all(|i| self.fragment_count(i) > 0)
            && (0..self.len()).map(|i| self.fragment_count(i)).sum::<usize>() == count;
        let total = fragments.total_length();
        let conserved = (self.total_length() - total).abs() <= 1e-9 * total.max(1.0);
        partitioned && conserved
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::curve::ClosedCurve;
    use assert_approx_eq::assert_approx_eq;

    fn ring(n: usize, radius: f64) -> ClosedCurve {
        let anchors = (0..n)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::TAU / n as f64;
                Point2d::new(200.0 + radius * angle.cos(), 200.0 + radius * angle.sin())
            })
            .collect();
        ClosedCurve::new(anchors)
    }

    #[test]
    fn initial_partition_is_even() {
        let curve = ring(6, 100.0);
        let fragments = FragmentRing::with_count(&curve, 120.0);
        let contour = vec![Point2d::new(200.0, 200.0); 7];
        let map = SegmentMap::new(&fragments, &contour).unwrap();
        assert_eq!(fragments.len(), 120);
        assert_eq!(map.starts().collect::<Vec<_>>(), vec![0, 17, 34, 51, 68, 85, 102]);
        assert!(map.is_consistent(&fragments));
        assert_approx_eq!(map.total_length(), fragments.total_length(), 1e-9);
        // The first segment starts on an anchor of the ring.
        assert_approx_eq!(map.segments()[0].err, 100.0 * 100.0, 1e-6);
        assert!(map.segments().iter().all(|seg| seg.flow == Flow::Idle));
    }

    #[test]
    fn rejects_too_few_fragments() {
        let curve = ring(4, 100.0);
        let fragments = FragmentRing::build(&curve, 0.25);
        let contour = vec![Point2d::new(0.0, 0.0); 16];
        assert!(matches!(
            SegmentMap::new(&fragments, &contour),
            Err(FitError::TooFewFragments {
                fragments: 16,
                samples: 16
            })
        ));
        assert!(matches!(
            SegmentMap::new(&fragments, &[]),
            Err(FitError::EmptyContour)
        ));
    }

    #[test]
    fn single_segment_covers_the_ring() {
        let curve = ring(4, 50.0);
        let fragments = FragmentRing::build(&curve, 0.25);
        let contour = [Point2d::new(250.0, 200.0)];
        let map = SegmentMap::new(&fragments, &contour).unwrap();
        assert_eq!(map.fragment_count(0), 16);
        assert!(map.is_consistent(&fragments));
    }

    #[test]
    fn relocation_conserves_length() {
        let curve = ring(5, 100.0);
        let fragments = FragmentRing::with_count(&curve, 400.0);
        // The same circle, shifted by a quarter segment.
        let contour = (0..50)
            .map(|i| {
                let angle = (i as f64 + 0.25) * std::f64::consts::TAU / 50.0;
                Point2d::new(200.0 + 100.0 * angle.cos(), 200.0 + 100.0 * angle.sin())
            })
            .collect::<Vec<_>>();
        for strategy in [BalanceStrategy::Inline, BalanceStrategy::PrePass] {
            let mut map = SegmentMap::new(&fragments, &contour).unwrap();
            let before = map.total_error();
            for _ in 0..20 {
                map.relocate_step(&fragments, &contour, 1.2, strategy);
                assert!(map.is_consistent(&fragments));
            }
            assert!(map.relocations() > 0);
            assert!(map.total_error() < before);
        }
    }

    /// Splits a circle of 800 fragments into segments of the given sizes.
    /// Each contour sample sits on the fragment at the given offset from
    /// its segment's start.
    fn layout(sizes: &[usize], offsets: &[isize]) -> (FragmentRing, Vec<Point2d>, SegmentMap) {
        let curve = ring(8, 100.0);
        let fragments = FragmentRing::with_count(&curve, 800.0);
        let count = fragments.len();
        assert_eq!(sizes.iter().sum::<usize>(), count);
        let starts = sizes
            .iter()
            .scan(0, |next, size| {
                let start = *next;
                *next += size;
                Some(start)
            })
            .collect::<Vec<_>>();
        let contour = starts
            .iter()
            .zip(offsets)
            .map(|(&start, &offset)| {
                let idx = (start + count).wrapping_add_signed(offset) % count;
                fragments.get(idx).pos
            })
            .collect::<Vec<_>>();
        let mut map = SegmentMap::new(&fragments, &contour).unwrap();
        map.segments = starts
            .iter()
            .map(|&start| Segment {
                start,
                len: 0.0,
                err: 0.0,
                flow: Flow::Idle,
            })
            .collect();
        map.refresh(&fragments, &contour);
        assert!(map.is_consistent(&fragments));
        (fragments, contour, map)
    }

    fn within(a: f64, b: f64, max_ratio: f64) -> bool {
        a <= b * max_ratio && b <= a * max_ratio
    }

    #[test]
    fn overlong_previous_segment_defers_a_shrink() {
        // Segment 2 is closer to its sample one fragment further on, but
        // handing that fragment to segment 1 would make it too long next
        // to segment 0.
        let sizes = [100, 150, 140, 140, 140, 130];
        let (fragments, contour, mut map) = layout(&sizes, &[0, 0, 1, 0, 0, 0]);
        let starts = map.starts().collect::<Vec<_>>();
        assert!(map.segments()[2].err > 0.0);

        assert!(map.relocate_step(&fragments, &contour, 1.2, BalanceStrategy::Inline));
        assert_eq!(map.starts().collect::<Vec<_>>(), starts);
        assert_eq!(map.relocations(), 0);
        assert_eq!(map.segments()[1].flow, Flow::MustShrink);

        // Segment 1 sits on its sample, so only the demand moves it.
        assert_eq!(map.segments()[1].err, 0.0);
        assert!(map.relocate_step(&fragments, &contour, 1.2, BalanceStrategy::Inline));
        assert_eq!(map.segments()[1].start, starts[1] + 1);
        assert!(map.segments()[1].err > 0.0);
        assert!(map.relocations() > 0);
        assert!(map.is_consistent(&fragments));
    }

    #[test]
    fn overlong_segment_demands_growth_of_the_next() {
        // Segment 1 is closer to its sample one fragment back, but taking
        // that fragment would make it too long next to segment 2.
        let sizes = [140, 150, 100, 140, 140, 130];
        let (fragments, contour, mut map) = layout(&sizes, &[0, -1, 0, 0, 0, 0]);
        let starts = map.starts().collect::<Vec<_>>();

        assert!(map.relocate_step(&fragments, &contour, 1.2, BalanceStrategy::Inline));
        assert_eq!(map.starts().collect::<Vec<_>>(), starts);
        assert_eq!(map.segments()[2].flow, Flow::MustGrow);

        assert_eq!(map.segments()[2].err, 0.0);
        assert!(map.relocate_step(&fragments, &contour, 1.2, BalanceStrategy::Inline));
        assert_eq!(map.segments()[2].start, starts[2] - 1);
        assert!(map.segments()[2].err > 0.0);
        assert!(map.is_consistent(&fragments));
    }

    #[test]
    fn pre_pass_rejects_unbalancing_moves() {
        let sizes = [100, 150, 140, 140, 140, 130];
        let (fragments, contour, mut map) = layout(&sizes, &[0, 0, 1, 0, 0, 0]);
        let starts = map.starts().collect::<Vec<_>>();

        assert!(!map.relocate_step(&fragments, &contour, 1.2, BalanceStrategy::PrePass));
        assert_eq!(map.starts().collect::<Vec<_>>(), starts);
        assert!(map.segments().iter().all(|seg| seg.flow == Flow::Idle));
        assert_eq!(map.relocations(), 0);
    }

    #[test]
    fn relocation_keeps_balanced_pairs_balanced() {
        use crate::contour::{contour_density, sample_contour};
        use rand::{Rng, SeedableRng};

        let mut rng = rand::rngs::StdRng::from_seed(*b"closed continuous bezier curves!");
        let mut random_ring = |n: usize| {
            let anchors = (0..n)
                .map(|_| Point2d::new(rng.gen_range(50..350) as f64, rng.gen_range(50..350) as f64))
                .collect();
            ClosedCurve::new(anchors)
        };

        for n in 3..9 {
            let reference = random_ring(n + 2);
            let curve = random_ring(n);
            let contour = sample_contour(&reference, contour_density(&reference, 1.0 / 6.0));
            let fragments = FragmentRing::with_count(&curve, contour.len() as f64 * 8.0);
            for max_ratio in [1.02, 1.2, 1.5] {
                for strategy in [BalanceStrategy::Inline, BalanceStrategy::PrePass] {
                    let mut map = SegmentMap::new(&fragments, &contour).unwrap();
                    for _ in 0..200 {
                        let segs = map.segments().to_vec();
                        let balanced = (0..segs.len())
                            .filter(|&i| {
                                let next = ring_next(i, segs.len());
                                within(segs[i].len, segs[next].len, max_ratio)
                            })
                            .collect::<Vec<_>>();

                        let changed = map.relocate_step(&fragments, &contour, max_ratio, strategy);
                        assert!(map.is_consistent(&fragments));
                        let segs = map.segments();
                        for &i in &balanced {
                            let next = ring_next(i, segs.len());
                            assert!(
                                within(segs[i].len, segs[next].len, max_ratio),
                                "segments {} and {} left the ratio {}",
                                i,
                                next,
                                max_ratio
                            );
                        }
                        if !changed {
                            break;
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn balance_evens_out_lengths() {
        let curve = ring(8, 100.0);
        let fragments = FragmentRing::with_count(&curve, 800.0);
        let contour = vec![Point2d::new(200.0, 200.0); 40];
        let mut map = SegmentMap::new(&fragments, &contour).unwrap();
        // Crowd the first ten segments into a small stretch of the ring.
        let count = fragments.len();
        map.segments = (0..40)
            .map(|i| Segment {
                start: if i < 10 { i * 2 } else { 20 + (i - 10) * (count - 20) / 30 },
                len: 0.0,
                err: 0.0,
                flow: Flow::Idle,
            })
            .collect();
        map.refresh(&fragments, &contour);
        assert!(map.is_consistent(&fragments));

        map.balance(&fragments, &contour, 1.2, 10_000).unwrap();
        assert!(map.is_consistent(&fragments));
        let segs = map.segments();
        for i in 0..segs.len() {
            let next = &segs[ring_next(i, segs.len())];
            let frag = fragments.get(next.start).len;
            // Balanced up to a single fragment.
            assert!(segs[i].len <= (next.len + frag) * 1.2 + frag);
            assert!(next.len <= (segs[i].len + frag) * 1.2 + frag);
        }
    }

    #[test]
    fn refresh_tracks_new_fragments() {
        let mut curve = ClosedCurve::new(vec![
            Point2d::new(100.0, 100.0),
            Point2d::new(300.0, 100.0),
            Point2d::new(300.0, 300.0),
            Point2d::new(100.0, 300.0),
        ]);
        let mut fragments = FragmentRing::with_count(&curve, 240.0);
        let contour = vec![Point2d::new(200.0, 200.0); 30];
        let mut map = SegmentMap::new(&fragments, &contour).unwrap();
        let starts = map.starts().collect::<Vec<_>>();

        curve.rescale_about_centroid(1.5);
        fragments.rebuild(&curve);
        map.refresh(&fragments, &contour);
        assert_eq!(map.starts().collect::<Vec<_>>(), starts);
        assert!(map.is_consistent(&fragments));
        assert_eq!(map.segments()[0].err, 2.0 * 150.0 * 150.0);
    }
}
