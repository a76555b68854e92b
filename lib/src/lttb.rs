use std::borrow::Cow;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::Point;

/// Largest Triangle Three Buckets (LTTB) downsampling algorithm.
///
/// Reduces an ordered slice of points to `threshold` points while preserving
/// the visual shape of the data. The first and last points are always kept;
/// the points in between are split into `threshold - 2` buckets and each bucket
/// contributes the point forming the largest triangle with the previously
/// selected point and the centroid of the following bucket.
///
/// Returns `data` itself, without copying, if `threshold >= data.len()` or
/// `threshold == 0`. Thresholds of 1 and 2 on longer inputs yield just the two
/// endpoints.
pub fn downsample(data: &[Point], threshold: usize) -> Cow<'_, [Point]> {
    if is_noop(data.len(), threshold) {
        trace!(n = data.len(), threshold, "nothing to downsample");
        return Cow::Borrowed(data);
    }

    Cow::Owned(
        downsample_indices(data, threshold)
            .into_iter()
            .map(|i| data[i])
            .collect(),
    )
}

/// Like [`downsample`], but takes a signed threshold and rejects negative
/// values instead of treating them as an arbitrary size.
pub fn try_downsample(data: &[Point], threshold: i64) -> Result<Cow<'_, [Point]>> {
    if threshold < 0 {
        return Err(Error::InvalidThreshold(threshold));
    }
    let threshold = usize::try_from(threshold).unwrap_or(usize::MAX);
    Ok(downsample(data, threshold))
}

/// Indices into `data` of the points [`downsample`] selects, in increasing
/// order. Yields every index when there is nothing to reduce.
pub fn downsample_indices(data: &[Point], threshold: usize) -> Vec<usize> {
    let n = data.len();
    if is_noop(n, threshold) {
        return (0..n).collect();
    }

    let buckets = threshold.saturating_sub(2);
    let mut sampled = Vec::with_capacity(buckets + 2);
    sampled.push(0);

    if buckets > 0 {
        // Leave room for the start and end points.
        let bucket_size = (n - 2) as f64 / buckets as f64;
        debug!(n, threshold, bucket_size, "downsampling");

        let mut a_idx = 0usize;

        for i in 0..buckets {
            // Centroid of the next bucket is the third triangle vertex.
            let next_start = bucket_bound(i + 1, bucket_size);
            let next_end = bucket_bound(i + 2, bucket_size).min(n);
            let avg = data
                .get(next_start..next_end)
                .and_then(centroid)
                .unwrap_or(data[n - 1]);

            let start = bucket_bound(i, bucket_size);
            let end = bucket_bound(i + 1, bucket_size).min(n - 1);

            let a = data[a_idx];
            let mut max_area = -1.0f64;
            let mut max_idx = start;

            for (j, b) in data.iter().enumerate().take(end).skip(start) {
                let area = triangle_area(a, *b, avg);
                if area > max_area {
                    max_area = area;
                    max_idx = j;
                }
            }

            sampled.push(max_idx);
            a_idx = max_idx;
        }
    } else {
        debug!(n, threshold, "threshold below 3, keeping endpoints only");
    }

    sampled.push(n - 1);
    sampled
}

fn is_noop(n: usize, threshold: usize) -> bool {
    threshold >= n || threshold == 0
}

// First index of bucket `k`; index 0 is reserved for the first point.
fn bucket_bound(k: usize, bucket_size: f64) -> usize {
    (k as f64 * bucket_size).floor() as usize + 1
}

// Mean of `points`, summed left to right.
fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0f64, 0.0f64), |(sx, sy), p| (sx + p.x, sy + p.y));
    let len = points.len() as f64;
    Some(Point::new(sum_x / len, sum_y / len))
}

fn triangle_area(a: Point, b: Point, c: Point) -> f64 {
    ((a.x - c.x) * (b.y - a.y) - (a.x - b.x) * (c.y - a.y)).abs() * 0.5
}
