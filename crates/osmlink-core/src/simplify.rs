//! Curve simplification (Ramer–Douglas–Peucker) over coordinate sequences.
//!
//! Operates on plain coordinates and knows nothing about resolution. Distances
//! are planar, in degrees, with latitude as x and longitude as y.

use crate::element::Coordinate;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimplifyError {
    #[error("tolerance must be a positive finite number, got {0}")]
    InvalidTolerance(f64),
}

/// Reduces a coordinate sequence while staying within `tolerance` of it.
pub trait CurveSimplifier {
    fn simplify(
        &self,
        points: &[Coordinate],
        tolerance: f64,
    ) -> Result<Vec<Coordinate>, SimplifyError>;
}

/// Ramer–Douglas–Peucker.
///
/// A sequence whose first and last coordinates coincide (a closed ring) is
/// simplified without its last coordinate, which is then re-appended; the
/// farthest-point search would otherwise measure against a zero-length chord.
#[derive(Debug, Clone, Copy, Default)]
pub struct DouglasPeucker;

impl CurveSimplifier for DouglasPeucker {
    fn simplify(
        &self,
        points: &[Coordinate],
        tolerance: f64,
    ) -> Result<Vec<Coordinate>, SimplifyError> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(SimplifyError::InvalidTolerance(tolerance));
        }
        if points.len() < 2 {
            return Ok(points.to_vec());
        }

        let mut keep = vec![false; points.len()];
        let mut stack = vec![(0, points.len() - 1)];

        while let Some((first, last)) = stack.pop() {
            keep[first] = true;
            keep[last] = true;
            if first == last {
                continue;
            }
            if points[first] == points[last] {
                stack.push((first, last - 1));
                continue;
            }
            if first + 1 == last {
                continue;
            }

            let mut max_distance = 0.0;
            let mut found = None;
            for idx in first + 1..last {
                let distance = line_distance(points[first], points[last], points[idx]);
                if distance > max_distance {
                    max_distance = distance;
                    found = Some(idx);
                }
            }

            if let Some(idx) = found
                && max_distance > tolerance
            {
                stack.push((idx, last));
                stack.push((first, idx));
            }
        }

        Ok(points
            .iter()
            .zip(keep)
            .filter_map(|(p, k)| k.then_some(*p))
            .collect())
    }
}

/// Distance from `p` to the infinite line through `a` and `b`.
fn line_distance(a: Coordinate, b: Coordinate, p: Coordinate) -> f64 {
    let (dx, dy) = (b.lat - a.lat, b.lon - a.lon);
    let length = dx.hypot(dy);
    if length == 0.0 {
        return (p.lat - a.lat).hypot(p.lon - a.lon);
    }
    (dx * (p.lon - a.lon) - dy * (p.lat - a.lat)).abs() / length
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(pairs: &[(f64, f64)]) -> Vec<Coordinate> {
        pairs.iter().map(|&(x, y)| Coordinate::new(x, y)).collect()
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        let line = coords(&[(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(
            DouglasPeucker.simplify(&line, 0.0),
            Err(SimplifyError::InvalidTolerance(0.0))
        );
        assert!(DouglasPeucker.simplify(&line, f64::NAN).is_err());
    }

    #[test]
    fn test_short_sequences_unchanged() {
        assert!(DouglasPeucker.simplify(&[], 0.1).unwrap().is_empty());
        let single = coords(&[(3.0, 4.0)]);
        assert_eq!(DouglasPeucker.simplify(&single, 0.1).unwrap(), single);
        let pair = coords(&[(0.0, 0.0), (1.0, 0.0)]);
        assert_eq!(DouglasPeucker.simplify(&pair, 0.1).unwrap(), pair);
    }

    #[test]
    fn test_drops_collinear_points() {
        let line = coords(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let simplified = DouglasPeucker.simplify(&line, 0.001).unwrap();
        assert_eq!(simplified, coords(&[(0.0, 0.0), (3.0, 0.0)]));
    }

    #[test]
    fn test_keeps_significant_corner() {
        let line = coords(&[(0.0, 0.0), (1.0, 0.5), (2.0, 1.0), (3.0, 0.0), (4.0, 0.0)]);
        let simplified = DouglasPeucker.simplify(&line, 0.1).unwrap();
        assert_eq!(
            simplified,
            coords(&[(0.0, 0.0), (2.0, 1.0), (3.0, 0.0), (4.0, 0.0)])
        );
    }

    #[test]
    fn test_closed_ring_keeps_closing_point() {
        let ring = coords(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (2.0, 2.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ]);
        let simplified = DouglasPeucker.simplify(&ring, 0.1).unwrap();
        assert_eq!(simplified.first(), simplified.last());
        assert_eq!(
            simplified,
            coords(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)])
        );
    }

    #[test]
    fn test_large_tolerance_keeps_endpoints() {
        let line = coords(&[(0.0, 0.0), (1.0, 0.5), (2.0, -0.5), (3.0, 0.0)]);
        let simplified = DouglasPeucker.simplify(&line, 10.0).unwrap();
        assert_eq!(simplified, coords(&[(0.0, 0.0), (3.0, 0.0)]));
    }
}
