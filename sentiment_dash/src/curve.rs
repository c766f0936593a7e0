//! Smoothed polylines for area fills and lines.
//!
//! Both curves emit sampled points rather than bezier commands so the
//! painter can fill them with plain triangles. Sampling is a pure function of
//! the input x coordinates, so two curves over the same x values (stack
//! baseline and topline) come back with matching sample x positions.

use egui::Pos2;

pub const SEGMENT_STEPS: usize = 8;

fn cubic(out: &mut Vec<Pos2>, p0: Pos2, c1: Pos2, c2: Pos2, p3: Pos2, steps: usize) {
    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        let u = 1.0 - t;
        let a = u * u * u;
        let b = 3.0 * u * u * t;
        let c = 3.0 * u * t * t;
        let d = t * t * t;
        out.push(Pos2::new(
            a * p0.x + b * c1.x + c * c2.x + d * p3.x,
            a * p0.y + b * c1.y + c * c2.y + d * p3.y,
        ));
    }
}

/// Uniform B-spline through the points' hull; only the end points are hit.
pub fn basis(points: &[Pos2], steps: usize) -> Vec<Pos2> {
    match points.len() {
        0 => return Vec::new(),
        1 | 2 => return points.to_vec(),
        _ => {}
    }
    let steps = steps.max(1);
    let n = points.len();
    let mut out = Vec::with_capacity(n * steps + 2);

    let p0 = points[0];
    let p1 = points[1];
    out.push(p0);
    out.push(Pos2::new((5.0 * p0.x + p1.x) / 6.0, (5.0 * p0.y + p1.y) / 6.0));

    let segment = |out: &mut Vec<Pos2>, a: Pos2, b: Pos2, c: Pos2| {
        let start = out[out.len() - 1];
        let c1 = Pos2::new((2.0 * a.x + b.x) / 3.0, (2.0 * a.y + b.y) / 3.0);
        let c2 = Pos2::new((a.x + 2.0 * b.x) / 3.0, (a.y + 2.0 * b.y) / 3.0);
        let end = Pos2::new((a.x + 4.0 * b.x + c.x) / 6.0, (a.y + 4.0 * b.y + c.y) / 6.0);
        cubic(out, start, c1, c2, end, steps);
    };

    for k in 2..n {
        segment(&mut out, points[k - 2], points[k - 1], points[k]);
    }
    let last = points[n - 1];
    segment(&mut out, points[n - 2], last, last);
    out.push(last);
    out
}

fn sign(v: f32) -> f32 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

fn slope3(p0: Pos2, p1: Pos2, p2: Pos2) -> f32 {
    let h0 = p1.x - p0.x;
    let h1 = p2.x - p1.x;
    let s0 = (p1.y - p0.y) / h0;
    let s1 = (p2.y - p1.y) / h1;
    let p = (s0 * h1 + s1 * h0) / (h0 + h1);
    let v = (sign(s0) + sign(s1)) * s0.abs().min(s1.abs()).min(0.5 * p.abs());
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn slope2(p0: Pos2, p1: Pos2, t: f32) -> f32 {
    let h = p1.x - p0.x;
    if h != 0.0 {
        (3.0 * (p1.y - p0.y) / h - t) / 2.0
    } else {
        t
    }
}

fn hermite(out: &mut Vec<Pos2>, p0: Pos2, p1: Pos2, t0: f32, t1: f32, steps: usize) {
    let dx = (p1.x - p0.x) / 3.0;
    cubic(
        out,
        p0,
        Pos2::new(p0.x + dx, p0.y + dx * t0),
        Pos2::new(p1.x - dx, p1.y - dx * t1),
        p1,
        steps,
    );
}

/// Monotone cubic interpolation in x: passes through every point and never
/// overshoots between two of them.
pub fn monotone_x(points: &[Pos2], steps: usize) -> Vec<Pos2> {
    let steps = steps.max(1);
    let mut out = Vec::with_capacity(points.len() * steps + 1);

    let mut seen = 0usize;
    let mut p0 = Pos2::ZERO;
    let mut p1 = Pos2::ZERO;
    let mut t0 = 0.0f32;

    for &p in points {
        if seen > 0 && p == p1 {
            continue;
        }
        let mut t1 = t0;
        match seen {
            0 => out.push(p),
            1 => {}
            2 => {
                t1 = slope3(p0, p1, p);
                hermite(&mut out, p0, p1, slope2(p0, p1, t1), t1, steps);
            }
            _ => {
                t1 = slope3(p0, p1, p);
                hermite(&mut out, p0, p1, t0, t1, steps);
            }
        }
        seen = (seen + 1).min(3);
        p0 = p1;
        p1 = p;
        t0 = t1;
    }

    match seen {
        2 => out.push(p1),
        3 => hermite(&mut out, p0, p1, t0, slope2(p0, p1, t0), steps),
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(v: &[(f32, f32)]) -> Vec<Pos2> {
        v.iter().map(|&(x, y)| Pos2::new(x, y)).collect()
    }

    #[test]
    fn short_inputs_pass_through() {
        assert!(basis(&[], 8).is_empty());
        let two = pts(&[(0.0, 0.0), (10.0, 5.0)]);
        assert_eq!(basis(&two, 8), two);
        assert_eq!(monotone_x(&two, 8), two);
    }

    #[test]
    fn basis_keeps_endpoints_and_x_order() {
        let input = pts(&[(0.0, 0.0), (10.0, 10.0), (20.0, 0.0), (30.0, 10.0)]);
        let out = basis(&input, 8);
        assert_eq!(out.first(), input.first());
        assert_eq!(out.last(), input.last());
        for w in out.windows(2) {
            assert!(w[1].x >= w[0].x - 1e-4);
        }
    }

    #[test]
    fn basis_samples_align_for_shared_x() {
        let top = pts(&[(0.0, 5.0), (10.0, 9.0), (20.0, 4.0), (30.0, 7.0)]);
        let bot = pts(&[(0.0, 1.0), (10.0, 2.0), (20.0, 0.0), (30.0, 3.0)]);
        let a = basis(&top, 6);
        let b = basis(&bot, 6);
        assert_eq!(a.len(), b.len());
        for (p, q) in a.iter().zip(&b) {
            assert!((p.x - q.x).abs() < 1e-4);
        }
    }

    #[test]
    fn monotone_hits_every_point_without_overshoot() {
        let input = pts(&[(0.0, 0.0), (10.0, 1.0), (20.0, 8.0), (30.0, 8.0), (40.0, 9.0)]);
        let out = monotone_x(&input, 8);
        for p in &input {
            assert!(out.iter().any(|q| (q.x - p.x).abs() < 1e-3 && (q.y - p.y).abs() < 1e-3));
        }
        for w in out.windows(2) {
            assert!(w[1].y >= w[0].y - 1e-3, "dips between {:?} and {:?}", w[0], w[1]);
        }
    }

    #[test]
    fn monotone_skips_repeated_points() {
        let input = pts(&[(0.0, 0.0), (0.0, 0.0), (10.0, 2.0)]);
        assert_eq!(monotone_x(&input, 8), pts(&[(0.0, 0.0), (10.0, 2.0)]));
    }
}
