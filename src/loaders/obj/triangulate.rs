use crate::options::TriangulationMethod;

use super::types::{CornerIndex, Real};

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriangulationOutcome {
    Clipped(Vec<[usize; 3]>),
    FallbackFan,
}

#[derive(Clone, Copy)]
struct Point2 {
    x: f64,
    y: f64,
}

type Point3 = [f64; 3];

/// Corner triples `(0, i, i + 1)` for an `n`-gon; empty below three corners.
pub fn fan_triangulate(n: usize) -> Vec<[usize; 3]> {
    (1..n.saturating_sub(1)).map(|i| [0, i, i + 1]).collect()
}

/// Splits a polygon into corner triples local to `corners`.
pub fn triangulate(
    corners: &[CornerIndex],
    vertices: &[Real],
    method: TriangulationMethod,
) -> Vec<[usize; 3]> {
    match method {
        TriangulationMethod::Fan => fan_triangulate(corners.len()),
        TriangulationMethod::EarClip if corners.len() == 3 => fan_triangulate(3),
        TriangulationMethod::EarClip => match ear_clip_face(corners, vertices) {
            TriangulationOutcome::Clipped(triangles) => triangles,
            TriangulationOutcome::FallbackFan => fan_triangulate(corners.len()),
        },
    }
}

fn position(vertices: &[Real], corner: &CornerIndex) -> Point3 {
    let i = corner.vertex_index * 3;
    [
        f64::from(vertices[i]),
        f64::from(vertices[i + 1]),
        f64::from(vertices[i + 2]),
    ]
}

/// Ear clipping on the polygon's dominant plane.
///
/// Triangles are positions in `corners`, not vertex indices; callers map
/// them back through `corners[i]`.
///
/// Consecutive duplicate positions are dropped first. Degenerate,
/// self-intersecting or unclippable polygons report `FallbackFan`.
pub fn ear_clip_face(corners: &[CornerIndex], vertices: &[Real]) -> TriangulationOutcome {
    if corners.len() < 3 {
        return TriangulationOutcome::FallbackFan;
    }

    let mut kept: Vec<usize> = Vec::with_capacity(corners.len());
    for (corner, index) in corners.iter().enumerate() {
        let current = position(vertices, index);
        let repeats_previous = kept
            .last()
            .is_some_and(|&prev| nearly_equal3(current, position(vertices, &corners[prev])));
        if !repeats_previous {
            kept.push(corner);
        }
    }

    if let [first, .., last] = kept[..] {
        if nearly_equal3(
            position(vertices, &corners[first]),
            position(vertices, &corners[last]),
        ) {
            kept.pop();
        }
    }

    if kept.len() < 3 {
        return TriangulationOutcome::FallbackFan;
    }

    let points: Vec<Point3> = kept
        .iter()
        .map(|&corner| position(vertices, &corners[corner]))
        .collect();

    let normal = newell_normal(&points);
    if dot(normal, normal) <= EPSILON {
        return TriangulationOutcome::FallbackFan;
    }

    let projected = project_to_plane(&points, normal);
    let area = signed_area(&projected);
    if area.abs() <= EPSILON || has_self_intersections(&projected) {
        return TriangulationOutcome::FallbackFan;
    }

    match clip_ears(&projected, area > 0.0) {
        Some(triangles) => TriangulationOutcome::Clipped(
            triangles
                .into_iter()
                .map(|[a, b, c]| [kept[a], kept[b], kept[c]])
                .collect(),
        ),
        None => TriangulationOutcome::FallbackFan,
    }
}

fn dot(a: Point3, b: Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn nearly_equal3(a: Point3, b: Point3) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= EPSILON)
}

fn newell_normal(points: &[Point3]) -> Point3 {
    let mut normal = [0.0; 3];
    for (i, current) in points.iter().enumerate() {
        let next = points[(i + 1) % points.len()];
        normal[0] += (current[1] - next[1]) * (current[2] + next[2]);
        normal[1] += (current[2] - next[2]) * (current[0] + next[0]);
        normal[2] += (current[0] - next[0]) * (current[1] + next[1]);
    }
    normal
}

// Drops the axis where the normal is largest.
fn project_to_plane(points: &[Point3], normal: Point3) -> Vec<Point2> {
    let [ax, ay, az] = normal.map(f64::abs);
    let (u, v) = if ax >= ay && ax >= az {
        (1, 2)
    } else if ay >= az {
        (0, 2)
    } else {
        (0, 1)
    };
    points
        .iter()
        .map(|p| Point2 { x: p[u], y: p[v] })
        .collect()
}

fn signed_area(points: &[Point2]) -> f64 {
    let doubled: f64 = (0..points.len())
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            a.x * b.y - b.x * a.y
        })
        .sum();
    0.5 * doubled
}

fn has_self_intersections(points: &[Point2]) -> bool {
    let len = points.len();
    for i in 0..len {
        let i_next = (i + 1) % len;
        for j in (i + 1)..len {
            let j_next = (j + 1) % len;
            let adjacent = i_next == j || j_next == i;
            if adjacent {
                continue;
            }
            if segments_intersect(points[i], points[i_next], points[j], points[j_next]) {
                return true;
            }
        }
    }
    false
}

fn segments_intersect(a: Point2, b: Point2, c: Point2, d: Point2) -> bool {
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);

    let straddles = |p: f64, q: f64| (p > EPSILON && q < -EPSILON) || (p < -EPSILON && q > EPSILON);
    if straddles(o1, o2) && straddles(o3, o4) {
        return true;
    }

    (o1.abs() <= EPSILON && on_segment(a, b, c))
        || (o2.abs() <= EPSILON && on_segment(a, b, d))
        || (o3.abs() <= EPSILON && on_segment(c, d, a))
        || (o4.abs() <= EPSILON && on_segment(c, d, b))
}

fn on_segment(a: Point2, b: Point2, p: Point2) -> bool {
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

fn orient(a: Point2, b: Point2, c: Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn clip_ears(points: &[Point2], counter_clockwise: bool) -> Option<Vec<[usize; 3]>> {
    let mut remaining: Vec<usize> = (0..points.len()).collect();
    let mut triangles = Vec::with_capacity(points.len() - 2);

    while remaining.len() > 3 {
        let len = remaining.len();
        let ear = (0..len).find(|&i| {
            let prev = remaining[(i + len - 1) % len];
            let curr = remaining[i];
            let next = remaining[(i + 1) % len];
            let (a, b, c) = (points[prev], points[curr], points[next]);

            let turn = orient(a, b, c);
            let convex = if counter_clockwise {
                turn > EPSILON
            } else {
                turn < -EPSILON
            };

            convex
                && remaining
                    .iter()
                    .filter(|&&other| other != prev && other != curr && other != next)
                    .all(|&other| !point_in_triangle(points[other], a, b, c))
        })?;

        triangles.push([
            remaining[(ear + len - 1) % len],
            remaining[ear],
            remaining[(ear + 1) % len],
        ]);
        remaining.remove(ear);
    }

    triangles.push([remaining[0], remaining[1], remaining[2]]);
    Some(triangles)
}

fn point_in_triangle(p: Point2, a: Point2, b: Point2, c: Point2) -> bool {
    let d1 = orient(p, a, b);
    let d2 = orient(p, b, c);
    let d3 = orient(p, c, a);

    let has_neg = d1 < -EPSILON || d2 < -EPSILON || d3 < -EPSILON;
    let has_pos = d1 > EPSILON || d2 > EPSILON || d3 > EPSILON;

    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{ear_clip_face, fan_triangulate, triangulate, TriangulationOutcome};
    use crate::loaders::obj::types::{CornerIndex, Real};
    use crate::options::TriangulationMethod;

    fn face(indices: &[usize]) -> Vec<CornerIndex> {
        indices.iter().map(|&i| CornerIndex::vertex(i)).collect()
    }

    fn flat(points: &[[Real; 3]]) -> Vec<Real> {
        points.iter().flatten().copied().collect()
    }

    #[test]
    fn fan_of_a_quad() {
        assert_eq!(fan_triangulate(4), vec![[0, 1, 2], [0, 2, 3]]);
        assert!(fan_triangulate(2).is_empty());
    }

    #[test]
    fn clips_a_concave_polygon() {
        let vertices = flat(&[
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 1.0, 0.0],
            [1.0, 0.4, 0.0],
            [0.0, 1.0, 0.0],
        ]);

        match ear_clip_face(&face(&[0, 1, 2, 3, 4]), &vertices) {
            TriangulationOutcome::Clipped(triangles) => assert_eq!(triangles.len(), 3),
            TriangulationOutcome::FallbackFan => panic!("expected ear clipping to succeed"),
        }
    }

    #[test]
    fn clips_a_noncoplanar_quad() {
        let vertices = flat(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.2],
            [0.0, 1.0, 0.0],
        ]);

        match ear_clip_face(&face(&[0, 1, 2, 3]), &vertices) {
            TriangulationOutcome::Clipped(triangles) => assert_eq!(triangles.len(), 2),
            TriangulationOutcome::FallbackFan => panic!("expected ear clipping to succeed"),
        }
    }

    #[test]
    fn self_intersecting_polygon_falls_back_to_the_fan() {
        let vertices = flat(&[
            [0.0, 0.0, 0.0],
            [2.0, 2.0, 0.0],
            [0.0, 2.0, 0.0],
            [2.0, 0.0, 0.0],
        ]);
        let corners = face(&[0, 1, 2, 3]);

        assert_eq!(
            ear_clip_face(&corners, &vertices),
            TriangulationOutcome::FallbackFan
        );
        assert_eq!(
            triangulate(&corners, &vertices, TriangulationMethod::EarClip),
            fan_triangulate(4)
        );
    }

    #[test]
    fn duplicate_corners_are_skipped_before_clipping() {
        let vertices = flat(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]);

        match ear_clip_face(&face(&[0, 1, 1, 2, 3]), &vertices) {
            TriangulationOutcome::Clipped(triangles) => {
                assert_eq!(triangles.len(), 2);
                assert!(triangles.iter().flatten().all(|&corner| corner != 2));
            }
            TriangulationOutcome::FallbackFan => panic!("expected ear clipping to succeed"),
        }
    }

    proptest! {
        #[test]
        fn fan_yields_n_minus_two_triangles(n in 3usize..64) {
            let triangles = fan_triangulate(n);
            prop_assert_eq!(triangles.len(), n - 2);
            prop_assert!(triangles.iter().all(|t| t[0] == 0 && t[2] == t[1] + 1));
        }
    }
}
