// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use approx::assert_relative_eq;
use longedge::geometry::util::{triangle_area, triangle_centroid};
use longedge::geometry::{Point, Point2, Point3};
use longedge::mesh_processing::{LongEdgeError, LongEdgeRemoval};
use rand::{Rng, SeedableRng};

fn assert_no_long_edges<const N: usize>(remover: &LongEdgeRemoval<f64, N>, max_length: f64) {
    for face in remover.faces().iter().filter(|f| !f.removed) {
        for (a, b) in face.edges() {
            let length = remover.vertices()[a].distance_to(&remover.vertices()[b]);
            assert!(
                length < max_length,
                "edge ({a}, {b}) has length {length}, limit {max_length}"
            );
        }
    }
}

/// Summed live-face area per input face.
fn area_by_source<const N: usize>(remover: &LongEdgeRemoval<f64, N>) -> Vec<f64> {
    let mut areas = vec![0.0; remover.input_face_count()];
    for face in remover.faces().iter().filter(|f| !f.removed) {
        let [a, b, c] = face.vertices;
        areas[face.source] += triangle_area(
            &remover.vertices()[a],
            &remover.vertices()[b],
            &remover.vertices()[c],
        );
    }
    areas
}

fn right_triangle() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    (
        vec![
            Point3::from_vals([0.0, 0.0, 0.0]),
            Point3::from_vals([1.0, 0.0, 0.0]),
            Point3::from_vals([0.0, 1.0, 0.0]),
        ],
        vec![[0, 1, 2]],
    )
}

fn unit_square() -> (Vec<Point2<f64>>, Vec<[usize; 3]>) {
    (
        vec![
            Point2::from_vals([0.0, 0.0]),
            Point2::from_vals([1.0, 0.0]),
            Point2::from_vals([0.0, 1.0]),
            Point2::from_vals([1.0, 1.0]),
        ],
        vec![[0, 1, 2], [2, 1, 3]],
    )
}

#[test]
fn test_single_triangle() {
    let (vertices, faces) = right_triangle();
    let mut remover = LongEdgeRemoval::new(vertices, faces).unwrap();
    remover.run(1.1).unwrap();

    // only the hypotenuse exceeds 1.1, one bisection suffices
    assert_eq!(remover.vertex_count(), 4);
    assert_eq!(remover.face_count(), 2);
    assert_eq!(remover.faces().len(), 2);
    assert_no_long_edges(&remover, 1.1);
}

#[test]
fn test_single_triangle_fine() {
    let (vertices, faces) = right_triangle();
    let mut remover = LongEdgeRemoval::new(vertices, faces).unwrap();
    remover.run(0.1).unwrap();

    assert_no_long_edges(&remover, 0.1);
    assert!(remover.vertex_count() > 4);
    assert_relative_eq!(area_by_source(&remover)[0], 0.5, epsilon = 1e-9);
}

#[test]
fn test_tall_triangle() {
    let vertices = vec![
        Point3::from_vals([0.0, 0.0, 0.0]),
        Point3::from_vals([1.0, 0.0, 0.0]),
        Point3::from_vals([0.0, 1.5, 0.0]),
    ];
    let mut remover = LongEdgeRemoval::new(vertices, vec![[0, 1, 2]]).unwrap();
    remover.run(0.9).unwrap();

    assert_no_long_edges(&remover, 0.9);
}

#[test]
fn test_square_provenance() {
    let (vertices, faces) = unit_square();
    let mut remover = LongEdgeRemoval::new(vertices, faces).unwrap();
    remover.run(0.1).unwrap();

    assert_no_long_edges(&remover, 0.1);

    let sources = remover.original_faces();
    assert_eq!(sources.len(), remover.faces().len());

    // input face 0 covers the half-plane below the diagonal, face 1 above
    for (face, &source) in remover.faces().iter().zip(sources.iter()) {
        let [a, b, c] = face.vertices;
        let centroid = triangle_centroid(
            &remover.vertices()[a],
            &remover.vertices()[b],
            &remover.vertices()[c],
        );
        let expected = if centroid[0] + centroid[1] < 1.0 { 0 } else { 1 };
        assert_eq!(source, expected, "centroid {:?}", centroid.coords);
    }
}

#[test]
fn test_provenance_partitions_area() {
    let (vertices, faces) = unit_square();
    let mut remover = LongEdgeRemoval::new(vertices, faces).unwrap();
    remover.run(0.1).unwrap();

    let areas = area_by_source(&remover);
    assert_relative_eq!(areas[0], 0.5, epsilon = 1e-9);
    assert_relative_eq!(areas[1], 0.5, epsilon = 1e-9);
}

#[test]
fn test_idempotence() {
    let (vertices, faces) = right_triangle();
    let mut remover = LongEdgeRemoval::new(vertices, faces).unwrap();
    remover.run(1.1).unwrap();

    let vertex_count = remover.vertex_count();
    let face_count = remover.face_count();

    remover.run(1.1).unwrap();
    assert_eq!(remover.vertex_count(), vertex_count);
    assert_eq!(remover.face_count(), face_count);

    remover.run(5.0).unwrap();
    assert_eq!(remover.vertex_count(), vertex_count);
    assert_eq!(remover.face_count(), face_count);
}

#[test]
fn test_no_split_below_threshold() {
    let (vertices, faces) = right_triangle();
    let mut remover = LongEdgeRemoval::new(vertices, faces).unwrap();
    remover.run(10.0).unwrap();

    assert_eq!(remover.vertex_count(), 3);
    assert_eq!(remover.face_count(), 1);
    assert_eq!(remover.original_faces(), vec![0]);
}

#[test]
fn test_accessors_before_run() {
    let (vertices, faces) = right_triangle();
    let remover = LongEdgeRemoval::new(vertices.clone(), faces).unwrap();

    assert_eq!(remover.vertices(), vertices.as_slice());
    assert_eq!(remover.faces()[0].vertices, [0, 1, 2]);
    assert_eq!(remover.original_faces(), vec![0]);
    assert_eq!(remover.input_face_count(), 1);
}

#[test]
fn test_empty_mesh() {
    let mut remover = LongEdgeRemoval::<f64, 3>::new(Vec::new(), Vec::new()).unwrap();
    remover.run(1.0).unwrap();

    assert_eq!(remover.vertex_count(), 0);
    assert_eq!(remover.face_count(), 0);
    assert!(remover.original_faces().is_empty());
}

#[test]
fn test_invalid_face_index() {
    let (vertices, _) = right_triangle();
    let err = LongEdgeRemoval::new(vertices, vec![[0, 1, 7]]).unwrap_err();
    assert_eq!(
        err,
        LongEdgeError::InvalidIndex {
            face: 0,
            corner: 2,
            vertex: 7,
            vertex_count: 3,
        }
    );
}

#[test]
fn test_rejects_bad_threshold() {
    let (vertices, faces) = right_triangle();
    let mut remover = LongEdgeRemoval::new(vertices, faces).unwrap();

    for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = remover.run(bad).unwrap_err();
        assert!(matches!(err, LongEdgeError::InvalidArgument { .. }), "{bad}");
    }

    // rejected before any mutation
    assert_eq!(remover.vertex_count(), 3);
    assert_eq!(remover.face_count(), 1);
}

#[test]
fn test_degenerate_triangle() {
    // two coincident corners: one zero-length edge, two long ones
    let vertices = vec![
        Point3::from_vals([0.0, 0.0, 0.0]),
        Point3::from_vals([0.0, 0.0, 0.0]),
        Point3::from_vals([2.0, 0.0, 0.0]),
    ];
    let mut remover = LongEdgeRemoval::new(vertices, vec![[0, 1, 2]]).unwrap();
    remover.run(0.6).unwrap();

    assert_no_long_edges(&remover, 0.6);
}

#[test]
fn test_random_soup() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x10e6);
    let max_length = 0.4;

    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut faces = Vec::new();
    for _ in 0..20 {
        let base = vertices.len();
        for _ in 0..3 {
            vertices.push(Point::new([
                rng.random_range(0.0..1.0),
                rng.random_range(0.0..1.0),
                rng.random_range(0.0..1.0),
            ]));
        }
        faces.push([base, base + 1, base + 2]);
    }

    let input_areas: Vec<f64> = faces
        .iter()
        .map(|&[a, b, c]| triangle_area(&vertices[a], &vertices[b], &vertices[c]))
        .collect();

    let mut remover = LongEdgeRemoval::new(vertices, faces).unwrap();
    remover.run(max_length).unwrap();

    assert_no_long_edges(&remover, max_length);

    let sources = remover.original_faces();
    assert_eq!(sources.len(), remover.face_count());
    assert!(sources.iter().all(|&s| s < remover.input_face_count()));

    for (source, area) in area_by_source(&remover).iter().enumerate() {
        assert_relative_eq!(*area, input_areas[source], epsilon = 1e-9);
    }
}
