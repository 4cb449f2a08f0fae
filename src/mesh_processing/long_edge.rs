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

use thiserror::Error;

use crate::{geometry::point::Point, mesh::face::Face, numeric::scalar::Scalar};

/// Passes allowed per unit of (longest input edge / max_length).
///
/// Longest-edge bisection needs on the order of 2*log2 of that ratio, so a
/// linear cap leaves ample slack before a run is declared divergent.
const CAP_MULTIPLIER: usize = 8;
const MIN_PASS_CAP: usize = 32;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LongEdgeError {
    #[error(
        "face {face} corner {corner} references vertex {vertex}, \
         but only {vertex_count} vertices exist"
    )]
    InvalidIndex {
        face: usize,
        corner: usize,
        vertex: usize,
        vertex_count: usize,
    },

    #[error("max_length must be positive and finite, got {max_length}")]
    InvalidArgument { max_length: f64 },

    #[error(
        "refinement did not converge after {passes} passes; \
         {} faces still carry a long edge", offending.len()
    )]
    ConvergenceFailure {
        passes: usize,
        offending: Vec<usize>,
    },
}

/// Splits every edge of length `>= max_length` until none remain.
///
/// Each offending face is bisected through the midpoint of its longest edge
/// and replaced by two children carrying the parent's `source`, so every
/// output face stays traceable to the input face it descends from. Faces are
/// refined independently: a long edge shared by two faces is split on each
/// side without welding the midpoints, matching per-face refinement rather
/// than a watertight contract.
#[derive(Debug, Clone)]
pub struct LongEdgeRemoval<T: Scalar, const N: usize> {
    vertices: Vec<Point<T, N>>,
    faces: Vec<Face>,
    input_face_count: usize,
}

impl<T: Scalar, const N: usize> LongEdgeRemoval<T, N> {
    /// Stores copies of the input and the identity provenance mapping.
    /// Rejects any face corner that indexes past the vertex buffer.
    pub fn new(
        vertices: Vec<Point<T, N>>,
        faces: Vec<[usize; 3]>,
    ) -> Result<Self, LongEdgeError> {
        for (face, tri) in faces.iter().enumerate() {
            for (corner, &vertex) in tri.iter().enumerate() {
                if vertex >= vertices.len() {
                    return Err(LongEdgeError::InvalidIndex {
                        face,
                        corner,
                        vertex,
                        vertex_count: vertices.len(),
                    });
                }
            }
        }
        let input_face_count = faces.len();
        let faces = faces
            .into_iter()
            .enumerate()
            .map(|(i, tri)| Face::new(tri, i))
            .collect();
        Ok(Self {
            vertices,
            faces,
            input_face_count,
        })
    }

    /// Refines until every live edge is strictly shorter than `max_length`.
    ///
    /// Re-scans all live faces each pass: a child created in one pass may
    /// itself carry a long edge and is picked up by the next scan. A second
    /// call with the same or a larger threshold finds nothing to split and
    /// returns immediately.
    pub fn run(&mut self, max_length: T) -> Result<(), LongEdgeError> {
        if !max_length.is_finite() || max_length <= T::zero() {
            return Err(LongEdgeError::InvalidArgument {
                max_length: max_length.as_f64(),
            });
        }
        let max2 = max_length * max_length;
        let cap = self.pass_cap(max_length);

        for _ in 0..cap {
            let offending = self.collect_offending(max2);
            if offending.is_empty() {
                self.compact();
                return Ok(());
            }
            for face in offending {
                self.bisect(face);
            }
        }

        // Buffers stay consistent on failure; report indices as the caller
        // will see them after compaction.
        self.compact();
        let offending = self.collect_offending(max2);
        if offending.is_empty() {
            // the final pass happened to finish the job
            return Ok(());
        }
        Err(LongEdgeError::ConvergenceFailure {
            passes: cap,
            offending,
        })
    }

    pub fn vertices(&self) -> &[Point<T, N>] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// One entry per live face: the index of the input face it descends from.
    pub fn original_faces(&self) -> Vec<usize> {
        self.faces
            .iter()
            .filter(|f| !f.removed)
            .map(|f| f.source)
            .collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.iter().filter(|f| !f.removed).count()
    }

    pub fn input_face_count(&self) -> usize {
        self.input_face_count
    }

    fn edge_length2(&self, a: usize, b: usize) -> T {
        self.vertices[a].vector_to(&self.vertices[b]).norm2()
    }

    /// Edge slot and squared length of the longest edge; ties go to the
    /// first slot in winding order.
    fn longest_edge(&self, face: &Face) -> (usize, T) {
        let edges = face.edges();
        let mut best_slot = 0;
        let mut best = self.edge_length2(edges[0].0, edges[0].1);
        for (slot, &(a, b)) in edges.iter().enumerate().skip(1) {
            let l2 = self.edge_length2(a, b);
            if l2 > best {
                best_slot = slot;
                best = l2;
            }
        }
        (best_slot, best)
    }

    fn collect_offending(&self, max2: T) -> Vec<usize> {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.removed && self.longest_edge(f).1 >= max2)
            .map(|(i, _)| i)
            .collect()
    }

    /// Replaces face `f` by two children split through the midpoint of its
    /// longest edge. Winding and provenance carry over; the parent slot is
    /// only marked, never reused, so indices collected earlier stay valid.
    fn bisect(&mut self, f: usize) {
        let face = self.faces[f];
        let (slot, _) = self.longest_edge(&face);
        let (a, b) = face.edges()[slot];
        let c = face.opposite(slot);

        let mid = self.vertices[a].midpoint(&self.vertices[b]);
        let m = self.vertices.len();
        self.vertices.push(mid);

        self.faces[f].removed = true;
        self.faces.push(Face::new([a, m, c], face.source));
        self.faces.push(Face::new([m, b, c], face.source));
    }

    /// Physically drops superseded faces once no pass is iterating.
    fn compact(&mut self) {
        self.faces.retain(|f| !f.removed);
    }

    fn pass_cap(&self, max_length: T) -> usize {
        let longest2 = self
            .faces
            .iter()
            .filter(|f| !f.removed)
            .map(|f| self.longest_edge(f).1)
            .fold(T::zero(), T::max);
        let ratio = (longest2.sqrt() / max_length).as_f64();
        if !ratio.is_finite() || ratio <= 1.0 {
            return MIN_PASS_CAP;
        }
        (ratio.ceil() as usize)
            .saturating_mul(CAP_MULTIPLIER)
            .max(MIN_PASS_CAP)
    }
}
