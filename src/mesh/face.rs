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

/// Triangle face stored in a growable arena.
///
/// `vertices` index into the owning vertex buffer in winding order.
/// `source` is the index of the face's ultimate ancestor among the input
/// faces, already flattened at split time so lookups never walk a chain.
/// Superseded faces stay in the arena with `removed` set, which keeps face
/// indices stable while a refinement pass iterates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Face {
    pub vertices: [usize; 3],
    pub source: usize,
    pub removed: bool,
}

impl Face {
    pub fn new(vertices: [usize; 3], source: usize) -> Self {
        Face {
            vertices,
            source,
            removed: false,
        }
    }

    /// The three directed edges in winding order.
    pub fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.vertices;
        [(a, b), (b, c), (c, a)]
    }

    /// The vertex not touched by edge slot `edge`.
    pub fn opposite(&self, edge: usize) -> usize {
        self.vertices[(edge + 2) % 3]
    }
}
