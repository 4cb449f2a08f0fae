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

use std::fmt::Debug;

use num_traits::{Float, FromPrimitive, ToPrimitive};

/// Coordinate scalar for mesh geometry.
///
/// Refinement only ever forms linear combinations, squared lengths and
/// square roots, so an inexact floating type is sufficient.
pub trait Scalar: Float + FromPrimitive + ToPrimitive + Default + Debug + 'static {
    fn from_num_den(num: i32, den: i32) -> Self;

    /// Widen to f64 for diagnostics. Infallible for the provided impls.
    fn as_f64(&self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

impl Scalar for f32 {
    fn from_num_den(num: i32, den: i32) -> Self {
        num as f32 / den as f32
    }
}

impl Scalar for f64 {
    fn from_num_den(num: i32, den: i32) -> Self {
        num as f64 / den as f64
    }
}
