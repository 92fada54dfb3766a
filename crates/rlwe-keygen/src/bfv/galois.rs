//! Galois elements of the cyclotomic ring

use crate::{Error, Result};
use itertools::Itertools;
use rlwe_util::ilog2;

/// Generator of the rotation subgroup of the Galois group, of order
/// `degree / 2`.
const GENERATOR: u64 = 3;

/// Maps rotation steps to elements of the Galois group of the cyclotomic ring
/// of degree `n`, the odd integers modulo `2 * n`.
///
/// A step rotates the plaintext rows by that many slots; the element
/// `2 * n - 1` exchanges the two rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaloisTool {
    degree: usize,
}

impl GaloisTool {
    /// Creates a tool for the ring of the given degree.
    pub(crate) fn new(degree: usize) -> Self {
        debug_assert!(degree.is_power_of_two() && degree >= 8);
        Self { degree }
    }

    /// Computes the exponent-th power of the generator modulo `2 * degree`.
    fn power_of_generator(&self, exponent: u64) -> u64 {
        let mask = 2 * self.degree as u64 - 1;
        let mut element = 1u64;
        for _ in 0..exponent {
            element = (element * GENERATOR) & mask;
        }
        element
    }

    /// Returns the Galois element corresponding to a rotation step.
    ///
    /// A zero step maps to the identity element 1. Steps whose magnitude
    /// reaches `degree / 2` wrap the row and are rejected.
    pub fn element_from_step(&self, step: i64) -> Result<u64> {
        if step == 0 {
            return Ok(1);
        }

        let half = (self.degree / 2) as u64;
        let magnitude = step.unsigned_abs();
        if magnitude >= half {
            return Err(Error::InvalidRotationStep(step));
        }

        if step > 0 {
            Ok(self.power_of_generator(magnitude))
        } else {
            Ok(self.power_of_generator(half - magnitude))
        }
    }

    /// Returns the Galois elements corresponding to the rotation steps.
    pub fn elements_from_steps(&self, steps: &[i64]) -> Result<Vec<u64>> {
        steps
            .iter()
            .map(|step| self.element_from_step(*step))
            .collect()
    }

    /// Returns the row-exchange element followed by the elements of all
    /// power-of-two rotations in both directions, without duplicates.
    pub fn all_elements(&self) -> Vec<u64> {
        let half = (self.degree / 2) as u64;
        let mut elements = vec![2 * self.degree as u64 - 1];
        for j in 0..ilog2(self.degree) - 1 {
            elements.push(self.power_of_generator(1 << j));
            elements.push(self.power_of_generator(half - (1 << j)));
        }
        elements.into_iter().unique().collect_vec()
    }

    /// Returns whether the element belongs to the Galois group.
    pub fn is_valid_element(&self, element: u64) -> bool {
        element & 1 == 1 && element < 2 * self.degree as u64
    }
}
