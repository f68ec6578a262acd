//! Per-curve resolution of K and b.
//!
//! Each symbol has one [`ParamSpec`] for the whole run. A cyclic spec hands
//! out one value per non-reference curve, in processing order, wrapping
//! around when curves outnumber values. The reference curve never consumes a
//! value.
//!
//! The fit and the summary both read the same materialized assignment list
//! (see [`ParameterSource::resolve_assignments`]), so the cycle is walked
//! exactly once per run.

use crate::domain::{ParamAssignment, ParamSpec, ParamValue};
use crate::error::FitError;

#[derive(Debug, Clone)]
pub struct ParameterSource {
    k: ParamSpec,
    b: ParamSpec,
    k_cursor: usize,
    b_cursor: usize,
}

impl ParameterSource {
    pub fn new(k: ParamSpec, b: ParamSpec) -> Result<Self, FitError> {
        if matches!(&k, ParamSpec::Cyclic(v) if v.is_empty()) {
            return Err(FitError::EmptyCycle { symbol: "K" });
        }
        if matches!(&b, ParamSpec::Cyclic(v) if v.is_empty()) {
            return Err(FitError::EmptyCycle { symbol: "b" });
        }
        Ok(Self {
            k,
            b,
            k_cursor: 0,
            b_cursor: 0,
        })
    }

    pub fn k_spec(&self) -> &ParamSpec {
        &self.k
    }

    pub fn b_spec(&self) -> &ParamSpec {
        &self.b
    }

    /// Restart every cycle from its first element.
    pub fn reset(&mut self) {
        self.k_cursor = 0;
        self.b_cursor = 0;
    }

    /// Values for the next curve in processing order.
    ///
    /// Returns `None` for the reference and leaves the cycles untouched.
    pub fn next_for(&mut self, is_reference: bool) -> Option<ParamAssignment> {
        if is_reference {
            return None;
        }
        let k = take(&self.k, &mut self.k_cursor);
        let b = take(&self.b, &mut self.b_cursor);
        Some(ParamAssignment { k, b })
    }

    /// Materialize assignments for `count` curves, `None` at `reference_idx`.
    ///
    /// Starts from a fresh cycle so repeated calls give the same list.
    pub fn resolve_assignments(&mut self, count: usize, reference_idx: usize) -> Vec<Option<ParamAssignment>> {
        self.reset();
        (0..count).map(|idx| self.next_for(idx == reference_idx)).collect()
    }
}

fn take(spec: &ParamSpec, cursor: &mut usize) -> ParamValue {
    match spec {
        ParamSpec::Free => ParamValue::Free,
        ParamSpec::Fixed(v) => ParamValue::Given(*v),
        ParamSpec::Cyclic(values) => {
            let v = values[*cursor % values.len()];
            *cursor += 1;
            ParamValue::Given(v)
        }
    }
}
