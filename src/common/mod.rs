//! Numeric helpers shared by indicators and alert conditions.

pub mod math;
