//! Wire shapes exchanged with the exam backend.

pub mod exam;
