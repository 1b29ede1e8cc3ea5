//! Integration-style test suite, mirroring the teacher's own `src/tests/`
//! directory: end-to-end scenario tests live here rather than as inline
//! `#[cfg(test)]` modules, since they span several components at once.

mod lemon_spiral_and_runaway;
mod repossession;
