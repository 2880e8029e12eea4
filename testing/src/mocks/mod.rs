//! Mock implementations of the injected dependencies.

pub mod storage;
pub mod transport;
