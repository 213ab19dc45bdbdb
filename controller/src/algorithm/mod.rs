pub mod builtin;
pub mod registry;
pub mod runtime;
pub mod traits;

pub use registry::{AlgorithmFactory, AlgorithmRegistry, CallFuture, Entry, TickFn};
pub use runtime::AlgorithmRuntime;
pub use traits::{Algorithm, AlgorithmBase, AlgorithmError, Result, TickOutput};
