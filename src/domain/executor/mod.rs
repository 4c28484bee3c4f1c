//! Executor contract, cancellation and registry

mod cancel;
mod contract;
mod registry;

pub use cancel::{cancellation_pair, CancellationHandle, CancellationSignal};
pub use contract::{
    ConfigField, ExecutionContext, ExecutorOutcome, StepExecutor, ValidationReport,
};
pub use registry::{ExecutorInfo, ExecutorRegistry};

#[cfg(test)]
pub use contract::mock::MockExecutor;
