pub mod context;
pub mod descriptor;

pub use context::{
    merged_params, process_env, resolve_secret, Context, ContextBuilder, ContextDefaults,
    EnvLookup,
};
pub use descriptor::{
    ExecutorSpec, HttpMethod, HttpSpec, Params, Secrets, StrategyDescriptor,
};
