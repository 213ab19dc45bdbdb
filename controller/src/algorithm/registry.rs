use crate::{
    algorithm::{
        builtin,
        traits::{Algorithm, AlgorithmBase, Result},
    },
    errors::DispatchError,
    strategy::Context,
};
use log::warn;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type AlgorithmFactory = Arc<dyn Fn(AlgorithmBase) -> Box<dyn Algorithm> + Send + Sync>;
pub type CallFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;
pub type TickFn = Arc<dyn Fn(Context) -> CallFuture + Send + Sync>;

/// 注册表条目：带生命周期的算法，或直接以Context调用的函数
#[derive(Clone)]
pub enum Entry {
    Lifecycle(AlgorithmFactory),
    Callable(TickFn),
}

/// 执行器注册表，启动时填充，键为 "<module>.<entry>"
#[derive(Default)]
pub struct AlgorithmRegistry {
    entries: HashMap<String, Entry>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    pub fn key(module: &str, entry: &str) -> String {
        format!("{}.{}", module, entry)
    }

    fn insert(&mut self, module: &str, entry: &str, value: Entry) -> &mut Self {
        let key = Self::key(module, entry);
        if self.entries.insert(key.clone(), value).is_some() {
            warn!("executor '{}' registered twice, keeping the latest", key);
        }
        self
    }

    pub fn register_algorithm<F, A>(&mut self, module: &str, entry: &str, constructor: F) -> &mut Self
    where
        F: Fn(AlgorithmBase) -> A + Send + Sync + 'static,
        A: Algorithm + 'static,
    {
        let factory: AlgorithmFactory =
            Arc::new(move |base: AlgorithmBase| -> Box<dyn Algorithm> { Box::new(constructor(base)) });
        self.insert(module, entry, Entry::Lifecycle(factory))
    }

    /// 同步函数，直接返回结果
    pub fn register_fn<F>(&mut self, module: &str, entry: &str, f: F) -> &mut Self
    where
        F: Fn(&Context) -> Result<Value> + Send + Sync + 'static,
    {
        let call: TickFn = Arc::new(move |context: Context| {
            let out = f(&context);
            Box::pin(async move { out }) as CallFuture
        });
        self.insert(module, entry, Entry::Callable(call))
    }

    /// 异步函数，结果需要await
    pub fn register_async_fn<F, Fut>(&mut self, module: &str, entry: &str, f: F) -> &mut Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let call: TickFn = Arc::new(move |context: Context| Box::pin(f(context)) as CallFuture);
        self.insert(module, entry, Entry::Callable(call))
    }

    pub fn resolve(&self, module: &str, entry: &str) -> std::result::Result<Entry, DispatchError> {
        let key = Self::key(module, entry);
        self.entries
            .get(&key)
            .cloned()
            .ok_or(DispatchError::Resolution { key })
    }

    pub fn contains(&self, module: &str, entry: &str) -> bool {
        self.entries.contains_key(&Self::key(module, entry))
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
