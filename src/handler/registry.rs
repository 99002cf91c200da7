//! 处理器注册表
//!
//! 方法全名 -> 处理器构造函数。新增被监控方法只需要注册，不需要改动拦截器。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{CallHandler, ExecuteHandler, LoggingHandler, TypedHandler, WatchHandler};
use crate::call::MethodDescriptor;

/// `Execution/Execute` 方法全名
pub const EXECUTE_METHOD: &str = "google.devtools.remoteexecution.v1test.Execution/Execute";

/// `Watcher/Watch` 方法全名
pub const WATCH_METHOD: &str = "google.watcher.v1.Watcher/Watch";

/// 处理器构造函数，每个调用调用一次
pub type HandlerFactory = Arc<dyn Fn() -> Box<dyn LoggingHandler> + Send + Sync>;

/// 处理器注册表
#[derive(Clone)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// 创建包含内置处理器（Execute、Watch）的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register::<ExecuteHandler>(EXECUTE_METHOD);
        registry.register::<WatchHandler>(WATCH_METHOD);
        registry
    }

    /// 为方法注册可默认构造的处理器，已有注册会被覆盖
    pub fn register<H>(&mut self, method: impl Into<String>) -> &mut Self
    where
        H: CallHandler + Default,
    {
        self.register_with(method, || TypedHandler::boxed(H::default()))
    }

    /// 以自定义构造函数注册处理器
    pub fn register_with<F>(&mut self, method: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn LoggingHandler> + Send + Sync + 'static,
    {
        self.factories.insert(method.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, method: &str) -> bool {
        self.factories.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// 为调用选择处理器；未注册的方法返回 `None`
    pub fn select(&self, method: &MethodDescriptor) -> Option<Box<dyn LoggingHandler>> {
        self.factories
            .get(method.full_name())
            .map(|factory| factory())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("methods", &methods)
            .finish()
    }
}
