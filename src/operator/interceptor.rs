use super::grouper::ShardGroup;
use crate::core::Result;
use std::sync::Arc;

/// Inspects the grouped batch before anything is sent to a backend.
///
/// Returning an error aborts the invocation; no group is dispatched.
pub trait BatchInterceptor: Send + Sync {
    fn name(&self) -> &str;

    fn before_dispatch(&self, groups: &[ShardGroup]) -> Result<()>;
}

/// Interceptors run in registration order.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn BatchInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, interceptor: Arc<dyn BatchInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn intercept(&self, groups: &[ShardGroup]) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.before_dispatch(groups)?;
        }
        Ok(())
    }

    pub fn list_interceptors(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DbError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingInterceptor {
        seen: AtomicUsize,
    }

    impl BatchInterceptor for CountingInterceptor {
        fn name(&self) -> &str {
            "counting"
        }

        fn before_dispatch(&self, groups: &[ShardGroup]) -> Result<()> {
            self.seen.fetch_add(groups.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    struct Deny;

    impl BatchInterceptor for Deny {
        fn name(&self) -> &str {
            "deny"
        }

        fn before_dispatch(&self, _groups: &[ShardGroup]) -> Result<()> {
            Err(DbError::UnsupportedOperation("writes are frozen".into()))
        }
    }

    #[test]
    fn test_chain_runs_in_order_and_stops_on_error() {
        let counting = Arc::new(CountingInterceptor {
            seen: AtomicUsize::new(0),
        });
        let mut chain = InterceptorChain::new();
        assert!(chain.is_empty());
        chain.register(counting.clone());
        chain.register(Arc::new(Deny));
        chain.register(counting.clone());

        assert_eq!(chain.list_interceptors(), vec!["counting", "deny", "counting"]);
        assert!(chain.intercept(&[]).is_err());
        // the second counting interceptor never ran
        assert_eq!(counting.seen.load(Ordering::SeqCst), 0);
    }
}
