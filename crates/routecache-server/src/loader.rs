//! Fresh-data loaders.

use async_trait::async_trait;

/// Produces the value for an address on a cache miss.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, address: &str) -> anyhow::Result<String>;
}

/// Loader returning the same body for every address.
#[derive(Debug, Clone)]
pub struct StaticLoader {
    body: String,
}

impl StaticLoader {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

impl Default for StaticLoader {
    fn default() -> Self {
        Self::new("fresh data")
    }
}

#[async_trait]
impl Loader for StaticLoader {
    async fn load(&self, _address: &str) -> anyhow::Result<String> {
        Ok(self.body.clone())
    }
}

/// Loader backed by an async closure.
pub struct FnLoader<F>(pub F);

#[async_trait]
impl<F, Fut> Loader for FnLoader<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<String>> + Send + 'static,
{
    async fn load(&self, address: &str) -> anyhow::Result<String> {
        (self.0)(address.to_string()).await
    }
}
