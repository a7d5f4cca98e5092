//! BoxDataSource -- object-safe dynamic dispatch wrapper for DataSource.
//!
//! Same blanket-impl pattern as the other boxed ports:
//! 1. Define an object-safe `DataSourceDyn` trait with boxed futures
//! 2. Blanket-impl `DataSourceDyn` for all `T: DataSource`
//! 3. `BoxDataSource` wraps `Box<dyn DataSourceDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use sitedesk_types::error::FetchError;
use sitedesk_types::source::SourceId;

use super::DataSource;

/// Object-safe version of [`DataSource`] with a boxed future.
pub trait DataSourceDyn: Send + Sync {
    fn id(&self) -> &SourceId;

    fn fetch_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, FetchError>> + Send + 'a>>;
}

impl<T: DataSource> DataSourceDyn for T {
    fn id(&self) -> &SourceId {
        DataSource::id(self)
    }

    fn fetch_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, FetchError>> + Send + 'a>> {
        Box::pin(self.fetch())
    }
}

/// Type-erased data source, so a view can hold sources of different
/// concrete types (HTTP collections, fixtures) in one list.
pub struct BoxDataSource {
    inner: Box<dyn DataSourceDyn>,
}

impl BoxDataSource {
    pub fn new<T: DataSource>(source: T) -> Self {
        Self {
            inner: Box::new(source),
        }
    }

    pub fn id(&self) -> &SourceId {
        self.inner.id()
    }

    pub async fn fetch(&self) -> Result<serde_json::Value, FetchError> {
        self.inner.fetch_boxed().await
    }
}

impl std::fmt::Debug for BoxDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxDataSource")
            .field("id", self.inner.id())
            .finish()
    }
}
