//! Visitor callback and the per-file result it receives.

use std::future::Future;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::BoxError;
use crate::format::Format;

/// One loaded artifact, handed to the visitor and then dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadResult<A> {
    pub value: A,
    /// Absolute path of the artifact.
    pub path: PathBuf,
    /// Entry name within its directory.
    pub name: String,
    pub format: Format,
}

/// Receives every artifact a walk loads.
///
/// A walk completes only after every visit has completed. An error aborts
/// the walk.
#[async_trait]
pub trait Visitor<A: Send + 'static>: Send + Sync {
    async fn visit(&self, entry: LoadResult<A>) -> Result<(), BoxError>;
}

/// Adapter turning an async closure into a `Visitor`.
pub struct FnVisitor<F>(F);

/// Wrap `f` as a visitor.
///
/// ```ignore
/// let visitor = visit_fn(|entry: LoadResult<Value>| async move {
///     println!("{}", entry.path.display());
///     Ok::<_, BoxError>(())
/// });
/// ```
pub fn visit_fn<F>(f: F) -> FnVisitor<F> {
    FnVisitor(f)
}

#[async_trait]
impl<A, F, Fut> Visitor<A> for FnVisitor<F>
where
    A: Send + 'static,
    F: Fn(LoadResult<A>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn visit(&self, entry: LoadResult<A>) -> Result<(), BoxError> {
        (self.0)(entry).await
    }
}
