//! Collection resolution for component workloads.

use resume_core::{CollectionReference, ObjectStore, Workload, list_typed};
use tracing::debug;

use crate::error::{Error, Result};
use crate::request::Context;

/// Find the collection a component belongs to.
///
/// With an empty reference the store must hold exactly one collection of
/// kind `C`. With an explicit reference the collection whose name and
/// namespace match is returned, however many others exist.
///
/// # Errors
///
/// - [`Error::CollectionCountMismatch`] when no reference is given and zero
///   or several collections exist.
/// - [`Error::CollectionNotFound`] when the explicit reference matches none.
/// - Store errors and [`Error::Cancelled`] from the list call.
pub async fn resolve_collection<C: Workload>(
    store: &dyn ObjectStore,
    reference: &CollectionReference,
    context: &Context,
) -> Result<C> {
    let kind = C::gvk().kind;
    let collections: Vec<C> = context.guard(list_typed::<C>(store, None)).await?;
    debug!(kind = %kind, found = collections.len(), reference = %reference.key(), "Resolving collection");

    if reference.is_empty() {
        let found = collections.len();
        let mut candidates = collections.into_iter();
        return match (candidates.next(), candidates.next()) {
            (Some(only), None) => Ok(only),
            _ => Err(Error::collection_count_mismatch(kind, found)),
        };
    }

    collections
        .into_iter()
        .find(|collection| reference.matches(collection.meta()))
        .ok_or_else(|| Error::collection_not_found(kind, reference.key()))
}
