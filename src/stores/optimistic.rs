//! Apply a mutation locally, await the remote call, restore on failure.
//!
//! The restore puts back the whole collection as it was immediately before
//! the local mutation, not just the edited field. Anything else written to
//! that collection while the call was in flight is discarded along with it.
//!
//! A collection can be reused for a different owner while a call is in
//! flight (the bugs cache switching projects). The caller names that owner
//! with a `scope` function; if the scope changed, the snapshot describes
//! data that is no longer shown and is not restored.

use std::future::Future;

use super::StoreCell;

/// Run `remote` with `mutate` already applied to the collection selected
/// by `lens`.
///
/// On `Ok` the local change stands and `on_success` may reconcile it with
/// the server's answer. On `Err` the pre-mutation snapshot is restored,
/// unless `scope` no longer matches, and `on_failure` runs in the same store
/// update, so observers never see the restored collection without the error
/// that explains it.
pub async fn apply_optimistic<S, C, K, R, E, Fut>(
    cell: &StoreCell<S>,
    lens: fn(&mut S) -> &mut C,
    scope: fn(&S) -> K,
    mutate: impl FnOnce(&mut C),
    remote: Fut,
    on_success: impl FnOnce(&mut S, &R),
    on_failure: impl FnOnce(&mut S, &E),
) -> Result<R, E>
where
    S: Clone,
    C: Clone,
    K: PartialEq,
    Fut: Future<Output = Result<R, E>>,
{
    let (owner, snapshot) = cell.update(|state| {
        let owner = scope(state);
        let collection = lens(state);
        let before = collection.clone();
        mutate(collection);
        (owner, before)
    });

    match remote.await {
        Ok(value) => {
            cell.update(|state| on_success(state, &value));
            Ok(value)
        }
        Err(err) => {
            cell.update(|state| {
                if scope(state) == owner {
                    *lens(state) = snapshot;
                }
                on_failure(state, &err);
            });
            Err(err)
        }
    }
}
