use futures::future::join_all;
use std::{fmt::Display, future::Future};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Runs every branch concurrently and returns the first `Some` any of them produces.
///
/// All branches share one child token of `cancel_token`. The first successful branch stores
/// its value in a single-slot channel and cancels the token, which stops the remaining
/// branches. Branch failures are logged under their label; cancelled branches are not failures.
/// Returns only after every branch has finished.
pub async fn first_some<L, T, E, F, Fut>(
    cancel_token: &CancellationToken,
    branches: impl IntoIterator<Item = (L, F)>,
) -> Option<T>
where
    L: Display,
    E: Display,
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let token = cancel_token.child_token();
    let (slot_tx, mut slot_rx) = mpsc::channel(1);

    let branches = branches.into_iter().map(|(label, branch)| {
        let token = token.clone();
        let slot_tx = slot_tx.clone();
        async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = branch(token.clone()) => Some(result),
            };

            match outcome {
                Some(Ok(Some(value))) => {
                    // Only the first winner fits; later ones are dropped.
                    if slot_tx.try_send(value).is_ok() {
                        token.cancel();
                    }
                }
                Some(Ok(None)) => {}
                Some(Err(err)) => warn!(target: "search", %label, %err, "Lookup failed"),
                None => trace!(target: "search", %label, "Lookup cancelled"),
            }
        }
    });
    join_all(branches).await;

    drop(slot_tx);
    slot_rx.try_recv().ok()
}
