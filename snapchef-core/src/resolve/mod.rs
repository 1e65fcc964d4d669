//! Cache-then-model resolvers for the two pipeline stages.

mod classification;
mod recipe;

pub use classification::{ClassificationOutcome, ClassificationResolver};
pub use recipe::{RecipeOutcome, RecipeResolver};

use std::future::Future;

use tokio::time::Instant;

use crate::error::{ResolveError, Stage};

/// Await `fut` until `deadline`. Expiry drops the future, cancelling whatever I/O
/// it had in flight.
pub(crate) async fn within<F, T>(deadline: Instant, stage: Stage, fut: F) -> Result<T, ResolveError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| ResolveError::Timeout { stage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_within_times_out() {
        let deadline = Instant::now() + Duration::from_secs(1);
        let result = within(deadline, Stage::Recipe, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            42
        })
        .await;
        assert!(matches!(
            result,
            Err(ResolveError::Timeout {
                stage: Stage::Recipe
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_within_passes_value_through() {
        let deadline = Instant::now() + Duration::from_secs(1);
        let value = within(deadline, Stage::Lookup, async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }
}
