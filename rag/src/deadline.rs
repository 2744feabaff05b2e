//! Runtime-agnostic deadlines for model calls.

use std::future::Future;
use std::time::Duration;

use async_io::Timer;

use crate::error::{Operation, RagError, Result};

/// Runs `call`, failing with [`RagError::Timeout`] if it is still pending after `limit`.
///
/// Backend errors are mapped through `on_error`. Without a limit the call runs to completion.
pub(crate) async fn guarded<T, F>(
    operation: Operation,
    limit: Option<Duration>,
    call: F,
    on_error: fn(anyhow::Error) -> RagError,
) -> Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let Some(after) = limit else {
        return call.await.map_err(on_error);
    };

    let finished = async { Some(call.await) };
    let expired = async {
        Timer::after(after).await;
        None
    };
    match futures_lite::future::or(finished, expired).await {
        Some(outcome) => outcome.map_err(on_error),
        None => Err(RagError::Timeout { operation, after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_deadline() {
        let value = guarded(
            Operation::Embed,
            Some(Duration::from_secs(5)),
            async { Ok(7) },
            RagError::Embedding,
        )
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn expires_slow_calls() {
        let result: Result<()> = guarded(
            Operation::Summarize,
            Some(Duration::from_millis(20)),
            async {
                Timer::after(Duration::from_secs(10)).await;
                Ok(())
            },
            RagError::Summarization,
        )
        .await;
        assert!(matches!(
            result,
            Err(RagError::Timeout {
                operation: Operation::Summarize,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn maps_backend_errors() {
        let result: Result<()> = guarded(
            Operation::Embed,
            None,
            async { Err(anyhow::anyhow!("model offline")) },
            RagError::Embedding,
        )
        .await;
        assert!(matches!(result, Err(RagError::Embedding(_))));
    }
}
