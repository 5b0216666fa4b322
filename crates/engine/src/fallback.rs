use layout_protocol::HostResult;
use std::future::Future;
use std::pin::Pin;

type Attempt<'a, T> = Pin<Box<dyn Future<Output = HostResult<Option<T>>> + Send + 'a>>;

/// One way of getting a value out of the host. `Ok(None)` is a miss.
pub struct Strategy<'a, T> {
    label: String,
    attempt: Attempt<'a, T>,
}

impl<'a, T> Strategy<'a, T> {
    pub fn new<F>(label: impl Into<String>, attempt: F) -> Self
    where
        F: Future<Output = HostResult<Option<T>>> + Send + 'a,
    {
        Self {
            label: label.into(),
            attempt: Box::pin(attempt),
        }
    }
}

/// Run strategies in order and stop at the first hit. Misses and host errors
/// are logged at debug level; strategies after the hit are never polled.
pub async fn first_success<T>(chain: &str, strategies: Vec<Strategy<'_, T>>) -> Option<T> {
    for strategy in strategies {
        match strategy.attempt.await {
            Ok(Some(value)) => {
                log::debug!("{chain}: {} succeeded", strategy.label);
                return Some(value);
            }
            Ok(None) => log::debug!("{chain}: {} missed", strategy.label),
            Err(e) => log::debug!("{chain}: {} failed: {e}", strategy.label),
        }
    }
    log::debug!("{chain}: no strategy succeeded");
    None
}

/// Adapt an accept/refuse host answer to the strategy shape.
pub fn accepted(answer: HostResult<bool>) -> HostResult<Option<()>> {
    answer.map(|ok| ok.then_some(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use layout_protocol::HostError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn stops_at_first_hit_and_skips_the_rest() {
        let polled = AtomicUsize::new(0);
        let strategies = vec![
            Strategy::new("error", async {
                polled.fetch_add(1, Ordering::SeqCst);
                Err(HostError::Other("boom".into()))
            }),
            Strategy::new("miss", async {
                polled.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }),
            Strategy::new("hit", async {
                polled.fetch_add(1, Ordering::SeqCst);
                Ok(Some(7))
            }),
            Strategy::new("never", async {
                polled.fetch_add(1, Ordering::SeqCst);
                Ok(Some(9))
            }),
        ];

        assert_eq!(first_success("test", strategies).await, Some(7));
        assert_eq!(polled.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_is_none() {
        let misses: Vec<Strategy<'_, u8>> = vec![
            Strategy::new("a", async { Ok(None) }),
            Strategy::new("b", async { Err(HostError::Other("down".to_string())) }),
        ];
        assert_eq!(first_success("test", misses).await, None);

        let refusals: Vec<Strategy<'_, ()>> = vec![
            Strategy::new("c", async { accepted(Ok(false)) }),
            Strategy::new("d", async { accepted(Err(HostError::Other("down".to_string()))) }),
        ];
        assert_eq!(first_success("test", refusals).await, None);
        assert_eq!(accepted(Ok(true)).unwrap(), Some(()));
    }
}
