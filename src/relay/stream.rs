//! Upstream fragment stream → outbound body stream.
//!
//! The relay commits the HTTP status only after the upstream has produced
//! its first non-empty fragment. Anything that goes wrong before that point
//! is returned as an ordinary error; anything after it ends the body with
//! an error item so the connection is aborted instead of closed cleanly.

use crate::llm::FragmentStream;
use crate::types::{AppError, Result};
use async_stream::stream;
use futures::StreamExt;
use tokio::time::{Instant, timeout_at};
use tracing::{error, info, warn};

/// Wait for the first non-empty fragment, then hand back a stream that
/// replays it followed by every later non-empty fragment in arrival order.
///
/// `deadline` bounds the whole completion, not each fragment.
pub async fn prime(mut upstream: FragmentStream, deadline: Instant) -> Result<FragmentStream> {
    let first = loop {
        match timeout_at(deadline, upstream.next()).await {
            Err(_) => {
                return Err(AppError::CompletionStream(
                    "Completion timed out before producing any text".to_string(),
                ));
            }
            Ok(None) => {
                return Err(AppError::CompletionStream(
                    "Completion ended without producing any text".to_string(),
                ));
            }
            Ok(Some(Err(e))) => return Err(into_completion_error(e)),
            Ok(Some(Ok(fragment))) if fragment.is_empty() => continue,
            Ok(Some(Ok(fragment))) => break fragment,
        }
    };

    let relayed = stream! {
        let mut fragments: usize = 1;
        let mut bytes = first.len();
        yield Ok(first);

        loop {
            match timeout_at(deadline, upstream.next()).await {
                Err(_) => {
                    warn!(fragments, bytes, "Completion deadline elapsed mid-stream");
                    yield Err(AppError::CompletionStream(
                        "Completion timed out mid-stream".to_string(),
                    ));
                    break;
                }
                Ok(None) => {
                    info!(fragments, bytes, "Completion stream closed");
                    break;
                }
                Ok(Some(Err(e))) => {
                    error!(fragments, bytes, error = %e, "Completion stream failed mid-stream");
                    yield Err(into_completion_error(e));
                    break;
                }
                Ok(Some(Ok(fragment))) => {
                    if fragment.is_empty() {
                        continue;
                    }
                    fragments += 1;
                    bytes += fragment.len();
                    yield Ok(fragment);
                }
            }
        }
    };

    Ok(Box::pin(relayed))
}

fn into_completion_error(e: AppError) -> AppError {
    match e {
        AppError::CompletionStream(_) => e,
        other => AppError::CompletionStream(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::time::Duration;

    fn upstream(items: Vec<Result<String>>) -> FragmentStream {
        Box::pin(stream::iter(items))
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    async fn collect(s: FragmentStream) -> Vec<Result<String>> {
        s.collect().await
    }

    #[tokio::test]
    async fn test_relays_in_order_and_skips_empty() {
        let s = prime(
            upstream(vec![
                Ok("".into()),
                Ok("Hel".into()),
                Ok("".into()),
                Ok("lo".into()),
                Ok("!".into()),
            ]),
            far_deadline(),
        )
        .await
        .unwrap();

        let out: Vec<String> = collect(s).await.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(out, vec!["Hel", "lo", "!"]);
    }

    #[tokio::test]
    async fn test_empty_upstream_is_an_error() {
        let err = prime(upstream(vec![]), far_deadline()).await.err().unwrap();
        assert!(matches!(err, AppError::CompletionStream(_)));

        let err = prime(upstream(vec![Ok("".into())]), far_deadline())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("without producing any text"));
    }

    #[tokio::test]
    async fn test_error_before_first_fragment() {
        let err = prime(
            upstream(vec![Err(AppError::Internal("boom".into()))]),
            far_deadline(),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, AppError::CompletionStream(ref m) if m.contains("boom")));
    }

    #[tokio::test]
    async fn test_mid_stream_error_terminates() {
        let s = prime(
            upstream(vec![
                Ok("a".into()),
                Err(AppError::CompletionStream("reset".into())),
                Ok("never".into()),
            ]),
            far_deadline(),
        )
        .await
        .unwrap();

        let out = collect(s).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), "a");
        assert!(out[1].is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_before_first_fragment() {
        let slow: FragmentStream = Box::pin(
            stream::once(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, AppError>("late".to_string())
            }),
        );

        let err = prime(slow, Instant::now() + Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_mid_stream() {
        let slow: FragmentStream = Box::pin(stream::iter(vec![Ok("fast".to_string())]).chain(
            stream::once(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, AppError>("late".to_string())
            }),
        ));

        let s = prime(slow, Instant::now() + Duration::from_secs(1))
            .await
            .unwrap();
        let out = collect(s).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), "fast");
        assert!(out[1].is_err());
    }
}
