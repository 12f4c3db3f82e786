//! Parcel tracking: cached trace vs. live courier lookup, first answer wins.

use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use crate::db;
use crate::domain::aggregates::Order;
use crate::error::AppResult;
use crate::integrations::parcel::TrackingInfo;
use crate::state::AppState;

/// Resolves to the first `Some` either future yields, or `None` when both come
/// back empty or `deadline` passes first.
pub async fn first_some<T, A, B>(primary: A, secondary: B, deadline: Duration) -> Option<T>
where
    A: Future<Output = Option<T>>,
    B: Future<Output = Option<T>>,
{
    let race = async {
        tokio::pin!(primary);
        tokio::pin!(secondary);
        let (mut primary_done, mut secondary_done) = (false, false);
        loop {
            tokio::select! {
                found = &mut primary, if !primary_done => {
                    if found.is_some() { return found; }
                    primary_done = true;
                }
                found = &mut secondary, if !secondary_done => {
                    if found.is_some() { return found; }
                    secondary_done = true;
                }
                else => return None,
            }
        }
    };
    tokio::time::timeout(deadline, race).await.ok().flatten()
}

pub async fn track_order(state: &AppState, order: &Order) -> AppResult<Option<TrackingInfo>> {
    let Some(tracking_number) = order.tracking_number.clone() else {
        return Ok(None);
    };

    let cached = cached_trace(state, order.id);

    // Spawned so a fresh trace still lands in the cache when the cached copy wins the race.
    let live = tokio::spawn(live_trace(state.clone(), order.id, tracking_number));
    let live = async move { live.await.ok().flatten() };

    Ok(first_some(cached, live, state.config.tracking_deadline).await)
}

async fn cached_trace(state: &AppState, order_id: Uuid) -> Option<TrackingInfo> {
    db::shipments::find(&state.db, order_id).await.unwrap_or_else(|e| {
        tracing::warn!(%order_id, error = %e, "Shipment cache read failed");
        None
    })
}

async fn live_trace(state: AppState, order_id: Uuid, tracking_number: String) -> Option<TrackingInfo> {
    let info = match state.parcels.trace(&tracking_number).await {
        Ok(info) => info?,
        Err(e) => {
            tracing::warn!(%tracking_number, error = %e, "Courier trace failed");
            return None;
        }
    };
    if let Err(e) = db::shipments::upsert(&state.db, order_id, &info).await {
        tracing::warn!(%tracking_number, error = %e, "Could not cache courier trace");
    }
    Some(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future;

    async fn after(ms: u64, value: Option<&'static str>) -> Option<&'static str> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        value
    }

    #[tokio::test]
    async fn test_faster_value_wins() {
        let got = first_some(after(50, Some("cache")), after(5, Some("courier")), Duration::from_secs(1)).await;
        assert_eq!(got, Some("courier"));
    }

    #[tokio::test]
    async fn test_empty_answer_waits_for_the_other() {
        let got = first_some(after(1, None), after(20, Some("courier")), Duration::from_secs(1)).await;
        assert_eq!(got, Some("courier"));
    }

    #[tokio::test]
    async fn test_both_empty_is_none() {
        let got: Option<&str> = first_some(after(1, None), after(2, None), Duration::from_secs(1)).await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn test_deadline_gives_none() {
        let got = first_some(future::pending::<Option<&str>>(), after(500, Some("late")), Duration::from_millis(20)).await;
        assert_eq!(got, None);
    }
}
