//! Bounded-width fan-out over a set of items, used for peer broadcasts so a
//! single node never opens more than `width` outbound connections at once.

use futures::stream::{self, StreamExt};

pub async fn bounded_map<T, F, Fut, R>(items: &[T], width: usize, f: F) -> Vec<R>
where
    T: Clone,
    F: Fn(T) -> Fut,
    Fut: std::future::Future<Output = R>,
{
    stream::iter(items.iter().cloned())
        .map(f)
        .buffer_unordered(width.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn visits_every_item_exactly_once() {
        let items = vec![1, 2, 3, 4, 5];
        let mut results = bounded_map(&items, 2, |n| async move { n * 2 }).await;
        results.sort();
        assert_eq!(results, vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test]
    async fn width_of_one_is_still_exhaustive() {
        let items = vec!["a", "b", "c"];
        let results = bounded_map(&items, 1, |s| async move { s.to_string() }).await;
        assert_eq!(results.len(), 3);
    }
}
