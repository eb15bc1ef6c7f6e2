//! Required lookups over collections returned by cloud describe/list calls.
//!
//! A lookup that finds nothing is an explicit [`SuiteError::NotFound`] rather
//! than an `Option` the caller may forget to check.

use common::error::{Result, SuiteError};

/// Return the first item matching `predicate`.
///
/// # Errors
///
/// Returns [`SuiteError::NotFound`] carrying `description` if nothing matches.
pub fn find_required<'a, T, P>(
    items: &'a [T],
    description: &str,
    mut predicate: P,
) -> Result<&'a T>
where
    P: FnMut(&T) -> bool,
{
    items
        .iter()
        .find(|item| predicate(item))
        .ok_or_else(|| SuiteError::NotFound(description.to_string()))
}

/// Return the first item whose key starts with `prefix`.
///
/// Stack-generated resource names carry a random suffix, so tests usually
/// only know the prefix.
///
/// # Errors
///
/// Returns [`SuiteError::NotFound`] if no key starts with `prefix`.
pub fn find_by_prefix<'a, T, K>(items: &'a [T], prefix: &str, key: K) -> Result<&'a T>
where
    K: Fn(&T) -> &str,
{
    find_required(items, &format!("item with prefix '{prefix}'"), |item| {
        key(item).starts_with(prefix)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct Queue {
        name: String,
        visible_messages: u32,
    }

    fn queues() -> Vec<Queue> {
        vec![
            Queue {
                name: "cloudximage-QueueSQSQueue-1A2B3C".to_string(),
                visible_messages: 0,
            },
            Queue {
                name: "cloudxserverless-EventsQueue-9Z8Y".to_string(),
                visible_messages: 4,
            },
        ]
    }

    #[test]
    fn test_find_required_match() {
        let queues = queues();
        let busy = find_required(&queues, "queue with messages", |q| q.visible_messages > 0)
            .expect("Should find a queue");
        assert!(busy.name.starts_with("cloudxserverless"));
    }

    #[test]
    fn test_find_required_not_found() {
        let queues = queues();
        let result = find_required(&queues, "dead letter queue", |q| q.name.contains("DLQ"));
        assert!(matches!(result, Err(SuiteError::NotFound(d)) if d == "dead letter queue"));
    }

    #[test]
    fn test_find_by_prefix() {
        let queues = queues();
        let queue = find_by_prefix(&queues, "cloudximage", |q| q.name.as_str()).unwrap();
        assert_eq!(queue.visible_messages, 0);

        let missing = find_by_prefix(&queues, "cloudxiam", |q| q.name.as_str());
        assert!(missing.is_err());
    }
}
