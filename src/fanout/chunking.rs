use super::models::{Message, Notification, Recipient, MAX_CHUNK_SIZE};
use std::sync::Arc;
use tracing::warn;

/// Splits directory entries into the addresses that will be messaged and the
/// number of entries skipped. Every skipped entry is logged; duplicates are
/// kept as they are.
pub fn partition_eligible(recipients: Vec<Recipient>) -> (Vec<String>, usize) {
    let mut eligible = Vec::with_capacity(recipients.len());
    let mut excluded = 0;

    for (position, recipient) in recipients.into_iter().enumerate() {
        if recipient.is_eligible() {
            eligible.push(recipient.address);
        } else {
            excluded += 1;
            if !recipient.eligible {
                warn!(
                    "Skipping recipient #{} ({:?}): not opted in",
                    position, recipient.address
                );
            } else {
                warn!("Skipping recipient #{}: missing or empty address", position);
            }
        }
    }

    (eligible, excluded)
}

/// Pairs every address with the same notification and splits the result into
/// ordered chunks of at most [`MAX_CHUNK_SIZE`] messages.
pub fn build_chunks(addresses: &[String], notification: &Arc<Notification>) -> Vec<Vec<Message>> {
    addresses
        .chunks(MAX_CHUNK_SIZE)
        .map(|slice| {
            slice
                .iter()
                .map(|address| Message {
                    address: address.clone(),
                    notification: Arc::clone(notification),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn notification() -> Arc<Notification> {
        Arc::new(Notification {
            title: "Title".to_string(),
            body: String::new(),
            link: "https://example.com".to_string(),
        })
    }

    fn addresses(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("token-{}", i)).collect()
    }

    #[test]
    fn chunks_never_exceed_provider_limit() {
        let notification = notification();
        let cases = [
            (0, 0),
            (1, 1),
            (999, 1),
            (1000, 1),
            (1001, 2),
            (2500, 3),
            (4000, 4),
        ];
        for (n, expected) in cases {
            let chunks = build_chunks(&addresses(n), &notification);
            assert_eq!(chunks.len(), expected, "{} addresses", n);
            assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= MAX_CHUNK_SIZE));
        }
    }

    #[test]
    fn chunks_cover_every_address_once_with_shared_notification() {
        let notification = notification();
        let mut input = addresses(2500);
        input.push("token-7".to_string());

        let chunks = build_chunks(&input, &notification);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![1000, 1000, 501]);

        let mut expected: HashMap<&str, usize> = HashMap::new();
        for address in &input {
            *expected.entry(address.as_str()).or_default() += 1;
        }
        let mut actual: HashMap<&str, usize> = HashMap::new();
        for message in chunks.iter().flatten() {
            assert!(Arc::ptr_eq(&message.notification, &notification));
            *actual.entry(message.address.as_str()).or_default() += 1;
        }
        assert_eq!(actual, expected);
        assert_eq!(actual["token-7"], 2);
    }

    #[test]
    fn partition_counts_add_up() {
        let recipients = vec![
            Recipient::new("a", true),
            Recipient::new("b", false),
            Recipient::new("", true),
            Recipient::new("a", true),
            Recipient::new(" ", false),
        ];
        let total = recipients.len();

        let (eligible, excluded) = partition_eligible(recipients);

        assert_eq!(eligible, vec!["a".to_string(), "a".to_string()]);
        assert_eq!(excluded, 3);
        assert_eq!(eligible.len() + excluded, total);
    }
}
