//! Topic exchange matching.
//!
//! Keys are dot separated words. In a binding pattern `*` stands for exactly
//! one word and `#` for zero or more words.

pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let key: Vec<&str> = routing_key.split('.').collect();

    // reachable[j]: the pattern words seen so far can cover exactly key[..j]
    let mut reachable = vec![false; key.len() + 1];
    reachable[0] = true;

    for word in pattern.split('.') {
        let mut next = vec![false; key.len() + 1];
        match word {
            "#" => {
                let mut seen = false;
                for j in 0..=key.len() {
                    seen |= reachable[j];
                    next[j] = seen;
                }
            }
            "*" => {
                for j in 1..=key.len() {
                    next[j] = reachable[j - 1];
                }
            }
            literal => {
                for j in 1..=key.len() {
                    next[j] = reachable[j - 1] && key[j - 1] == literal;
                }
            }
        }
        if !next.contains(&true) {
            return false;
        }
        reachable = next;
    }

    reachable[key.len()]
}

#[cfg(test)]
mod tests {
    use super::topic_matches;
    use std::time::{Duration, Instant};

    #[test]
    fn exact_words() {
        assert!(topic_matches("orders.created", "orders.created"));
        assert!(!topic_matches("orders.created", "orders.deleted"));
        assert!(!topic_matches("orders", "orders.created"));
    }

    #[test]
    fn star_matches_one_word() {
        assert!(topic_matches("orders.*", "orders.created"));
        assert!(!topic_matches("orders.*", "orders"));
        assert!(!topic_matches("orders.*", "orders.eu.created"));
        assert!(topic_matches("*.created", "invoices.created"));
    }

    #[test]
    fn hash_matches_zero_or_more_words() {
        assert!(topic_matches("orders.#", "orders"));
        assert!(topic_matches("orders.#", "orders.eu.created"));
        assert!(topic_matches("#", "anything.at.all"));
        assert!(topic_matches("#", ""));
        assert!(topic_matches("#.created", "orders.eu.created"));
        assert!(!topic_matches("#.created", "orders.eu.deleted"));
    }

    #[test]
    fn mixed_wildcards() {
        assert!(topic_matches("*.eu.#", "orders.eu"));
        assert!(topic_matches("*.eu.#", "orders.eu.created.late"));
        assert!(!topic_matches("*.eu.#", "eu.orders"));
        assert!(topic_matches("#.#.orders", "orders"));
        assert!(topic_matches("#.*.#", "one"));
    }

    #[test]
    fn many_hashes_against_long_key_stay_fast() {
        let key = vec!["a"; 30].join(".");
        let pattern = format!("{}x", "#.".repeat(24));

        let started = Instant::now();
        assert!(!topic_matches(&pattern, &key));
        assert!(topic_matches(&format!("{}a", "#.".repeat(24)), &key));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
