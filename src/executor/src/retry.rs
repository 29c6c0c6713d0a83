use std::collections::HashMap;

/// Per-key submission-attempt budget. Every call to `create()` — whether
/// it ends up succeeding, failing with a retryable error, or failing
/// fatally — consumes one unit for that key. A key's budget is only
/// allocated on first use, so keys that never need a second attempt never
/// touch the map.
#[derive(Debug)]
pub struct RetryBudgets {
    max: u32,
    used: HashMap<String, u32>,
}

impl RetryBudgets {
    pub fn new(max: u32) -> Self {
        RetryBudgets { max, used: HashMap::new() }
    }

    /// Consumes one attempt for `key`. `Ok(())` if the key still had
    /// budget left (post-consumption); `Err(())` if it was already at the
    /// limit, meaning this attempt must not be made.
    pub fn try_consume(&mut self, key: &str) -> Result<(), ()> {
        let used = self.used.entry(key.to_string()).or_insert(0);
        if *used >= self.max {
            return Err(());
        }
        *used += 1;
        Ok(())
    }
}
