use sha2::{Digest, Sha256};

/// A stable hash of a resource's rendered definition, written into the
/// warehouse object's description field on create so a later run can
/// tell whether the definition has drifted (`shouldUpdate`).
pub fn fingerprint(bodies: &[String]) -> String {
    let mut hasher = Sha256::new();
    for body in bodies {
        hasher.update(body.as_bytes());
        hasher.update([0u8]); // separator so ["ab","c"] != ["a","bc"]
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_across_calls() {
        let bodies = vec!["select 1".to_string()];
        assert_eq!(fingerprint(&bodies), fingerprint(&bodies));
    }

    #[test]
    fn distinguishes_concatenation_boundary() {
        let a = vec!["ab".to_string(), "c".to_string()];
        let b = vec!["a".to_string(), "bc".to_string()];
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
