use uuid::Uuid;

/// Mint a fresh task id: `AGLM-` followed by the first 8 uppercase hex
/// digits of a fresh random 128-bit value. Collision probability across a
/// single process's lifetime is negligible; uniqueness is not otherwise
/// enforced here (invariant 1 in the data model holds probabilistically,
/// matching the source's own id scheme).
pub fn mint_task_id() -> String {
    let value = Uuid::new_v4().simple().to_string();
    format!("AGLM-{}", value[..8].to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_look_like_agl_m_prefixed_hex() {
        let id = mint_task_id();
        assert!(id.starts_with("AGLM-"));
        assert_eq!(id.len(), "AGLM-".len() + 8);
        assert!(id["AGLM-".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn many_ids_are_pairwise_distinct() {
        let ids: HashSet<String> = (0..10_000).map(|_| mint_task_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }
}
