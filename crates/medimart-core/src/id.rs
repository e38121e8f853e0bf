use crate::error::{CoreError, Result};

const MAX_ID_LEN: usize = 64;

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Ids are 1..=64 chars of `[A-Za-z0-9_-]`.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return Err(CoreError::invalid_id(id));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CoreError::invalid_id(id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_valid() {
        let id = generate_id();
        assert!(validate_id(&id).is_ok());
        assert_ne!(id, generate_id());
    }

    #[test]
    fn rejects_bad_ids() {
        assert!(validate_id("").is_err());
        assert!(validate_id("has space").is_err());
        assert!(validate_id("../etc").is_err());
        assert!(validate_id(&"a".repeat(65)).is_err());
        assert!(validate_id("doc_42-a").is_ok());
    }
}
