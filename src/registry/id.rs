//! Model identifier generation

use chrono::{DateTime, Utc};
use uuid::Uuid;

const ID_PREFIX: &str = "model_";

/// Generate `model_<YYYYMMDD_HHMMSS>_<8 hex>` for a training finished at `at`.
///
/// The random suffix keeps two trainings in the same second apart.
pub fn generate_model_id(at: DateTime<Utc>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{}{}_{}", ID_PREFIX, at.format("%Y%m%d_%H%M%S"), &token[..8])
}

/// Whether `id` is safe to use as a file name stem
pub fn is_valid_model_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_id_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let id = generate_model_id(at);
        assert!(id.starts_with("model_20240309_140507_"));
        assert_eq!(id.len(), "model_20240309_140507_".len() + 8);
        assert!(is_valid_model_id(&id));
    }

    #[test]
    fn test_same_second_ids_differ() {
        let at = Utc::now();
        assert_ne!(generate_model_id(at), generate_model_id(at));
    }

    #[test]
    fn test_path_like_ids_rejected() {
        assert!(!is_valid_model_id("../etc/passwd"));
        assert!(!is_valid_model_id("a/b"));
        assert!(!is_valid_model_id(""));
    }
}
