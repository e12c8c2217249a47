//! Utility functions and helpers

/// Generate unique ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Short form of a generated ID, for log lines
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
