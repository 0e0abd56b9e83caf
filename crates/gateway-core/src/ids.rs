//! Identifier generation.

use uuid::Uuid;

/// Generate a server-internal connection id (`conn_<uuid v7>`).
pub fn connection_id() -> String {
    format!("conn_{}", Uuid::now_v7())
}

/// Generate a client id for clients that do not present one.
///
/// Format is `client_<unix millis>`.
pub fn client_id() -> String {
    format!("client_{}", chrono::Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_are_unique() {
        let a = connection_id();
        let b = connection_id();
        assert_ne!(a, b);
        assert!(a.starts_with("conn_"));
    }

    #[test]
    fn client_id_carries_millis() {
        let id = client_id();
        let millis = id.strip_prefix("client_").unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
    }
}
