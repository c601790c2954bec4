use chrono::Utc;
use uuid::Uuid;

const SUFFIX_LEN: usize = 9;

pub const USER: &str = "user";
pub const TRAVEL: &str = "travel";
pub const REQUEST: &str = "request";
pub const CONVERSATION: &str = "conv";
pub const MESSAGE: &str = "msg";
pub const SHIPMENT: &str = "ship";

/// Generates an opaque id of the form `<prefix>_<epochMillis>_<randomSuffix>`.
///
/// Callers must treat the result as an opaque string.
pub fn generate(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{prefix}_{}_{}",
        Utc::now().timestamp_millis(),
        &random[..SUFFIX_LEN]
    )
}

pub fn tracking_number() -> String {
    let random = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("GP{}{}", Utc::now().format("%y%m%d"), &random[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_has_prefix_millis_and_suffix() {
        let id = generate(MESSAGE);
        let parts: Vec<&str> = id.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "msg");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), SUFFIX_LEN);
    }

    #[test]
    fn consecutive_ids_differ() {
        assert_ne!(generate(USER), generate(USER));
    }

    #[test]
    fn tracking_number_is_uppercase() {
        let number = tracking_number();
        assert!(number.starts_with("GP"));
        assert_eq!(number, number.to_uppercase());
    }
}
