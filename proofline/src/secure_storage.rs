//! LanguageTool premium credentials kept in the OS keyring.

const SERVICE_NAME: &str = "com.proofline.app";
pub const API_KEY_ACCOUNT: &str = "languagetool_api_key";

pub fn read_secret(account: &str) -> Result<Option<String>, String> {
    let entry = keyring::Entry::new(SERVICE_NAME, account).map_err(|err| err.to_string())?;

    match entry.get_password() {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) if is_not_found_error(&err.to_string()) => Ok(None),
        Err(err) => Err(format!("failed to read `{account}` from secure storage: {err}")),
    }
}

/// Stores `value`, or removes the entry when `value` is blank.
pub fn write_secret(account: &str, value: &str) -> Result<(), String> {
    let entry = keyring::Entry::new(SERVICE_NAME, account).map_err(|err| err.to_string())?;
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) if is_not_found_error(&err.to_string()) => Ok(()),
            Err(err) => Err(format!("failed to clear `{account}` in secure storage: {err}")),
        };
    }

    entry
        .set_password(trimmed)
        .map_err(|err| format!("failed to save `{account}` in secure storage: {err}"))
}

pub fn read_api_key() -> Result<Option<String>, String> {
    read_secret(API_KEY_ACCOUNT)
}

pub fn write_api_key(api_key: &str) -> Result<(), String> {
    write_secret(API_KEY_ACCOUNT, api_key)
}

fn is_not_found_error(message: &str) -> bool {
    let normalized = message.to_lowercase();
    normalized.contains("no entry")
        || normalized.contains("not found")
        || normalized.contains("no matching entry")
}

#[cfg(test)]
mod tests {
    use super::is_not_found_error;

    #[test]
    fn not_found_messages_are_recognised_across_backends() {
        assert!(is_not_found_error("No entry found for service"));
        assert!(is_not_found_error("Item not found"));
        assert!(is_not_found_error("No matching entry found in secure storage"));
        assert!(!is_not_found_error("permission denied"));
    }
}
