//! Credential redaction for status output and error messages.

use testgate_core::types::ProvisioningProfile;

const MASK: &str = "***";

/// Secret values shorter than this are not masked, to avoid shredding output.
const MIN_SECRET_LEN: usize = 4;

/// Collects the secret values a profile would forward to a child process.
///
/// Values come from the current process environment for every name in
/// `secret_env`, plus `env` entries whose key looks like a credential.
pub fn secret_values(profile: &ProvisioningProfile) -> Vec<String> {
    let redacted = profile.redacted();
    let mut values: Vec<String> = profile
        .secret_env
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .chain(
            profile
                .env
                .iter()
                .filter(|(key, _)| redacted.env.get(*key).is_some_and(|v| v == MASK))
                .map(|(_, value)| value.clone()),
        )
        .filter(|v| v.len() >= MIN_SECRET_LEN)
        .collect();

    // Longest first so a secret containing another is masked whole.
    values.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    values.dedup();
    values
}

/// Replaces every occurrence of the profile's secret values with `***`.
pub fn redact(text: &str, profile: &ProvisioningProfile) -> String {
    redact_values(text, &secret_values(profile))
}

pub(crate) fn redact_values(text: &str, secrets: &[String]) -> String {
    let mut out = text.to_owned();
    for secret in secrets {
        out = out.replace(secret.as_str(), MASK);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use testgate_core::types::ProfileKind;

    fn profile() -> ProvisioningProfile {
        let mut profile = ProvisioningProfile::new("aws", ProfileKind::Aws);
        profile.secret_env = vec!["TESTGATE_TEST_REDACT_TOKEN".to_owned()];
        profile
            .env
            .insert("API_KEY".to_owned(), "key-abcdef".to_owned());
        profile
            .env
            .insert("REGION".to_owned(), "us-east-1".to_owned());
        profile
    }

    #[test]
    #[serial]
    fn masks_secret_env_and_credential_like_values() {
        // SAFETY: serial test, no other thread reads this variable.
        unsafe { std::env::set_var("TESTGATE_TEST_REDACT_TOKEN", "tok-123456") };

        let text = "auth tok-123456 with key-abcdef in us-east-1";
        let out = redact(text, &profile());

        unsafe { std::env::remove_var("TESTGATE_TEST_REDACT_TOKEN") };

        assert_eq!(out, "auth *** with *** in us-east-1");
    }

    #[test]
    #[serial]
    fn missing_secret_env_is_ignored() {
        unsafe { std::env::remove_var("TESTGATE_TEST_REDACT_TOKEN") };
        let values = secret_values(&profile());
        assert_eq!(values, vec!["key-abcdef".to_owned()]);
    }

    #[test]
    fn short_values_are_not_masked() {
        let out = redact_values("a b c", &[]);
        assert_eq!(out, "a b c");

        let mut p = ProvisioningProfile::new("p", ProfileKind::Aws);
        p.env.insert("TOKEN".to_owned(), "x".to_owned());
        assert!(secret_values(&p).is_empty());
    }

    #[test]
    fn longest_secret_masked_first() {
        let secrets = vec!["abcdefgh".to_owned(), "abcd".to_owned()];
        assert_eq!(redact_values("xabcdefghx", &secrets), "x***x");
    }
}
