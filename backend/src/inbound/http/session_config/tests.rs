//! Unit tests for session configuration parsing.

use std::collections::HashMap;
use std::io::Write as _;

use mockable::MockEnv;
use rstest::{fixture, rstest};
use tempfile::NamedTempFile;

use super::*;

fn key_file(len: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temporary key file");
    file.write_all(&vec![b'k'; len]).expect("write key bytes");
    file
}

fn mock_env(vars: HashMap<&'static str, String>) -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_string()
        .times(0..)
        .returning(move |key| vars.get(key).cloned());
    env
}

struct ReleaseEnv {
    vars: HashMap<&'static str, String>,
    _key: NamedTempFile,
}

impl ReleaseEnv {
    fn with(mut self, name: &'static str, value: &str) -> Self {
        self.vars.insert(name, value.to_owned());
        self
    }

    fn without(mut self, name: &'static str) -> Self {
        self.vars.remove(name);
        self
    }

    fn settings(&self) -> Result<SessionSettings, SessionConfigError> {
        session_settings_from_env(&mock_env(self.vars.clone()), BuildMode::Release)
    }
}

#[fixture]
fn release_env() -> ReleaseEnv {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let vars = HashMap::from([
        (KEY_FILE_ENV, key.path().to_string_lossy().into_owned()),
        (COOKIE_SECURE_ENV, "1".to_owned()),
        (SAMESITE_ENV, "Strict".to_owned()),
        (ALLOW_EPHEMERAL_ENV, "0".to_owned()),
    ]);
    ReleaseEnv { vars, _key: key }
}

#[rstest]
fn release_valid_settings_succeed(release_env: ReleaseEnv) {
    let settings = release_env.settings().expect("valid settings");

    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Strict);
}

#[rstest]
#[case(COOKIE_SECURE_ENV)]
#[case(SAMESITE_ENV)]
#[case(ALLOW_EPHEMERAL_ENV)]
fn release_missing_toggle_is_rejected(release_env: ReleaseEnv, #[case] name: &'static str) {
    let err = release_env.without(name).settings().expect_err("missing toggle");

    assert!(matches!(err, SessionConfigError::MissingEnv { name: missing } if missing == name));
}

#[rstest]
#[case(COOKIE_SECURE_ENV, "maybe")]
#[case(COOKIE_SECURE_ENV, "")]
#[case(SAMESITE_ENV, "sometimes")]
fn release_invalid_toggle_is_rejected(
    release_env: ReleaseEnv,
    #[case] name: &'static str,
    #[case] value: &str,
) {
    let err = release_env.with(name, value).settings().expect_err("invalid toggle");

    assert!(matches!(err, SessionConfigError::InvalidEnv { name: invalid, .. } if invalid == name));
}

#[rstest]
fn release_ephemeral_enabled_is_rejected(release_env: ReleaseEnv) {
    let err = release_env
        .with(ALLOW_EPHEMERAL_ENV, "1")
        .settings()
        .expect_err("ephemeral rejected");

    assert!(matches!(err, SessionConfigError::EphemeralNotAllowed));
}

#[rstest]
fn release_missing_key_file_is_rejected(release_env: ReleaseEnv) {
    let err = release_env
        .with(KEY_FILE_ENV, "/nonexistent/session_key")
        .settings()
        .expect_err("key file missing");

    assert!(matches!(err, SessionConfigError::KeyRead { .. }));
}

#[rstest]
fn release_short_key_is_rejected(release_env: ReleaseEnv) {
    let short = key_file(32);
    let err = release_env
        .with(KEY_FILE_ENV, &short.path().to_string_lossy())
        .settings()
        .expect_err("short key");

    assert!(matches!(err, SessionConfigError::KeyTooShort { length: 32, .. }));
}

#[rstest]
fn release_insecure_none_same_site_is_rejected(release_env: ReleaseEnv) {
    let err = release_env
        .with(COOKIE_SECURE_ENV, "0")
        .with(SAMESITE_ENV, "None")
        .settings()
        .expect_err("insecure SameSite=None");

    assert!(matches!(err, SessionConfigError::InsecureSameSiteNone));
}

#[rstest]
fn debug_defaults_allow_ephemeral_key() {
    let settings = session_settings_from_env(&mock_env(HashMap::new()), BuildMode::Debug)
        .expect("debug defaults");

    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Lax);
}

#[rstest]
fn debug_invalid_same_site_falls_back_to_default() {
    let vars = HashMap::from([(SAMESITE_ENV, "unexpected".to_owned())]);

    let settings =
        session_settings_from_env(&mock_env(vars), BuildMode::Debug).expect("debug fallback");

    assert_eq!(settings.same_site, SameSite::Lax);
}

#[rstest]
fn key_fingerprint_is_stable_and_short(release_env: ReleaseEnv) {
    let first = release_env.settings().expect("valid settings");
    let second = release_env.settings().expect("valid settings");

    assert_eq!(first.key_fingerprint(), second.key_fingerprint());
    assert_eq!(first.key_fingerprint().len(), FINGERPRINT_BYTES * 2);
    assert!(!format!("{first:?}").contains("Key("));
}

#[rstest]
fn debug_tiny_key_falls_back_to_temporary_key() {
    let tiny = key_file(8);
    let vars = HashMap::from([(KEY_FILE_ENV, tiny.path().to_string_lossy().into_owned())]);

    let settings =
        session_settings_from_env(&mock_env(vars), BuildMode::Debug).expect("debug fallback");

    assert_eq!(settings.key_fingerprint().len(), FINGERPRINT_BYTES * 2);
}
