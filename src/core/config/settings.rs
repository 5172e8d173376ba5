use std::path::PathBuf;

use super::parsing::{
    env_optional, env_or_default, normalize_path, parse_bool, parse_environment,
    parse_positive_usize, parse_u32, parse_u64,
};
use super::secret::load_token_file;
use super::types::{
    ApiBaseUrl, ApiSettings, ConfigError, CredentialSettings, RuntimeSettings, SessionSettings,
    Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment =
            parse_environment(env_optional("CBT_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("CBT_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let base_url = env_or_default("CBT_API_BASE_URL", "http://localhost:5000/api");
        let exam_path = normalize_path(env_or_default("CBT_EXAM_PATH", "/student/exam"));
        let answer_path = normalize_path(env_or_default("CBT_ANSWER_PATH", "/student/answer"));
        let connect_timeout_seconds = parse_u64(
            "CBT_CONNECT_TIMEOUT_SECONDS",
            env_or_default("CBT_CONNECT_TIMEOUT_SECONDS", "10"),
        )?;
        let request_timeout_seconds = parse_u64(
            "CBT_REQUEST_TIMEOUT_SECONDS",
            env_or_default("CBT_REQUEST_TIMEOUT_SECONDS", "30"),
        )?;
        let answer_max_retries =
            parse_u32("CBT_ANSWER_MAX_RETRIES", env_or_default("CBT_ANSWER_MAX_RETRIES", "2"))?;

        let page_size = parse_positive_usize("CBT_PAGE_SIZE", env_or_default("CBT_PAGE_SIZE", "1"))?;
        let tick_millis = parse_u64("CBT_TICK_MILLIS", env_or_default("CBT_TICK_MILLIS", "1000"))?;

        let token_file = PathBuf::from(env_or_default("CBT_TOKEN_FILE", ".cbt_token"));
        let token = env_optional("CBT_TOKEN").or_else(|| load_token_file(&token_file));
        let student_id = env_optional("CBT_STUDENT_ID");

        let log_level = env_or_default("CBT_LOG_LEVEL", "warn");
        let json = env_optional("CBT_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings {
                base_url: ApiBaseUrl::parse(base_url)?,
                exam_path,
                answer_path,
                connect_timeout_seconds,
                request_timeout_seconds,
                answer_max_retries,
            },
            session: SessionSettings { page_size, tick_millis },
            credentials: CredentialSettings { student_id, token, token_file },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn credentials(&self) -> &CredentialSettings {
        &self.credentials
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub(crate) fn exam_url(&self) -> String {
        self.api.base_url.endpoint(&self.api.exam_path)
    }

    pub(crate) fn answer_url(&self) -> String {
        self.api.base_url.endpoint(&self.api.answer_path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.tick_millis == 0 {
            return Err(ConfigError::InvalidValue {
                field: "CBT_TICK_MILLIS",
                value: "0".to_string(),
            });
        }

        if self.api.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "CBT_REQUEST_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if !self.api.base_url.is_https() {
            return Err(ConfigError::InvalidBaseUrl(self.api.base_url.as_str().to_string()));
        }
        if self.credentials.token.is_none() {
            return Err(ConfigError::Missing("CBT_TOKEN/CBT_TOKEN_FILE"));
        }

        Ok(())
    }
}

#[cfg(test)]
impl Settings {
    pub(crate) fn for_tests() -> Self {
        Self {
            runtime: RuntimeSettings {
                environment: super::types::Environment::Test,
                strict_config: false,
            },
            api: ApiSettings {
                base_url: ApiBaseUrl("http://127.0.0.1:9".to_string()),
                exam_path: "/student/exam".to_string(),
                answer_path: "/student/answer".to_string(),
                connect_timeout_seconds: 1,
                request_timeout_seconds: 1,
                answer_max_retries: 0,
            },
            session: SessionSettings { page_size: 1, tick_millis: 1000 },
            credentials: CredentialSettings {
                student_id: Some("student-1".to_string()),
                token: Some("test-token".to_string()),
                token_file: std::env::temp_dir().join("cbt-test-token"),
            },
            telemetry: TelemetrySettings {
                log_level: "warn".to_string(),
                json: false,
                prometheus_enabled: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;
    use crate::core::config::Environment;

    const KEYS: &[&str] = &[
        "CBT_ENV",
        "ENVIRONMENT",
        "CBT_STRICT_CONFIG",
        "CBT_API_BASE_URL",
        "CBT_EXAM_PATH",
        "CBT_PAGE_SIZE",
        "CBT_TICK_MILLIS",
        "CBT_TOKEN",
        "CBT_TOKEN_FILE",
        "CBT_STUDENT_ID",
    ];

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
        std::env::set_var(
            "CBT_TOKEN_FILE",
            std::env::temp_dir().join("cbt-settings-test-missing-token"),
        );
    }

    #[test]
    fn load_uses_defaults() {
        let _guard = env_lock();
        clear_env();

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.runtime().environment, Environment::Development);
        assert_eq!(settings.exam_url(), "http://localhost:5000/api/student/exam");
        assert_eq!(settings.answer_url(), "http://localhost:5000/api/student/answer");
        assert_eq!(settings.session().page_size, 1);
        assert_eq!(settings.session().tick_millis, 1000);
        assert!(settings.credentials().token.is_none());
    }

    #[test]
    fn load_rejects_zero_page_size() {
        let _guard = env_lock();
        clear_env();
        std::env::set_var("CBT_PAGE_SIZE", "0");

        let result = Settings::load();
        std::env::remove_var("CBT_PAGE_SIZE");
        assert!(matches!(result, Err(ConfigError::InvalidValue { field: "CBT_PAGE_SIZE", .. })));
    }

    #[test]
    fn strict_mode_requires_https_and_token() {
        let _guard = env_lock();
        clear_env();
        std::env::set_var("CBT_STRICT_CONFIG", "1");

        let plain_http = Settings::load();
        assert!(matches!(plain_http, Err(ConfigError::InvalidBaseUrl(_))));

        std::env::set_var("CBT_API_BASE_URL", "https://cbt.example.com/api");
        let missing_token = Settings::load();
        assert!(matches!(missing_token, Err(ConfigError::Missing(_))));

        std::env::set_var("CBT_TOKEN", "abc");
        let settings = Settings::load().expect("strict settings");
        assert_eq!(settings.credentials().token.as_deref(), Some("abc"));

        clear_env();
    }
}
