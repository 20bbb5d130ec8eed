use bingo_email_lettre::SmtpSettings;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct LogFileSettings {
    pub path: String,
    pub archive_pattern: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub http_host: String,
    pub http_port: u16,
    pub bcrypt_cost: u32,
    pub smtp: Option<SmtpSettings>,
    pub log_file: Option<LogFileSettings>,
}

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_BCRYPT_COST: u32 = 12;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let http_host = var("BINGO_HTTP_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let http_port = match var("BINGO_HTTP_PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "BINGO_HTTP_PORT",
                value,
            })?,
            None => Self::DEFAULT_PORT,
        };
        let bcrypt_cost = match var("BINGO_BCRYPT_COST") {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => cost,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "BINGO_BCRYPT_COST",
                        value,
                    });
                }
            },
            None => Self::DEFAULT_BCRYPT_COST,
        };

        // SMTP is all or nothing
        let smtp = match (
            var("BINGO_EMAIL_HOST"),
            var("BINGO_EMAIL_USER"),
            var("BINGO_EMAIL_PASSWORD"),
            var("BINGO_EMAIL_FROM"),
        ) {
            (Some(host), Some(user), Some(password), Some(from)) => Some(SmtpSettings {
                host,
                user,
                password,
                from,
            }),
            (None, None, None, None) => None,
            (host, user, password, _) => {
                let missing = if host.is_none() {
                    "BINGO_EMAIL_HOST"
                } else if user.is_none() {
                    "BINGO_EMAIL_USER"
                } else if password.is_none() {
                    "BINGO_EMAIL_PASSWORD"
                } else {
                    "BINGO_EMAIL_FROM"
                };
                return Err(ConfigError::Missing(missing));
            }
        };

        let log_file = match (var("LOG_FILE_PATH"), var("LOG_ARCHIVE_PATTERN")) {
            (Some(path), Some(archive_pattern)) => Some(LogFileSettings {
                path,
                archive_pattern,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("LOG_ARCHIVE_PATTERN")),
            (None, Some(_)) => return Err(ConfigError::Missing("LOG_FILE_PATH")),
        };

        Ok(ServerConfig {
            database_url,
            http_host,
            http_port,
            bcrypt_cost,
            smtp,
            log_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("DATABASE_URL", "sqlite://bingo.db?mode=rwc")]).unwrap();
        assert_eq!(config.http_host, "127.0.0.1");
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.bcrypt_cost, 12);
        assert!(config.smtp.is_none());
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            config(&[]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        assert!(matches!(
            config(&[("DATABASE_URL", "sqlite::memory:"), ("BINGO_HTTP_PORT", "http")]),
            Err(ConfigError::Invalid {
                name: "BINGO_HTTP_PORT",
                ..
            })
        ));
        assert!(matches!(
            config(&[("DATABASE_URL", "sqlite::memory:"), ("BINGO_BCRYPT_COST", "2")]),
            Err(ConfigError::Invalid {
                name: "BINGO_BCRYPT_COST",
                ..
            })
        ));
    }

    #[test]
    fn test_partial_smtp_settings() {
        assert_eq!(
            config(&[
                ("DATABASE_URL", "sqlite::memory:"),
                ("BINGO_EMAIL_HOST", "smtp.example.com"),
                ("BINGO_EMAIL_USER", "bingo"),
            ])
            .unwrap_err(),
            ConfigError::Missing("BINGO_EMAIL_PASSWORD")
        );

        let config = config(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("BINGO_EMAIL_HOST", "smtp.example.com"),
            ("BINGO_EMAIL_USER", "bingo"),
            ("BINGO_EMAIL_PASSWORD", "secret"),
            ("BINGO_EMAIL_FROM", "Bingo <bingo@example.com>"),
        ])
        .unwrap();
        assert_eq!(config.smtp.map(|s| s.host).as_deref(), Some("smtp.example.com"));
    }
}
