use std::env;

use url::Url;

#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub discord_webhook_url: Option<Url>,
    /// Collected while parsing and logged by the caller.
    pub warnings: Vec<String>,
}

impl NotificationConfig {
    pub fn from_env() -> Self {
        Self::from_values(
            env::var("DISCORD_NOTIFY_ENABLED").ok().as_deref(),
            env::var("DISCORD_WEBHOOK_URL").ok().as_deref(),
        )
    }

    pub(crate) fn from_values(enabled: Option<&str>, webhook_url: Option<&str>) -> Self {
        let mut warnings = Vec::new();

        let enabled = match enabled.map(parse_bool) {
            Some(Some(value)) => value,
            Some(None) => {
                warnings.push("DISCORD_NOTIFY_ENABLED is not a boolean; assuming true".to_string());
                true
            }
            None => true,
        };

        let raw = webhook_url.map(str::trim).filter(|v| !v.is_empty());
        let discord_webhook_url = match raw {
            Some(raw) if enabled => match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    // the raw value carries the webhook token
                    warnings.push(format!(
                        "DISCORD_WEBHOOK_URL is invalid; discord alerts disabled (parse error: {err})"
                    ));
                    None
                }
            },
            _ => None,
        };

        Self {
            discord_webhook_url,
            warnings,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_flag_wins_over_url() {
        let config = NotificationConfig::from_values(Some("off"), Some("https://discord.test/hook"));
        assert!(config.discord_webhook_url.is_none());
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn invalid_url_becomes_a_warning() {
        let config = NotificationConfig::from_values(None, Some("not a url"));
        assert!(config.discord_webhook_url.is_none());
        assert_eq!(config.warnings.len(), 1);
        assert!(!config.warnings[0].contains("not a url"));
    }

    #[test]
    fn valid_url_enables_discord() {
        let config = NotificationConfig::from_values(Some("yes"), Some(" https://discord.test/hook "));
        assert_eq!(
            config.discord_webhook_url.map(|u| u.to_string()),
            Some("https://discord.test/hook".to_string())
        );
    }
}
