//! Config subcommand handlers.

use std::path::{Path, PathBuf};

use serde::Serialize;

use inels_config::{Config, Profile, load_config_from, profile_to_broker_config, save_config_to};
use inels_core::Transport;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// `--config` if given, the platform config path otherwise.
pub fn resolve_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(inels_config::config_path)
}

/// Resolved view printed by `config show`.
#[derive(Debug, Serialize)]
struct ConfigView {
    path: PathBuf,
    active_profile: String,
    #[serde(flatten)]
    config: Config,
}

/// Broker settings a profile resolves to, printed by `config check`.
#[derive(Debug, Serialize)]
struct BrokerView {
    profile: String,
    host: String,
    port: u16,
    transport: Transport,
    username: Option<String>,
    password_set: bool,
    timeout_secs: u64,
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_field<T: std::str::FromStr>(
    field: &str,
    value: &str,
    expected: &str,
) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

/// Apply `config set <key> <value>` to a profile.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "host" => {
            if value.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "host".into(),
                    reason: "must not be empty".into(),
                });
            }
            profile.host = value;
        }
        "port" => {
            let port: u16 = parse_field("port", &value, "a number between 1 and 65535")?;
            if port == 0 {
                return Err(CliError::Validation {
                    field: "port".into(),
                    reason: "must be a number between 1 and 65535".into(),
                });
            }
            profile.port = port;
        }
        "transport" => {
            profile.transport = parse_field("transport", &value, "'tcp' or 'websockets'")?;
        }
        "username" => profile.username = Some(value),
        "password_env" | "password-env" => profile.password_env = Some(value),
        "timeout" => {
            profile.timeout = Some(parse_field("timeout", &value, "a number (seconds)")?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: host, port, transport, \
                     username, password_env, timeout"
                ),
            });
        }
    }
    Ok(())
}

fn show(path: PathBuf, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = load_config_from(&path)?;
    let active_profile = cfg.active_profile_name(global.profile.as_deref());
    if global.profile.is_some() {
        // An explicit --profile must exist.
        cfg.profile(&active_profile)?;
    }
    tracing::debug!(path = %path.display(), profile = %active_profile, "showing config");

    let view = ConfigView {
        path,
        active_profile,
        config: cfg.redacted(),
    };
    let out = output::render_single(global.output, &view, |v| {
        let body =
            toml::to_string_pretty(&v.config).map_err(|e| CliError::Render(e.to_string()))?;
        Ok(format!(
            "# {}\n# active profile: {}\n\n{body}",
            v.path.display(),
            v.active_profile
        ))
    })?;
    output::print_output(&out)
}

fn check(path: &Path, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = load_config_from(path)?;
    let name = cfg.active_profile_name(global.profile.as_deref());
    let broker = profile_to_broker_config(cfg.profile(&name)?, &name, &cfg.defaults)?;
    tracing::info!(profile = %name, host = %broker.host, "profile is valid");

    let view = BrokerView {
        profile: name,
        host: broker.host,
        port: broker.port,
        transport: broker.transport,
        username: broker.username,
        password_set: broker.password.is_some(),
        timeout_secs: broker.timeout.as_secs(),
    };
    let out = output::render_single(global.output, &view, |v| {
        Ok(format!(
            "profile:   {}\nbroker:    {}:{} ({})\nusername:  {}\npassword:  {}\ntimeout:   {}s",
            v.profile,
            v.host,
            v.port,
            v.transport,
            v.username.as_deref().unwrap_or("-"),
            if v.password_set { "set" } else { "not set" },
            v.timeout_secs
        ))
    })?;
    output::print_output(&out)
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = resolve_path(global);
    match &args.command {
        ConfigCommand::Path => output::print_output(&path.display().to_string()),

        ConfigCommand::Show => show(path, global),

        ConfigCommand::Check => check(&path, global),

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = load_config_from(&path)?;
            let profile_name = cfg.active_profile_name(global.profile.as_deref());
            let profile = cfg
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(|| Profile::new(""));
            set_key(profile, key, value.clone())?;

            save_config_to(&cfg, &path)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = load_config_from(&path)?;
            let default = cfg.active_profile_name(None);
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: inels config set host <broker>");
                return Ok(());
            }
            let listing: Vec<String> = cfg
                .profiles
                .keys()
                .map(|name| {
                    let marker = if *name == default { " *" } else { "" };
                    format!("{name}{marker}")
                })
                .collect();
            output::print_output(&listing.join("\n"))
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = load_config_from(&path)?;
            cfg.profile(name)?;
            cfg.default_profile = Some(name.clone());
            save_config_to(&cfg, &path)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let cfg = load_config_from(&path)?;
            let profile_name = profile
                .clone()
                .unwrap_or_else(|| cfg.active_profile_name(global.profile.as_deref()));
            cfg.profile(&profile_name)?;

            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            inels_config::store_password(&profile_name, &secret)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_key_parses_typed_values() {
        let mut profile = Profile::new("h");
        set_key(&mut profile, "port", "8883".into()).unwrap();
        set_key(&mut profile, "transport", "websockets".into()).unwrap();
        set_key(&mut profile, "timeout", "12".into()).unwrap();
        assert_eq!(profile.port, 8883);
        assert_eq!(profile.transport, Transport::Websockets);
        assert_eq!(profile.timeout, Some(12));
    }

    #[test]
    fn set_key_rejects_bad_values() {
        let mut profile = Profile::new("h");
        for (key, value) in [
            ("port", "0"),
            ("port", "http"),
            ("transport", "udp"),
            ("host", "  "),
            ("colour", "blue"),
        ] {
            let err = set_key(&mut profile, key, value.into()).unwrap_err();
            assert!(matches!(err, CliError::Validation { .. }), "{key}={value}");
        }
        assert_eq!(profile, Profile::new("h"));
    }
}
