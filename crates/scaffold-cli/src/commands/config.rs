//! `scaffold config get|set|list|reset`

use crate::errors::CommandError;
use crate::result::CommandResult;
use clap::Subcommand;
use scaffold_config::{Config, CONFIG_KEYS};
use scaffold_logger as logger;
use serde_json::{Map, Value};

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the value of one setting
    Get { key: String },
    /// Change one setting
    Set { key: String, value: String },
    /// Print every setting that has been set
    List,
    /// Delete the configuration file
    Reset,
}

pub fn run(action: &ConfigAction) -> Result<CommandResult, CommandError> {
    if let ConfigAction::Reset = action {
        Config::reset()?;
        return Ok(CommandResult::ok("Configuration reset to defaults")
            .with("path", Config::path().to_string_lossy().into_owned()));
    }

    let mut config = Config::load()?;
    let (result, changed) = apply(&mut config, action)?;
    if changed {
        config.save()?;
        logger::debug(&format!("Saved {}", Config::path().display()));
    }
    Ok(result.with("path", Config::path().to_string_lossy().into_owned()))
}

/// Apply an action to a loaded config. The flag says whether it must be
/// saved.
pub fn apply(config: &mut Config, action: &ConfigAction) -> Result<(CommandResult, bool), CommandError> {
    match action {
        ConfigAction::Get { key } => {
            let value = config.get(key)?;
            let message = match &value {
                Some(value) => format!("{key} = {value}"),
                None => format!("{key} is not set"),
            };
            Ok((
                CommandResult::ok(message)
                    .with("key", key.as_str())
                    .with("value", value.map(Value::String).unwrap_or(Value::Null)),
                false,
            ))
        }
        ConfigAction::Set { key, value } => {
            config.set(key, value)?;
            Ok((
                CommandResult::ok(format!("Set {key} = {value}"))
                    .with("key", key.as_str())
                    .with("value", value.as_str()),
                true,
            ))
        }
        ConfigAction::List => {
            let values: Map<String, Value> = config
                .values_iter()
                .into_iter()
                .map(|(key, value)| (key.to_string(), Value::String(value)))
                .collect();
            let message = if values.is_empty() {
                format!("No settings configured. Available keys: {}", CONFIG_KEYS.join(", "))
            } else {
                values
                    .iter()
                    .map(|(key, value)| format!("{key} = {}", value.as_str().unwrap_or_default()))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            Ok((CommandResult::ok(message).with("values", Value::Object(values)), false))
        }
        ConfigAction::Reset => {
            *config = Config::default();
            Ok((CommandResult::ok("Configuration reset to defaults"), true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaffold_config::ConfigError;

    #[test]
    fn test_set_then_get() {
        let mut config = Config::default();
        let (_, changed) = apply(
            &mut config,
            &ConfigAction::Set {
                key: "indent-width".into(),
                value: "2".into(),
            },
        )
        .unwrap();
        assert!(changed);

        let (result, changed) = apply(
            &mut config,
            &ConfigAction::Get {
                key: "indent-width".into(),
            },
        )
        .unwrap();
        assert!(!changed);
        assert_eq!(result.message, "indent-width = 2");
        assert_eq!(result.field_str("value"), Some("2"));
    }

    #[test]
    fn test_list_empty_and_filled() {
        let mut config = Config::default();
        let (result, _) = apply(&mut config, &ConfigAction::List).unwrap();
        assert!(result.message.starts_with("No settings configured"));

        config.set("quote-style", "double").unwrap();
        config.set("trailing-commas", "false").unwrap();
        let (result, _) = apply(&mut config, &ConfigAction::List).unwrap();
        assert_eq!(result.message, "quote-style = double\ntrailing-commas = false");
        assert_eq!(result.fields["values"]["quote-style"], "double");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        let err = apply(
            &mut config,
            &ConfigAction::Set {
                key: "package-manager".into(),
                value: "maven".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Config(ConfigError::InvalidValue { .. })));

        let err = apply(
            &mut config,
            &ConfigAction::Get {
                key: "colour".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Config(ConfigError::UnknownKey(_))));
        assert!(config.is_empty());
    }
}
