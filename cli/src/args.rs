use std::path::PathBuf;

use clap::ArgAction;
use clap::Parser;
use rootprompt_protocol::Activation;

/// Asks the user whether a pending superuser request may proceed and answers
/// the requester over its FIFO.
///
/// Activation parameters are passed like activity-manager intent extras.
#[derive(Debug, Parser)]
#[clap(
    author,
    version,
    bin_name = "rootprompt",
    override_usage = "rootprompt [OPTIONS] --es action request --ei uid <UID> --ei pid <PID> --es fifo <PATH>\n       rootprompt [OPTIONS] --es action result --ei from.uid <UID> --ei policy <1|2>"
)]
pub struct Cli {
    /// String extra.
    #[arg(
        long = "es",
        num_args = 2,
        value_names = ["KEY", "VALUE"],
        action = ArgAction::Append,
        allow_hyphen_values = true
    )]
    pub string_extras: Vec<String>,

    /// Integer extra.
    #[arg(
        long = "ei",
        num_args = 2,
        value_names = ["KEY", "VALUE"],
        action = ArgAction::Append,
        allow_hyphen_values = true
    )]
    pub int_extras: Vec<String>,

    /// Untyped extra, stored as a string.
    #[arg(short = 'e', long = "extra", value_parser = parse_extra_pair, value_name = "KEY=VALUE")]
    pub extras: Vec<(String, String)>,

    /// Home directory for config.toml and logs. Overrides ROOTPROMPT_HOME.
    #[arg(long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtraError {
    #[error("--ei {key}: {value:?} is not an integer")]
    BadInt { key: String, value: String },
}

impl Cli {
    /// Collects every extra into an [`Activation`]. Untyped extras go in
    /// first, then string extras, then integer extras; a later entry for the
    /// same key replaces an earlier one.
    pub fn activation(&self) -> Result<Activation, ExtraError> {
        let mut activation = Activation::new();
        for (key, value) in &self.extras {
            activation.put_str(key.as_str(), value.as_str());
        }
        for pair in self.string_extras.chunks_exact(2) {
            if let [key, value] = pair {
                activation.put_str(key.as_str(), value.as_str());
            }
        }
        for pair in self.int_extras.chunks_exact(2) {
            if let [key, value] = pair {
                let parsed = value.trim().parse::<i64>().map_err(|_| ExtraError::BadInt {
                    key: key.clone(),
                    value: value.clone(),
                })?;
                activation.put_int(key.as_str(), parsed);
            }
        }
        Ok(activation)
    }
}

fn parse_extra_pair(raw: &str) -> Result<(String, String), String> {
    let mut parts = raw.splitn(2, '=');
    let key = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "extras must be in KEY=VALUE form".to_string())?;
    let value = parts
        .next()
        .map(str::to_string)
        .ok_or_else(|| "extras must be in KEY=VALUE form".to_string())?;

    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rootprompt_protocol::ActivationValue;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("rootprompt").chain(args.iter().copied()))
    }

    #[test]
    fn typed_extras_build_a_live_request() -> anyhow::Result<()> {
        let cli = parse(&[
            "--es", "action", "request", "--ei", "uid", "10091", "--ei", "pid", "4321", "--es",
            "fifo", "/tmp/fifo1",
        ])?;

        let activation = cli.activation()?;

        assert_eq!(activation.get_str("action"), Some("request"));
        assert_eq!(activation.get("uid"), Some(&ActivationValue::Int(10091)));
        assert_eq!(activation.get_int("pid", -1), 4321);
        assert_eq!(activation.get_str("fifo"), Some("/tmp/fifo1"));
        Ok(())
    }

    #[test]
    fn untyped_extras_are_strings() -> anyhow::Result<()> {
        let cli = parse(&["-e", "action=result", "--extra", "from.uid=10091", "-e", "policy=2"])?;

        let activation = cli.activation()?;

        assert_eq!(
            activation.get("from.uid"),
            Some(&ActivationValue::Str("10091".to_string()))
        );
        assert_eq!(activation.get_int("policy", 0), 2);
        Ok(())
    }

    #[test]
    fn negative_integers_are_values_not_flags() -> anyhow::Result<()> {
        let cli = parse(&["--ei", "pid", "-1"])?;
        assert_eq!(cli.activation()?.get_int("pid", 0), -1);
        Ok(())
    }

    #[test]
    fn integer_extras_must_parse() -> anyhow::Result<()> {
        let cli = parse(&["--ei", "uid", "root"])?;
        assert_eq!(
            cli.activation().err(),
            Some(ExtraError::BadInt {
                key: "uid".to_string(),
                value: "root".to_string(),
            })
        );
        Ok(())
    }

    #[test]
    fn malformed_untyped_extra_is_a_usage_error() {
        assert!(parse(&["-e", "action"]).is_err());
        assert!(parse(&["-e", "=request"]).is_err());
        assert!(parse(&["--es", "action"]).is_err());
    }

    #[test]
    fn config_dir_is_optional() -> anyhow::Result<()> {
        assert_eq!(parse(&[])?.config_dir, None);
        assert_eq!(
            parse(&["--config-dir", "/data/local/tmp/rp"])?.config_dir,
            Some(PathBuf::from("/data/local/tmp/rp"))
        );
        Ok(())
    }
}
