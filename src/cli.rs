use std::path::PathBuf;

use clap::Parser;

use crate::config::Settings;

/// Browser console for a relational database.
#[derive(Debug, Parser)]
#[command(name = "dmconsole", version, about)]
pub struct Args {
    /// Configuration file (json, toml or yaml). Defaults to ./config.json when present.
    #[arg(long, env = "DM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind the web service to.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind the web service to.
    #[arg(long)]
    pub port: Option<u16>,
}

impl Args {
    /// Applies the bind address flags on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.service.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.service.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_service_address() {
        let args = Args::try_parse_from(["dmconsole", "--host", "127.0.0.1", "--port", "9000"]).unwrap();
        let mut settings = Settings::load_with(None, |_| None).unwrap();
        args.apply(&mut settings);
        assert_eq!(settings.service.host, "127.0.0.1");
        assert_eq!(settings.service.port, 9000);
    }

    #[test]
    fn test_invalid_port_flag_is_rejected() {
        assert!(Args::try_parse_from(["dmconsole", "--port", "99999"]).is_err());
    }
}
