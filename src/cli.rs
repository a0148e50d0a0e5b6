use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "carrierbot")]
#[command(author, version, about = "Webhook-driven Telegram bot with stateless inline buttons", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Serve the webhook (default)
    Serve,

    /// Register the webhook URL with Telegram
    SetWebhook {
        /// URL to register instead of the configured one
        #[arg(long)]
        url: Option<String>,
    },

    /// Remove the registered webhook
    DeleteWebhook,

    /// Publish the bot command menu
    SetCommands,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::try_parse_from(["carrierbot"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_set_webhook_url() {
        let cli = Cli::try_parse_from(["carrierbot", "set-webhook", "--url", "https://example.com/hook"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::SetWebhook {
                url: Some("https://example.com/hook".to_string())
            })
        );
    }

    #[test]
    fn test_other_subcommands() {
        let parse = |name: &str| Cli::try_parse_from(["carrierbot", name]).unwrap().command;
        assert_eq!(parse("serve"), Some(Commands::Serve));
        assert_eq!(parse("delete-webhook"), Some(Commands::DeleteWebhook));
        assert_eq!(parse("set-commands"), Some(Commands::SetCommands));
        assert!(Cli::try_parse_from(["carrierbot", "dance"]).is_err());
    }
}
