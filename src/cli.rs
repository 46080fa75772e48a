use clap::{Parser, Subcommand};

/// UniPlus middleware: REST surface over the UniPlus ERP and Portal Comercial
#[derive(Parser)]
#[command(name = "uniplus-middleware", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default when no command is given)
    Serve {
        /// Port to bind; overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Acquire an ERP access token and report how long it stays valid
    Token,
}

/// Shows only the edges of a secret.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    } else {
        "****".to_string()
    }
}
