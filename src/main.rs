use clap::{Parser, Subcommand};
use log::{info, warn};
use pzrcon::{Client, ClientConfig, RconError};
use std::{error::Error, time::Duration};
use tokio::io::{self, AsyncBufReadExt, BufReader};

/// Run rcon commands against a Project Zomboid server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address
    #[arg(short = 'H', long, env = "RCON_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Rcon port
    #[arg(short, long, env = "RCON_PORT", default_value_t = pzrcon::config::DEFAULT_PORT)]
    port: u16,

    /// Rcon password, used exactly as given
    #[arg(short = 'P', long, env = "RCON_PASSWORD", hide_env_values = true)]
    password: String,

    /// Seconds to wait for the connection and for each response
    #[arg(short, long, env = "RCON_TIMEOUT", default_value_t = 10)]
    timeout: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run each argument as one command and print the output
    Exec {
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// Broadcast a message to all players
    Announce { message: String },
    /// Save the world
    Save,
    /// Read commands from stdin, one per line
    Shell,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = ClientConfig::new(args.host, args.port, args.password)
        .timeout(Duration::from_secs(args.timeout));
    let mut client = Client::new(config);
    client.connect().await?;

    let result = match args.command.unwrap_or(Command::Shell) {
        Command::Exec { commands } => exec(&mut client, &commands).await,
        Command::Announce { message } => client.server_message(&message).await.map(print_output),
        Command::Save => client.save().await.map(print_output),
        Command::Shell => shell(&mut client).await,
    };

    client.disconnect().await;
    info!("bye");
    Ok(result?)
}

fn print_output(output: String) {
    if !output.is_empty() {
        println!("{}", output);
    }
}

async fn exec(client: &mut Client, commands: &[String]) -> Result<(), RconError> {
    for command in commands {
        print_output(client.execute_command(command).await?);
    }
    Ok(())
}

async fn shell(client: &mut Client) -> Result<(), RconError> {
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("cannot read from stdin: {}", e);
                return Ok(());
            }
        };

        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if command == "quit" || command == "exit" {
            return Ok(());
        }

        if !client.is_authenticated() {
            info!("reconnecting to {}", client.config().addr());
            client.connect().await?;
        }

        match client.execute_command(command).await {
            Ok(output) => print_output(output),
            Err(e) => eprintln!("error: {}", e),
        }
    }
}
