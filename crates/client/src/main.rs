use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{Result, eyre};
use serde::Serialize;

use signserver::{WorkerId, WorkerType};
use signserver_client::SignServerClient;

#[derive(Parser)]
#[command(about = "Administer and call a signserver instance")]
struct Args {
    /// Base URL of the signserver instance
    #[clap(long, env = "SIGNSERVER_URL", default_value = "http://127.0.0.1:3000")]
    server: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List worker ids
    List,
    /// Add a worker
    Add {
        id: u32,
        name: String,
        #[clap(long = "type", default_value = "document-signer")]
        worker_type: WorkerType,
        #[clap(long)]
        auto_configure: bool,
    },
    /// Remove a worker
    Remove { worker: String },
    /// Stage a property value
    Set { worker: String, key: String, value: String },
    /// Read a staged property value
    Get { worker: String, key: String },
    /// Remove a staged property
    Unset { worker: String, key: String },
    /// Validate and activate the staged configuration
    Reload { worker: String },
    /// Show worker status
    Status { worker: String },
    /// Sign a file and write the signed output
    Process {
        worker: String,
        file: PathBuf,
        #[clap(long, default_value = "0")]
        request_id: i32,
        /// Destination for the signed payload, stdout as hex if omitted
        #[clap(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = SignServerClient::new(&args.server);
    run(&client, args.command).await.map_err(|e| eyre!("{e:#}"))
}

async fn run(client: &SignServerClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List => print_json(&client.list().await?),
        Command::Add { id, name, worker_type, auto_configure } => print_json(
            &client
                .add(WorkerId::new(id), &name, worker_type, auto_configure)
                .await?,
        ),
        Command::Remove { worker } => {
            client.remove(&worker).await?;
            println!("Removed {worker}");
            Ok(())
        }
        Command::Set { worker, key, value } => {
            client.set_property(&worker, &key, &value).await?;
            println!("Staged {key} for {worker}, reload to apply");
            Ok(())
        }
        Command::Get { worker, key } => print_json(&client.get_property(&worker, &key).await?),
        Command::Unset { worker, key } => {
            print_json(&client.remove_property(&worker, &key).await?)
        }
        Command::Reload { worker } => print_json(&client.reload(&worker).await?),
        Command::Status { worker } => print_json(&client.status(&worker).await?),
        Command::Process { worker, file, request_id, out } => {
            let payload = tokio::fs::read(&file).await?;
            let response = client.process(&worker, request_id, payload).await?;
            match out {
                Some(path) => {
                    tokio::fs::write(&path, &response.signed_payload).await?;
                    println!(
                        "Request {} signed by {}, wrote {}",
                        response.request_id,
                        response.signer_certificate.subject,
                        path.display()
                    );
                }
                None => println!("{}", hex::encode(&response.signed_payload)),
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
