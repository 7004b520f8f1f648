use anyhow::Result;
use clap::Parser;
use client_core::{load_settings, BoardClient};
use shared::domain::WorkspaceItem;

/// Tails the shared dashboard workspace and every broker topic.
#[derive(Parser, Debug)]
struct Args {
    /// Broker host; overrides broker.toml and the environment.
    #[arg(long)]
    host: Option<String>,
    /// Broker port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }

    let client = BoardClient::new(settings);
    client
        .events()
        .set_connection_state_listener(Box::new(|state| {
            println!("connection: {state:?}");
        }));
    client.events().set_workspace_listener(Box::new(|workspace| {
        println!("workspace: {} items", workspace.items.len());
        for item in &workspace.items {
            match item {
                WorkspaceItem::Section(section) => {
                    println!("  == {} [{}]", section.title, section.id);
                }
                WorkspaceItem::Text(text) => {
                    println!("  {} <- {} [{}]", text.title, text.topic, text.id);
                }
            }
        }
    }));
    client.events().set_data_listener(Box::new(|topic, payload| {
        println!("{topic}: {payload}");
    }));
    client.events().set_notice_listener(Box::new(|message| {
        eprintln!("notice: {message}");
    }));

    client.connect().await;
    tokio::signal::ctrl_c().await?;
    client.disconnect().await;

    Ok(())
}
