use anyhow::Result;
use portablemc_core::events::Event;
use portablemc_core::{install, AuthSession, InstallerConfig};
use tokio::sync::mpsc;

async fn print_events(mut rx: mpsc::UnboundedReceiver<Event>) {
    while let Some(event) = rx.recv().await {
        match event {
            Event::FetchVersion { family, url } => println!("fetching {family} profile from {url}"),
            Event::LibrariesLoadStart { count } => println!("downloading {count} libraries"),
            Event::DownloadProgress { done_count, total_count, .. } => {
                print!("\r{done_count}/{total_count} files");
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = InstallerConfig {
        version: "fabric:1.20.4:0.16.0".to_string(),
        ..InstallerConfig::default()
    };
    let auth = AuthSession::offline("Steve");

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx));
    let game = install(&cfg, &auth, false, Some(tx)).await?;
    printer.await?;

    println!("\ninstalled {} with fixes: {:?}", game.id, game.applied_fixes);
    println!("{:#?}", game.command_line());
    Ok(())
}
