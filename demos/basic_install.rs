use anyhow::Result;
use portablemc_core::events::Event;
use portablemc_core::{install, AuthSession, InstallerConfig};
use tokio::sync::mpsc;

async fn print_events(mut rx: mpsc::UnboundedReceiver<Event>) {
    while let Some(event) = rx.recv().await {
        match event {
            Event::ClientLoadStart => println!("downloading client jar"),
            Event::LibrariesLoadStart { count } => println!("downloading {count} libraries"),
            Event::AssetsLoadStart { index_id } => println!("downloading assets ({index_id})"),
            Event::JvmLoadStart { major } => println!("provisioning java {major}"),
            Event::DownloadProgress { done_count, total_count, .. } => {
                print!("\r{done_count}/{total_count} files");
            }
            Event::FixApplied { name } => println!("\napplied fix: {name}"),
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = InstallerConfig {
        version: "1.20.1".to_string(),
        ..InstallerConfig::default()
    };
    let auth = AuthSession::offline("Steve");

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx));
    let game = install(&cfg, &auth, false, Some(tx)).await?;
    printer.await?;
    println!("\nready: {}", game.id);

    game.spawn()?.wait().await?;
    Ok(())
}
