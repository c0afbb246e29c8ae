use args::Args;
use clap::Parser;

mod args;
mod chat;
mod logger;
mod tools;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init(&args);

    chat::run(args).await
}
