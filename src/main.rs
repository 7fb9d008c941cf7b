use clap::Parser;
use net_score_app::{Args, Error};

/// Scores GitHub and npm packages, one JSON line per package.
#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    net_score_app::run(args).await
}
