mod cli;
mod context;
mod core;
mod database;
mod error;
mod models;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();
    if let Err(e) = cli::run().await {
        // full detail goes to the log only; users see the error kind
        log::error!("{:?}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
