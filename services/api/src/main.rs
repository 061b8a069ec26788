use hemoconnect_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("hemoconnect error: {err}");
        std::process::exit(1);
    }
}
