#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = cbt_exam_client::run().await {
        eprintln!("cbt-exam fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
