use anyhow::Result;
use bosun::cli::App;

#[tokio::main]
async fn main() -> Result<()> {
    let mut app = App::from_args()?;
    let args = bosun::cli::Args::parse_args();

    app.run(args).await?;

    Ok(())
}
