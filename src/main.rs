#[cfg(feature = "server")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    texto_maestro::server::run().await
}
