//! Voice bridge server binary
//!
//! Usage:
//! ```bash
//! UPSTREAM_API_KEY=sk-... BUS_URL=redis://localhost:6379 \
//!   DIRECTORY_URL=http://localhost:9000 voicebridge-server
//! ```

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    voicebridge_server::run().await
}
