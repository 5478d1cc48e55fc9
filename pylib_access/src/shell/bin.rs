// Binary entry point for pylib_access
// This is a thin wrapper that delegates to the library implementation

use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    if let Err(e) = pylib_access::shell::run().await {
        eprintln!("pylib_access fatal error: {:#}", e);
        return Err(e);
    }
    Ok(())
}
