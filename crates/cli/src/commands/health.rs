//! API health check.

use jalapeno_client::JalapenoClient;

use super::CommandError;

/// Check that the API is up.
#[allow(clippy::print_stdout)]
pub async fn check(client: &JalapenoClient) -> Result<(), CommandError> {
    let health = client.health().await?;
    if !health.is_healthy() {
        return Err(CommandError::Unhealthy(health.status));
    }

    println!("API at {} is healthy", client.base_url());
    Ok(())
}
