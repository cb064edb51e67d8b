pub mod apply;
pub mod doctor;
pub mod manifest;
pub mod policies;
pub mod status;

use anyhow::{Result, anyhow};
use confluence::ConfluenceClient;
use provision::{MockClient, ResourceClient};

use crate::config::Config;

/// Build the Confluence client and check that the site answers
pub fn connect(config: &Config) -> Result<ConfluenceClient> {
    let client_config = config
        .client_config()
        .map_err(|e| anyhow!("{e}\n  {}", e.advice()))?;
    let client = ConfluenceClient::new(client_config);
    client
        .probe()
        .map_err(|e| anyhow!("{e}\n  {}", e.advice()))?;
    Ok(client)
}

/// The client a command runs against, and a label for it
pub fn client(config: &Config, mock: bool) -> Result<(Box<dyn ResourceClient>, String)> {
    if mock {
        return Ok((Box::new(MockClient::new()), "in-memory site".to_string()));
    }
    let client = connect(config)?;
    let label = client.config().base_url.clone();
    Ok((Box::new(client), label))
}
