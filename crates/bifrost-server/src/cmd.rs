//! Command handlers for the `bifrost-server` binary.

use std::io::Write;

use bifrost_store::Endpoint;

use crate::service::EndpointService;

/// Report the table the bootstrap ensured.
pub fn init(service: &EndpointService, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "Schema ready: {}", service.store().model().table_name())?;
    Ok(())
}

pub async fn create_endpoint(
    service: &EndpointService,
    name: &str,
    owner: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let details = service
        .create_endpoint(Endpoint {
            name: name.to_string(),
            owner: owner.to_string(),
            tags: Vec::new(),
        })
        .await?;
    writeln!(out, "{details}")?;
    Ok(())
}

pub async fn list_endpoints(service: &EndpointService, out: &mut impl Write) -> anyhow::Result<()> {
    let endpoints = service.list_endpoints().await?;
    if endpoints.is_empty() {
        writeln!(out, "No endpoints")?;
        return Ok(());
    }
    for endpoint in endpoints {
        writeln!(
            out,
            "{}\t{}\t{}",
            endpoint.name,
            endpoint.owner,
            endpoint.tags.join(",")
        )?;
    }
    Ok(())
}
