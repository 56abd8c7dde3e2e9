//! Document store client demonstrating tonic-lb-fleet load balancing.
//!
//! Connects to a fleet of `docstore-server` instances through one logical
//! channel and shows that calls are distributed round-robin across all
//! backends.
//!
//! # Running locally
//!
//! Start two servers (ports 50051 and 50052), then:
//!
//! ```bash
//! cargo run --example docstore-client --features demos
//! ```
//!
//! # Environment Variables
//!
//! - `FLEET_TARGET`: Target descriptor
//!   (default: `static:///127.0.0.1:50051,127.0.0.1:50052`).
//!   Use `dns:///my-headless-service:50051` in Kubernetes.
//! - `REQUEST_COUNT`: Number of documents to insert (default: 20)

use std::collections::HashMap;
use std::env;

use tonic_lb_fleet::{ConnectionPolicy, FleetChannel};
use tracing::{Level, error, info};

pub mod docstore {
    tonic::include_proto!("docstore");
}

use docstore::document_store_client::DocumentStoreClient;
use docstore::{Document, InsertRequest, QueryRequest};

const SERVICE_NAME: &str = "docstore.DocumentStore";
const COLLECTION: &str = "fleet_demo";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    let target = env::var("FLEET_TARGET")
        .unwrap_or_else(|_| "static:///127.0.0.1:50051,127.0.0.1:50052".to_string());
    let request_count: u32 = env::var("REQUEST_COUNT")
        .ok()
        .and_then(|c| c.parse().ok())
        .unwrap_or(20);

    info!("Starting document store client");
    info!("Target: {target}");
    info!("Request count: {request_count}");

    // One logical channel for the whole fleet; each call picks the next
    // healthy backend.
    let policy = ConnectionPolicy::new(SERVICE_NAME);
    info!("Service config: {}", policy.service_config_json());

    let channel = FleetChannel::connect(&target, policy)?;

    // Track which backend serves each request
    let mut backend_counts: HashMap<String, u32> = HashMap::new();

    info!("Inserting {request_count} documents...\n");

    for i in 1..=request_count {
        let request = tonic::Request::new(InsertRequest {
            document: Some(Document {
                id: format!("doc-{i:03}"),
                collection: COLLECTION.to_string(),
                payload: format!("payload-{i}").into_bytes(),
            }),
        });

        let mut client = DocumentStoreClient::new(channel.subchannel().await?);
        match client.insert(request).await {
            Ok(response) => {
                let reply = response.into_inner();
                info!("Insert {i}: id={} (served by: {})", reply.inserted_id, reply.served_by);

                *backend_counts.entry(reply.served_by).or_insert(0) += 1;
            }

            Err(e) => {
                error!("Insert {i} failed: {e}");
            }
        }
    }

    // Read one document back through the same channel
    let request = tonic::Request::new(QueryRequest {
        collection: COLLECTION.to_string(),
        id: "doc-001".to_string(),
    });

    let mut client = DocumentStoreClient::new(channel.subchannel().await?);
    match client.query(request).await {
        Ok(response) => {
            let reply = response.into_inner();
            info!(
                "Query: {} documents (served by: {})",
                reply.documents.len(),
                reply.served_by
            );
        }

        Err(e) => {
            error!("Query failed: {e}");
        }
    }

    // Print summary
    info!("\n=== Load Balancing Summary ===");
    for (backend, count) in &backend_counts {
        let percentage = (f64::from(*count) / f64::from(request_count)) * 100.0;
        info!("{backend}: {count} requests ({percentage:.1}%)");
    }

    info!("Total backends used: {}", backend_counts.len());

    channel.close();

    Ok(())
}
