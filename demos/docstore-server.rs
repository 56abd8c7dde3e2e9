//! In-memory document store backend for demonstrating tonic-lb-fleet.
//!
//! Each instance reports its hostname in replies so a load-balancing client
//! can verify that calls fan out across the fleet. Run several instances on
//! different ports and point `docstore-client` at them.
//!
//! # Running locally
//!
//! ```bash
//! GRPC_PORT=50051 cargo run --example docstore-server --features demos
//! GRPC_PORT=50052 cargo run --example docstore-server --features demos
//! ```
//!
//! # Environment Variables
//!
//! - `GRPC_PORT`: Port to listen on (default: 50051)
//! - `HOSTNAME`: Included in replies (set automatically in Kubernetes)

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::sync::Mutex;

use tonic::{Request, Response, Status, transport::Server};
use tonic_lb_fleet::HealthRegistry;
use tracing::{Level, info};

pub mod docstore {
    tonic::include_proto!("docstore");
}

use docstore::document_store_server::{DocumentStore, DocumentStoreServer};
use docstore::{Document, InsertReply, InsertRequest, QueryReply, QueryRequest};

const SERVICE_NAME: &str = "docstore.DocumentStore";

#[derive(Debug, Default)]
pub struct MemoryStore {
    hostname: String,
    documents: Mutex<HashMap<(String, String), Document>>,
}

impl MemoryStore {
    fn new() -> Self {
        let hostname = env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
        Self {
            hostname,
            documents: Mutex::new(HashMap::new()),
        }
    }
}

#[tonic::async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(
        &self,
        request: Request<InsertRequest>,
    ) -> Result<Response<InsertReply>, Status> {
        let document = request
            .into_inner()
            .document
            .ok_or_else(|| Status::invalid_argument("document required"))?;

        if document.id.is_empty() || document.collection.is_empty() {
            return Err(Status::invalid_argument("id and collection required"));
        }

        info!(
            "Insert: {}/{} ({} bytes)",
            document.collection,
            document.id,
            document.payload.len()
        );

        let inserted_id = document.id.clone();
        let key = (document.collection.clone(), document.id.clone());
        self.documents.lock().unwrap().insert(key, document);

        Ok(Response::new(InsertReply {
            inserted_id,
            served_by: self.hostname.clone(),
        }))
    }

    async fn query(
        &self,
        request: Request<QueryRequest>,
    ) -> Result<Response<QueryReply>, Status> {
        let query = request.into_inner();
        if query.collection.is_empty() {
            return Err(Status::invalid_argument("collection required"));
        }

        let documents = self.documents.lock().unwrap();
        let matches: Vec<Document> = documents
            .iter()
            .filter(|((collection, id), _)| {
                *collection == query.collection && (query.id.is_empty() || *id == query.id)
            })
            .map(|(_, document)| document.clone())
            .collect();

        info!(
            "Query: {}/{} -> {} documents",
            query.collection,
            query.id,
            matches.len()
        );

        Ok(Response::new(QueryReply {
            documents: matches,
            served_by: self.hostname.clone(),
        }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    let port: u16 = env::var("GRPC_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(50051);

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    let store = MemoryStore::new();

    // Report overall and per-service health; a health-checking client reads
    // these to keep the instance in (or out of) rotation.
    let health = HealthRegistry::new();
    health.register(HealthRegistry::OVERALL);
    health.register(SERVICE_NAME);

    info!("Document store listening on {addr}");
    info!("Hostname: {}", store.hostname);
    info!(
        "Health: {SERVICE_NAME} -> {}",
        health.serving_status(SERVICE_NAME)
    );

    Server::builder()
        .add_service(DocumentStoreServer::new(store))
        .serve(addr)
        .await?;

    Ok(())
}
