pub mod handlers;
pub mod middlewares;
pub mod router;
pub mod state;

use crate::{
    conf::settings,
    pkg::internal::minio::{create_bucket, s3_client},
    prelude::Result,
};
use router::build_routes;

pub async fn listen() -> Result<()> {
    if create_bucket(&s3_client(), &settings.s3_bucket_name)
        .await?
        .is_some()
    {
        tracing::info!("created bucket {}", &settings.s3_bucket_name);
    }
    let listener =
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.listen_port.clone())).await?;
    tracing::info!("Listening at port {}", settings.listen_port);
    tokio::select! {
        r = axum::serve(listener, build_routes().await?) => {
            tracing::warn!("server ended unexpectedly: {:?}", &r)
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl+c interrupt, closing server");
        }
    }
    Ok(())
}
