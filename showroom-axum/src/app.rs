use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middlewares::WriteGateLayer;
use crate::routes;
use crate::{ShowroomState, WriteGate};

pub struct ShowroomApp {
    pub state: ShowroomState,
    pub router: Router<()>,
}

impl Clone for ShowroomApp {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            router: self.router.clone(),
        }
    }
}

impl ShowroomApp {
    /// Image and hero routes plus `/health`, with every write behind `gate`
    pub fn new(state: ShowroomState, gate: Arc<dyn WriteGate>) -> Self {
        let router = routes::images::routes()
            .merge(routes::hero::routes())
            .route("/health", get(|| async { "ok" }))
            .with_state(state.clone())
            .layer(WriteGateLayer::new(gate))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            );

        Self { state, router }
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "showroom listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}
