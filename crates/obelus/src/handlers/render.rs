use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::header;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::error::{HandlerResult, ResponseError};
use crate::event::RequestEvent;
use crate::module::RequestHandler;
use crate::routes::LoadedRoute;

/// What a renderer produced: a whole document or a stream of chunks.
pub enum RenderOutput {
    Html(String),
    Stream(BoxStream<'static, anyhow::Result<Bytes>>),
}

/// Input of one render call.
pub struct RenderContext<'a> {
    pub event: &'a RequestEvent,
    pub route: &'a LoadedRoute,
}

/// The UI rendering collaborator. Called at most once per page request.
#[async_trait]
pub trait Render: Send + Sync {
    async fn render(&self, cx: RenderContext<'_>) -> anyhow::Result<RenderOutput>;
}

/// Final handler of a page chain: renders and pipes output to the response.
pub struct RenderHandler {
    pub route: Arc<LoadedRoute>,
    pub renderer: Option<Arc<dyn Render>>,
}

#[async_trait]
impl RequestHandler for RenderHandler {
    async fn handle(&self, ev: &mut RequestEvent) -> HandlerResult {
        if ev.is_data_request() || ev.headers_sent() {
            return Ok(());
        }
        let Some(renderer) = &self.renderer else {
            return Err(anyhow::anyhow!("No renderer configured for page `{}`", self.route.route_name).into());
        };

        if !ev.headers().contains_key(header::CONTENT_TYPE) {
            ev.set_header(header::CONTENT_TYPE.as_str(), "text/html; charset=utf-8")?;
        }

        let output = renderer
            .render(RenderContext {
                event: &*ev,
                route: &self.route,
            })
            .await?;

        let writer = ev.write_response()?;
        let result = match output {
            RenderOutput::Html(html) => writer.write(html),
            RenderOutput::Stream(mut stream) => {
                let mut result = Ok(());
                while let Some(chunk) = stream.next().await {
                    result = writer.write(chunk?);
                    if result.is_err() {
                        break;
                    }
                }
                result
            }
        };
        match result {
            Ok(()) | Err(ResponseError::Closed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
