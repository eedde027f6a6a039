// Obelus - request dispatch runtime for file-routed server rendering
// Matches requests against the built route table and drives each one
// through plugins, layouts, loaders, actions and the render step

pub mod adapter;
pub mod config;
pub mod context;
pub mod cookie;
pub mod dispatch;
pub mod error;
pub mod error_page;
pub mod event;
pub mod handlers;
pub mod module;
pub mod request;
pub mod response;
pub mod routes;

mod chain;

// Re-export core types
pub use config::{Config, Mode};
pub use context::{read_manifest, ServerContext, ServerContextBuilder};
pub use cookie::{CookieOptions, Cookies, SameSite};
pub use dispatch::{Dispatch, Dispatcher};
pub use error::{HandlerResult, Interrupt, RedirectMessage, ResponseError, ServerError};
pub use event::RequestEvent;
pub use handlers::{Render, RenderContext, RenderOutput};
pub use module::{
    handler_fn, validate_as, validator_fn, Action, Fail, Loader, ModuleCache, ModuleLoader,
    ModuleRegistry, RequestHandler, RouteModule, ServerFunction, Settled, Validator,
};
pub use request::{AbortHandle, AbortSignal, ServerRequest};
pub use response::{Response, ResponseBody, ResponseWriter};
pub use routes::{LoadedRoute, RouteTable, RuntimeRoute};

// Re-export the router and commonly used dependency types
pub use obelus_router;
pub use axum;
pub use axum::http::{Method, StatusCode};
