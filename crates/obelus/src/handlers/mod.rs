//! Framework handlers inserted into every chain at fixed positions.

mod csrf;
mod data;
mod loaders;
mod render;
mod server_fn;
mod trailing_slash;

pub use csrf::CsrfGuard;
pub use data::{DataResponder, RedirectPropagation, LOADERS_PARAM};
pub use loaders::{LoaderActionExecutor, RouteNameRecorder, QACTION_PARAM};
pub use render::{Render, RenderContext, RenderHandler, RenderOutput};
pub use server_fn::{ServerFunctionCall, QDATA_PARAM, QFUNC_PARAM, SERVER_FN_HEADER};
pub use trailing_slash::TrailingSlash;
