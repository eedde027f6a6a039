// File: src/module.rs
// Purpose: Route modules, their handlers, loaders, actions and the module cache

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};

use crate::error::{HandlerResult, Interrupt};
use crate::event::RequestEvent;

// ============================================================================
// Handlers
// ============================================================================

/// One step of the request chain.
///
/// A handler may call [`RequestEvent::next`] to run the rest of the chain
/// and then inspect the outcome, or simply return and let the dispatch loop
/// continue.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, ev: &mut RequestEvent) -> HandlerResult;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> RequestHandler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestEvent) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    async fn handle(&self, ev: &mut RequestEvent) -> HandlerResult {
        (self.0)(ev).await
    }
}

/// Wraps a closure as a [`RequestHandler`].
///
/// ```ignore
/// let on_get = handler_fn(|ev| Box::pin(async move {
///     ev.text(StatusCode::OK, "pong")?;
///     Ok(())
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> Arc<dyn RequestHandler>
where
    F: for<'a> Fn(&'a mut RequestEvent) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

// ============================================================================
// Loaders & actions
// ============================================================================

/// A typed failure returned by a validator, loader or action.
#[derive(Debug, Clone, PartialEq)]
pub struct Fail {
    pub status: StatusCode,
    pub data: JsonValue,
}

impl Fail {
    pub fn new(status: StatusCode, data: impl Into<JsonValue>) -> Self {
        Self {
            status,
            data: data.into(),
        }
    }

    /// Serialized form: `{"failed": true, ...data}`.
    pub fn to_json(&self) -> JsonValue {
        match &self.data {
            JsonValue::Object(map) => {
                let mut map = map.clone();
                map.insert("failed".to_string(), JsonValue::Bool(true));
                JsonValue::Object(map)
            }
            JsonValue::Null => json!({ "failed": true }),
            other => json!({ "failed": true, "data": other }),
        }
    }
}

/// Settled result of a loader or action.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    Value(JsonValue),
    Failed(Fail),
}

impl Settled {
    pub fn into_json(self) -> JsonValue {
        match self {
            Settled::Value(value) => value,
            Settled::Failed(fail) => fail.to_json(),
        }
    }
}

impl From<JsonValue> for Settled {
    fn from(value: JsonValue) -> Self {
        Settled::Value(value)
    }
}

impl From<Fail> for Settled {
    fn from(fail: Fail) -> Self {
        Settled::Failed(fail)
    }
}

/// Checks, and optionally transforms, loader or action input.
///
/// `Ok(Some(value))` replaces the data seen by later validators and the
/// action; `Ok(None)` keeps it.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(
        &self,
        ev: &RequestEvent,
        data: Option<&JsonValue>,
    ) -> Result<Option<JsonValue>, Fail>;
}

struct FnValidator<F>(F);

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: Fn(&RequestEvent, Option<&JsonValue>) -> Result<Option<JsonValue>, Fail> + Send + Sync,
{
    async fn validate(
        &self,
        ev: &RequestEvent,
        data: Option<&JsonValue>,
    ) -> Result<Option<JsonValue>, Fail> {
        (self.0)(ev, data)
    }
}

/// Wraps a synchronous closure as a [`Validator`].
pub fn validator_fn<F>(f: F) -> Arc<dyn Validator>
where
    F: Fn(&RequestEvent, Option<&JsonValue>) -> Result<Option<JsonValue>, Fail>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnValidator(f))
}

struct SerdeValidator<T>(PhantomData<fn() -> T>);

#[async_trait]
impl<T: DeserializeOwned> Validator for SerdeValidator<T> {
    async fn validate(
        &self,
        _ev: &RequestEvent,
        data: Option<&JsonValue>,
    ) -> Result<Option<JsonValue>, Fail> {
        let data = data.cloned().unwrap_or(JsonValue::Null);
        serde_json::from_value::<T>(data).map(|_| None).map_err(|err| {
            Fail::new(
                StatusCode::BAD_REQUEST,
                json!({ "formErrors": [err.to_string()] }),
            )
        })
    }
}

/// A validator that accepts data deserializable as `T` and fails with 400
/// otherwise.
pub fn validate_as<T: DeserializeOwned + 'static>() -> Arc<dyn Validator> {
    Arc::new(SerdeValidator::<T>(PhantomData))
}

/// Runs validators in order, stopping at the first failure.
pub(crate) async fn run_validators(
    validators: &[Arc<dyn Validator>],
    ev: &RequestEvent,
    mut data: Option<JsonValue>,
) -> Result<Option<JsonValue>, Fail> {
    for validator in validators {
        if let Some(transformed) = validator.validate(ev, data.as_ref()).await? {
            data = Some(transformed);
        }
    }
    Ok(data)
}

type LoaderFn =
    dyn for<'a> Fn(&'a RequestEvent) -> BoxFuture<'a, Result<Settled, Interrupt>> + Send + Sync;

/// A request-scoped data fetch. All loaders of a route run concurrently and
/// only see the event immutably.
pub struct Loader {
    id: String,
    validators: Vec<Arc<dyn Validator>>,
    run: Box<LoaderFn>,
}

impl Loader {
    pub fn new<F>(id: impl Into<String>, run: F) -> Self
    where
        F: for<'a> Fn(&'a RequestEvent) -> BoxFuture<'a, Result<Settled, Interrupt>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.into(),
            validators: Vec::new(),
            run: Box::new(run),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Validates, then runs the loader. A validation failure settles as a
    /// [`Settled::Failed`] instead of erroring.
    pub(crate) async fn call(&self, ev: &RequestEvent) -> Result<Settled, Interrupt> {
        if let Err(fail) = run_validators(&self.validators, ev, None).await {
            return Ok(Settled::Failed(fail));
        }
        (self.run)(ev).await
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("id", &self.id)
            .field("validators", &self.validators.len())
            .finish()
    }
}

type ActionFn = dyn for<'a> Fn(&'a mut RequestEvent, JsonValue) -> BoxFuture<'a, Result<Settled, Interrupt>>
    + Send
    + Sync;

/// A mutation invoked by id through the `qaction` query parameter.
pub struct Action {
    id: String,
    validators: Vec<Arc<dyn Validator>>,
    run: Box<ActionFn>,
}

impl Action {
    pub fn new<F>(id: impl Into<String>, run: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestEvent, JsonValue) -> BoxFuture<'a, Result<Settled, Interrupt>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.into(),
            validators: Vec::new(),
            run: Box::new(run),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) async fn call(&self, ev: &mut RequestEvent, data: JsonValue) -> Result<Settled, Interrupt> {
        let data = match run_validators(&self.validators, ev, Some(data)).await {
            Ok(data) => data.unwrap_or(JsonValue::Null),
            Err(fail) => return Ok(Settled::Failed(fail)),
        };
        (self.run)(ev, data).await
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("validators", &self.validators.len())
            .finish()
    }
}

type ServerFn = dyn for<'a> Fn(&'a mut RequestEvent, Vec<JsonValue>) -> BoxFuture<'a, Result<JsonValue, Interrupt>>
    + Send
    + Sync;

/// A server-side function callable directly over the wire with JSON
/// arguments, bypassing rendering.
pub struct ServerFunction {
    id: String,
    run: Box<ServerFn>,
}

impl ServerFunction {
    pub fn new<F>(id: impl Into<String>, run: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestEvent, Vec<JsonValue>) -> BoxFuture<'a, Result<JsonValue, Interrupt>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.into(),
            run: Box::new(run),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) async fn call(&self, ev: &mut RequestEvent, args: Vec<JsonValue>) -> Result<JsonValue, Interrupt> {
        (self.run)(ev, args).await
    }
}

// ============================================================================
// Route modules
// ============================================================================

/// Opaque renderable export handed to the render collaborator.
pub type DefaultExport = Arc<dyn Any + Send + Sync>;

/// A page, endpoint, layout or plugin module. Every capability is optional.
#[derive(Clone, Default)]
pub struct RouteModule {
    on_request: Option<Arc<dyn RequestHandler>>,
    on_get: Option<Arc<dyn RequestHandler>>,
    on_post: Option<Arc<dyn RequestHandler>>,
    on_put: Option<Arc<dyn RequestHandler>>,
    on_patch: Option<Arc<dyn RequestHandler>>,
    on_delete: Option<Arc<dyn RequestHandler>>,
    on_options: Option<Arc<dyn RequestHandler>>,
    on_head: Option<Arc<dyn RequestHandler>>,
    loaders: Vec<Arc<Loader>>,
    actions: Vec<Arc<Action>>,
    default_export: Option<DefaultExport>,
}

impl RouteModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request(mut self, handler: Arc<dyn RequestHandler>) -> Self {
        self.on_request = Some(handler);
        self
    }

    pub fn on_get(mut self, handler: Arc<dyn RequestHandler>) -> Self {
        self.on_get = Some(handler);
        self
    }

    pub fn on_post(mut self, handler: Arc<dyn RequestHandler>) -> Self {
        self.on_post = Some(handler);
        self
    }

    pub fn on_put(mut self, handler: Arc<dyn RequestHandler>) -> Self {
        self.on_put = Some(handler);
        self
    }

    pub fn on_patch(mut self, handler: Arc<dyn RequestHandler>) -> Self {
        self.on_patch = Some(handler);
        self
    }

    pub fn on_delete(mut self, handler: Arc<dyn RequestHandler>) -> Self {
        self.on_delete = Some(handler);
        self
    }

    pub fn on_options(mut self, handler: Arc<dyn RequestHandler>) -> Self {
        self.on_options = Some(handler);
        self
    }

    pub fn on_head(mut self, handler: Arc<dyn RequestHandler>) -> Self {
        self.on_head = Some(handler);
        self
    }

    pub fn loader(mut self, loader: Loader) -> Self {
        self.loaders.push(Arc::new(loader));
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(Arc::new(action));
        self
    }

    pub fn default_export<T: Any + Send + Sync>(mut self, export: T) -> Self {
        self.default_export = Some(Arc::new(export));
        self
    }

    pub fn request_handler(&self) -> Option<&Arc<dyn RequestHandler>> {
        self.on_request.as_ref()
    }

    /// Handler for a method. `HEAD` falls back to the `GET` handler.
    pub fn method_handler(&self, method: &Method) -> Option<&Arc<dyn RequestHandler>> {
        match *method {
            Method::GET => self.on_get.as_ref(),
            Method::POST => self.on_post.as_ref(),
            Method::PUT => self.on_put.as_ref(),
            Method::PATCH => self.on_patch.as_ref(),
            Method::DELETE => self.on_delete.as_ref(),
            Method::OPTIONS => self.on_options.as_ref(),
            Method::HEAD => self.on_head.as_ref().or(self.on_get.as_ref()),
            _ => None,
        }
    }

    pub fn loaders(&self) -> &[Arc<Loader>] {
        &self.loaders
    }

    pub fn actions(&self) -> &[Arc<Action>] {
        &self.actions
    }

    pub fn export(&self) -> Option<&DefaultExport> {
        self.default_export.as_ref()
    }

    /// Downcasts the default export.
    pub fn export_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.default_export.as_ref()?.downcast_ref::<T>()
    }

    pub fn is_page(&self) -> bool {
        self.default_export.is_some()
    }
}

impl fmt::Debug for RouteModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteModule")
            .field("on_request", &self.on_request.is_some())
            .field("loaders", &self.loaders)
            .field("actions", &self.actions)
            .field("is_page", &self.is_page())
            .finish()
    }
}

// ============================================================================
// Module registry & cache
// ============================================================================

/// Lazy accessor to a module.
pub type ModuleLoader =
    Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Arc<RouteModule>>> + Send + Sync>;

/// Maps manifest module ids to their loaders.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    loaders: HashMap<String, ModuleLoader>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already built module.
    pub fn with_module(mut self, id: impl Into<String>, module: RouteModule) -> Self {
        let module = Arc::new(module);
        let loader: ModuleLoader =
            Arc::new(move || -> BoxFuture<'static, anyhow::Result<Arc<RouteModule>>> {
                let module = Arc::clone(&module);
                Box::pin(async move { Ok(module) })
            });
        self.loaders.insert(id.into(), loader);
        self
    }

    /// Registers a module produced on first use.
    pub fn with_loader<F>(mut self, id: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, anyhow::Result<Arc<RouteModule>>> + Send + Sync + 'static,
    {
        self.loaders.insert(id.into(), Arc::new(loader));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.loaders.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ModuleLoader> {
        self.loaders.get(id)
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.loaders.keys()).finish()
    }
}

/// Process-wide cache of resolved modules. Safe for concurrent use; two
/// requests racing on the same id may both load it, and the first insert
/// wins.
#[derive(Debug, Default)]
pub struct ModuleCache {
    modules: DashMap<String, Arc<RouteModule>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&self, id: &str, registry: &ModuleRegistry) -> anyhow::Result<Arc<RouteModule>> {
        if let Some(module) = self.modules.get(id).map(|entry| Arc::clone(entry.value())) {
            return Ok(module);
        }

        let loader = registry
            .get(id)
            .with_context(|| format!("No module registered for `{}`", id))?;
        let module = loader()
            .await
            .with_context(|| format!("Failed to load module `{}`", id))?;

        let entry = self.modules.entry(id.to_string()).or_insert(module);
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn clear(&self) {
        self.modules.clear();
    }
}
