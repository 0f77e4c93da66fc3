//! A2UI Component Registry
//!
//! Maps A2UI component types to renderer implementations that are produced on
//! demand by async factories. Each entry resolves at most once for the lifetime
//! of the registry; later lookups, concurrent ones included, share the cached
//! renderer.
//!
//! The registry is generic over the renderer handle `R`, typically an
//! `Arc<dyn YourRenderer>`.

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use log::debug;
use tokio::sync::OnceCell;

use super::component::{A2uiComponent, ComponentType};

type RendererFactory<R> = Box<dyn Fn() -> BoxFuture<'static, R> + Send + Sync>;

struct Entry<R> {
    factory: RendererFactory<R>,
    resolved: OnceCell<R>,
}

impl<R: Clone> Entry<R> {
    fn lazy<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Entry {
            factory: Box::new(move || factory().boxed()),
            resolved: OnceCell::new(),
        }
    }

    fn ready(renderer: R) -> Self
    where
        R: Send + Sync + 'static,
    {
        let cached = renderer.clone();
        Entry {
            factory: Box::new(move || futures::future::ready(cached.clone()).boxed()),
            resolved: OnceCell::new_with(Some(renderer)),
        }
    }

    async fn resolve(&self) -> R {
        self.resolved
            .get_or_init(|| (self.factory)())
            .await
            .clone()
    }
}

/// Registry of lazily resolved renderers.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry: ComponentRegistry<Arc<dyn Renderer>> = ComponentRegistry::new();
/// registry.register(ComponentType::Chart, || async { load_chart_renderer().await });
/// registry.register_custom_sync("org-chart", Arc::new(OrgChart));
///
/// let renderer = registry.resolve_component(&component).await;
/// ```
pub struct ComponentRegistry<R> {
    renderers: IndexMap<ComponentType, Entry<R>>,
    custom_renderers: IndexMap<String, Entry<R>>,
}

impl<R> Default for ComponentRegistry<R> {
    fn default() -> Self {
        ComponentRegistry {
            renderers: IndexMap::new(),
            custom_renderers: IndexMap::new(),
        }
    }
}

impl<R> fmt::Debug for ComponentRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("renderers", &self.renderers.keys().collect::<Vec<_>>())
            .field("custom_renderers", &self.custom_renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<R> ComponentRegistry<R>
where
    R: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every built-in type through one factory taking the type.
    pub fn with_standard_catalog<F, Fut>(factory: F) -> Self
    where
        F: Fn(ComponentType) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let mut registry = Self::new();
        for &component_type in ComponentType::all() {
            let factory = factory.clone();
            registry.register(component_type, move || factory(component_type));
        }
        registry
    }

    /// Register a built-in renderer. The factory runs on first resolution.
    ///
    /// Re-registering a type replaces the entry and its cached renderer.
    pub fn register<F, Fut>(&mut self, component_type: ComponentType, factory: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        self.renderers.insert(component_type, Entry::lazy(factory));
    }

    /// Register a renderer for a `Custom` component's renderer key
    pub fn register_custom<F, Fut>(&mut self, renderer_key: impl Into<String>, factory: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        self.custom_renderers.insert(renderer_key.into(), Entry::lazy(factory));
    }

    /// Register an already built renderer for a custom key
    pub fn register_custom_sync(&mut self, renderer_key: impl Into<String>, renderer: R) {
        self.custom_renderers.insert(renderer_key.into(), Entry::ready(renderer));
    }

    /// Get the renderer for a component type.
    ///
    /// `Custom` with a key looks in the custom table; everything else, `Custom`
    /// without a key included, looks in the built-in table. `None` when nothing
    /// is registered.
    pub async fn resolve(&self, component_type: ComponentType, custom_key: Option<&str>) -> Option<R> {
        let entry = match (component_type, custom_key) {
            (ComponentType::Custom, Some(key)) => self.custom_renderers.get(key),
            _ => self.renderers.get(&component_type),
        };
        let Some(entry) = entry else {
            debug!("No renderer registered for {component_type} {custom_key:?}");
            return None;
        };
        Some(entry.resolve().await)
    }

    /// Get the renderer for a component record
    pub async fn resolve_component(&self, component: &A2uiComponent) -> Option<R> {
        self.resolve(component.component, component.renderer_key()).await
    }

    /// Check if a component type has a registered renderer
    pub fn has(&self, component_type: ComponentType) -> bool {
        self.renderers.contains_key(&component_type)
    }

    /// Check if a custom renderer key is registered
    pub fn has_custom(&self, renderer_key: &str) -> bool {
        self.custom_renderers.contains_key(renderer_key)
    }

    /// Registered built-in types, in registration order
    pub fn registered_types(&self) -> Vec<ComponentType> {
        self.renderers.keys().copied().collect()
    }

    /// Registered custom keys, in registration order
    pub fn custom_keys(&self) -> Vec<String> {
        self.custom_renderers.keys().cloned().collect()
    }
}
