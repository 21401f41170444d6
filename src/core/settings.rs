//! Exposes all structs needed to configure a [`RenderGraph`](crate::RenderGraph).

/// Selects how graphics pass nodes open and close their rendering scope.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RenderingMode {
    /// Use `vkCmdBeginRendering` (Vulkan 1.3 dynamic rendering). Attachments are taken from the pass object.
    #[default]
    Dynamic,
    /// Use `vkCmdBeginRenderPass` with the render pass and framebuffer stored in the pass object.
    RenderPass,
}

/// Settings used to create a render graph.
///
/// See also: [`GraphSettingsBuilder`]
#[derive(Debug, Clone)]
pub struct GraphSettings {
    /// Name of the graph. Only used for diagnostics.
    pub name: String,
    /// How graphics passes are begun and ended. This is global for every graphics pass in the graph,
    /// and usually depends on the device features the renderer was initialized with.
    pub rendering_mode: RenderingMode,
    /// Emit debug labels around every pass node. Only has an effect when the `debug-markers` feature is enabled.
    pub debug_labels: bool,
    /// Number of nodes the node arena reserves up front. The arena still grows past this if needed.
    pub node_capacity: usize,
    /// Log every level and barrier boundary at `debug` level after `end()`.
    pub log_schedule: bool,
}

impl Default for GraphSettings {
    fn default() -> Self {
        GraphSettingsBuilder::new().build()
    }
}

/// The settings builder is a convenience struct to easily create [`GraphSettings`].
///
/// For information about each of the fields, see [`GraphSettings`]
/// # Example
/// ```
/// # use strata::*;
/// let settings = GraphSettingsBuilder::new()
///     .name("main")
///     .rendering_mode(RenderingMode::RenderPass)
///     .node_capacity(512)
///     .build();
/// assert_eq!(settings.rendering_mode, RenderingMode::RenderPass);
/// ```
pub struct GraphSettingsBuilder {
    inner: GraphSettings,
}

impl Default for GraphSettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphSettingsBuilder {
    /// Create a new settings builder with default settings.
    pub fn new() -> Self {
        GraphSettingsBuilder {
            inner: GraphSettings {
                name: String::from("render graph"),
                rendering_mode: RenderingMode::Dynamic,
                debug_labels: true,
                node_capacity: 256,
                log_schedule: false,
            },
        }
    }

    /// Sets the graph name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    /// Sets the rendering mode used by graphics passes.
    pub fn rendering_mode(mut self, mode: RenderingMode) -> Self {
        self.inner.rendering_mode = mode;
        self
    }

    /// Enable or disable debug labels around pass nodes.
    pub fn debug_labels(mut self, enabled: bool) -> Self {
        self.inner.debug_labels = enabled;
        self
    }

    /// Initial capacity of the node arena.
    pub fn node_capacity(mut self, capacity: usize) -> Self {
        self.inner.node_capacity = capacity;
        self
    }

    /// Log the computed schedule after every `end()`.
    pub fn log_schedule(mut self, enabled: bool) -> Self {
        self.inner.log_schedule = enabled;
        self
    }

    /// Build the resulting graph settings.
    pub fn build(self) -> GraphSettings {
        self.inner
    }
}
