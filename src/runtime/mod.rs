use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use serde_json::{Value, json};

use crate::config::CoreConfig;
use crate::context::{ContextId, ContextSpec, ContextType, FramerateMode, Parent};
use crate::error::{CoreError, FatalBug, Result};
use crate::logging::{CORE_TARGET, LogLevel, event_with_fields, json_kv, json_str};
use crate::metrics::{CoreMetrics, FpsCounter};
use crate::platform::{GlobalActions, Platform, Renderer, WorldState};
use crate::stack::ContextStack;

pub mod audit;
mod cascade;
pub mod diagnostics;
pub mod driver;
pub mod framerate;
mod hotkeys;

use audit::{CoreAudit, CoreAuditEventBuilder, CoreAuditStage, NullCoreAudit};

pub(crate) enum NodeKind {
    Context {
        context_type: ContextType,
        framerate: FramerateMode,
        subcontexts: ContextStack,
    },
    /// Subcontexts carry no stack of their own, so nesting stops here.
    Subcontext { parent: ContextId },
}

pub(crate) struct ContextNode {
    pub(crate) spec: ContextSpec,
    pub(crate) world: Rc<dyn WorldState>,
    pub(crate) kind: NodeKind,
}

/// Root of the context tree and driver of the run loop.
///
/// The root owns the top-level context stack, every node, and the two flags
/// handlers use to signal structural change (`context_changed`) and
/// termination (`full_exit`). Handlers receive `&mut Core` and may create or
/// destroy nodes at any point; each cascade checks both flags after every
/// handler call and hands control back to [`Core::run`] as soon as either is
/// set.
pub struct Core {
    nodes: HashMap<ContextId, ContextNode>,
    stack: ContextStack,
    next_id: u64,
    context_changed: bool,
    full_exit: bool,
    world: Rc<dyn WorldState>,
    renderer: Box<dyn Renderer>,
    platform: Box<dyn Platform>,
    actions: Option<Rc<dyn GlobalActions>>,
    config: CoreConfig,
    fps: FpsCounter,
    metrics: CoreMetrics,
    audit: Rc<dyn CoreAudit>,
    started: Option<Instant>,
}

impl Core {
    pub fn new<R, P>(world: Rc<dyn WorldState>, renderer: R, platform: P) -> Self
    where
        R: Renderer + 'static,
        P: Platform + 'static,
    {
        Self::with_config(world, renderer, platform, CoreConfig::default())
    }

    pub fn with_config<R, P>(
        world: Rc<dyn WorldState>,
        renderer: R,
        platform: P,
        config: CoreConfig,
    ) -> Self
    where
        R: Renderer + 'static,
        P: Platform + 'static,
    {
        Self {
            nodes: HashMap::new(),
            stack: ContextStack::new(),
            next_id: 1,
            context_changed: false,
            full_exit: false,
            world,
            renderer: Box::new(renderer),
            platform: Box::new(platform),
            actions: None,
            config,
            fps: FpsCounter::new(),
            metrics: CoreMetrics::new(),
            audit: Rc::new(NullCoreAudit),
            started: None,
        }
    }

    pub fn set_global_actions(&mut self, actions: Rc<dyn GlobalActions>) {
        self.actions = Some(actions);
    }

    pub fn set_audit(&mut self, audit: Rc<dyn CoreAudit>) {
        self.audit = audit;
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut CoreConfig {
        &mut self.config
    }

    pub fn renderer(&mut self) -> &mut dyn Renderer {
        self.renderer.as_mut()
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    pub fn platform_mut(&mut self) -> &mut dyn Platform {
        self.platform.as_mut()
    }

    pub fn metrics(&self) -> &CoreMetrics {
        &self.metrics
    }

    /// Most recently published frames-per-second average.
    pub fn fps(&self) -> f64 {
        self.fps.average()
    }

    // ----------------------------------------------------------------------
    // Node lifecycle
    // ----------------------------------------------------------------------

    /// Create a root-level context and push it onto the root stack.
    ///
    /// A subcontext `parent` is resolved to the context that owns it. The
    /// spec must carry at least one of idle, key, click or drag; otherwise
    /// nothing is allocated and a fatal error is returned.
    pub fn create_context(
        &mut self,
        parent: impl Into<Parent>,
        spec: &ContextSpec,
        context_type: ContextType,
    ) -> Result<ContextId> {
        if !spec.has_input_handler() {
            return Err(self.fatal(FatalBug::InvalidSpec));
        }

        let world = match self.resolve_owner(parent.into()) {
            Some(Parent::Root) => Rc::clone(&self.world),
            Some(Parent::Context(owner)) => match self.nodes.get(&owner) {
                Some(node) => Rc::clone(&node.world),
                None => return Err(self.fatal(FatalBug::MissingRoot)),
            },
            None => return Err(self.fatal(FatalBug::MissingRoot)),
        };

        let id = self.allocate_id();
        self.nodes.insert(
            id,
            ContextNode {
                spec: spec.clone(),
                world,
                kind: NodeKind::Context {
                    context_type,
                    framerate: spec.framerate,
                    subcontexts: ContextStack::new(),
                },
            },
        );
        self.stack.push(id);
        self.context_changed = true;

        self.metrics.record_created();
        self.record_audit(
            CoreAuditEventBuilder::new(CoreAuditStage::ContextCreated)
                .detail("id", id.raw())
                .detail("type", context_type.name()),
        );
        self.log(
            LogLevel::Debug,
            "context_created",
            [
                json_kv("id", id.raw()),
                json_str("type", context_type.name()),
                json_kv("depth", self.stack.len()),
            ],
        );
        Ok(id)
    }

    /// Create a subcontext on the context that owns `parent`.
    ///
    /// Does not flag a context change: the active context stays the same.
    pub fn create_subcontext(
        &mut self,
        parent: impl Into<Parent>,
        spec: &ContextSpec,
    ) -> Result<ContextId> {
        let owner = match self.resolve_owner(parent.into()) {
            Some(Parent::Context(owner)) => owner,
            _ => return Err(self.fatal(FatalBug::InvalidSubcontextParent)),
        };

        let id = self.allocate_id();
        let Some(owner_node) = self.nodes.get_mut(&owner) else {
            return Err(self.fatal(FatalBug::InvalidSubcontextParent));
        };
        let world = Rc::clone(&owner_node.world);
        let NodeKind::Context { subcontexts, .. } = &mut owner_node.kind else {
            return Err(self.fatal(FatalBug::InvalidSubcontextParent));
        };
        subcontexts.push(id);
        let siblings = subcontexts.len();

        self.nodes.insert(
            id,
            ContextNode {
                spec: spec.clone(),
                world,
                kind: NodeKind::Subcontext { parent: owner },
            },
        );

        self.metrics.record_created();
        self.record_audit(
            CoreAuditEventBuilder::new(CoreAuditStage::SubcontextCreated)
                .detail("id", id.raw())
                .detail("parent", owner.raw()),
        );
        self.log(
            LogLevel::Debug,
            "subcontext_created",
            [
                json_kv("id", id.raw()),
                json_kv("parent", owner.raw()),
                json_kv("siblings", siblings),
            ],
        );
        Ok(id)
    }

    /// Destroy a context or subcontext.
    ///
    /// A root-level context leaves the root stack, flags a context change,
    /// and takes every one of its subcontexts down with it, newest first.
    /// A subcontext only leaves its owner's stack; an in-flight walk of that
    /// stack is kept aligned. The node's destroy handler runs last, while
    /// the node can still be queried. A failing destroy handler anywhere in
    /// the subtree does not stop the teardown; the first error is returned
    /// after every node is gone.
    pub fn destroy_context(&mut self, id: ContextId) -> Result<()> {
        let parent = match self.nodes.get(&id) {
            Some(node) => match node.kind {
                NodeKind::Context { .. } => None,
                NodeKind::Subcontext { parent } => Some(parent),
            },
            None => return Err(self.fatal(FatalBug::UnknownContext(id))),
        };

        let mut subtree_error = None;
        match parent {
            None => {
                self.stack.remove(id).map_err(|bug| self.fatal(bug))?;
                self.context_changed = true;

                while let Some(sub) = self.owned_stack(id).and_then(ContextStack::top) {
                    if let Err(err) = self.destroy_context(sub) {
                        subtree_error.get_or_insert(err);
                        if self.owned_stack(id).and_then(ContextStack::top) == Some(sub) {
                            break;
                        }
                    }
                }
            }
            Some(parent) => {
                let removed = match self.owned_stack_mut(parent) {
                    Some(stack) => stack.remove(id),
                    None => Err(FatalBug::StackMiss(id)),
                };
                let index = removed.map_err(|bug| self.fatal(bug))?;
                if let Some(stack) = self.owned_stack_mut(parent) {
                    stack.adjust_for_removal(index);
                }
            }
        }

        let on_destroy = self.nodes.get(&id).and_then(|node| node.spec.destroy.clone());
        let outcome = match on_destroy {
            Some(destroy) => destroy(self, id),
            None => Ok(()),
        };
        self.nodes.remove(&id);

        let (stage, message) = if parent.is_some() {
            (CoreAuditStage::SubcontextDestroyed, "subcontext_destroyed")
        } else {
            (CoreAuditStage::ContextDestroyed, "context_destroyed")
        };
        self.metrics.record_destroyed();
        self.record_audit(CoreAuditEventBuilder::new(stage).detail("id", id.raw()));
        self.log(
            LogLevel::Debug,
            message,
            [json_kv("id", id.raw()), json_kv("depth", self.stack.len())],
        );
        match subtree_error {
            Some(err) => Err(err),
            None => outcome,
        }
    }

    /// Destroy every remaining context, newest first.
    pub fn shutdown(&mut self) -> Result<()> {
        while let Some(top) = self.stack.top() {
            self.destroy_context(top)?;
        }
        Ok(())
    }

    /// Request termination of every run loop on this root.
    pub fn exit(&mut self) {
        self.full_exit = true;
    }

    pub fn is_exiting(&self) -> bool {
        self.full_exit
    }

    pub fn has_context_changed(&self) -> bool {
        self.context_changed
    }

    pub fn set_framerate_mode(&mut self, id: ContextId, mode: FramerateMode) -> Result<()> {
        match self.nodes.get_mut(&id).map(|node| &mut node.kind) {
            Some(NodeKind::Context { framerate, .. }) => {
                *framerate = mode;
                Ok(())
            }
            Some(NodeKind::Subcontext { .. }) => Err(self.fatal(FatalBug::FramerateOnSubcontext)),
            None => Err(self.fatal(FatalBug::UnknownContext(id))),
        }
    }

    // ----------------------------------------------------------------------
    // Queries
    // ----------------------------------------------------------------------

    /// Whether `id` is a root-level context of the given type. Subcontexts
    /// never match.
    pub fn is_context(&self, id: ContextId, context_type: ContextType) -> Result<bool> {
        match self.nodes.get(&id) {
            Some(node) => Ok(matches!(
                node.kind,
                NodeKind::Context { context_type: ty, .. } if ty == context_type
            )),
            None => Err(self.fatal(FatalBug::UnknownContext(id))),
        }
    }

    pub fn context_type(&self, id: ContextId) -> Option<ContextType> {
        match self.nodes.get(&id).map(|node| &node.kind) {
            Some(NodeKind::Context { context_type, .. }) => Some(*context_type),
            _ => None,
        }
    }

    pub fn framerate_mode(&self, id: ContextId) -> Option<FramerateMode> {
        match self.nodes.get(&id).map(|node| &node.kind) {
            Some(NodeKind::Context { framerate, .. }) => Some(*framerate),
            _ => None,
        }
    }

    pub fn contains(&self, id: ContextId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn is_subcontext(&self, id: ContextId) -> bool {
        matches!(
            self.nodes.get(&id).map(|node| &node.kind),
            Some(NodeKind::Subcontext { .. })
        )
    }

    /// Owning context of a subcontext.
    pub fn parent_of(&self, id: ContextId) -> Option<ContextId> {
        match self.nodes.get(&id).map(|node| &node.kind) {
            Some(NodeKind::Subcontext { parent }) => Some(*parent),
            _ => None,
        }
    }

    /// Root stack, oldest first.
    pub fn contexts(&self) -> &[ContextId] {
        self.stack.as_slice()
    }

    /// Subcontexts of a context, oldest first. Empty for anything else.
    pub fn subcontexts(&self, id: ContextId) -> &[ContextId] {
        self.owned_stack(id)
            .map(ContextStack::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Active context.
    pub fn top(&self) -> Option<ContextId> {
        self.stack.top()
    }

    /// World reference carried by a node.
    pub fn world(&self, id: ContextId) -> Option<Rc<dyn WorldState>> {
        self.nodes.get(&id).map(|node| Rc::clone(&node.world))
    }

    pub fn root_world(&self) -> &Rc<dyn WorldState> {
        &self.world
    }

    pub fn is_on_stack(&self, context_type: ContextType) -> bool {
        self.stack
            .iter()
            .rev()
            .any(|id| self.context_type(id) == Some(context_type))
    }

    /// Type used to pick a help page: the newest context whose type has a
    /// page of its own, else the main page.
    pub fn help_context(&self) -> ContextType {
        self.stack
            .iter()
            .rev()
            .filter_map(|id| self.context_type(id))
            .find(|ty| ty.has_help_page())
            .unwrap_or(ContextType::Main)
    }

    // ----------------------------------------------------------------------
    // Run loop
    // ----------------------------------------------------------------------

    /// Run the loop until exit is requested or the root stack drops below
    /// its size at entry. Returns immediately on an empty stack.
    ///
    /// Nested calls from inside a handler are supported: the inner loop
    /// returns once the contexts it was started for are gone.
    pub fn run(&mut self) -> Result<()> {
        let initial = self.stack.len();
        if initial == 0 {
            return Ok(());
        }

        let started = *self.started.get_or_insert_with(Instant::now);
        self.record_audit(
            CoreAuditEventBuilder::new(CoreAuditStage::RunStarted).detail("depth", initial),
        );
        self.log(
            LogLevel::Info,
            "run_started",
            [json_kv("depth", initial)],
        );

        let result = self.run_loop(initial);

        self.record_audit(
            CoreAuditEventBuilder::new(CoreAuditStage::RunStopped)
                .detail("depth", self.stack.len())
                .detail("exit", self.full_exit),
        );
        if let Some(logger) = self.config.logger.as_ref() {
            let mut event = self
                .metrics
                .snapshot(started.elapsed())
                .to_log_event(CORE_TARGET);
            event.message = "run_stopped".to_string();
            event.fields.insert("exit".to_string(), json!(self.full_exit));
            event.fields.insert("ok".to_string(), json!(result.is_ok()));
            let _ = logger.log_event(event);
        }
        result
    }

    fn run_loop(&mut self, initial: usize) -> Result<()> {
        let mut start_ticks = self.platform.ticks();

        loop {
            let mut passes = 0u32;
            while self.context_changed {
                self.context_changed = false;
                self.platform.force_release_all_keys();
                self.resume_cascade()?;
                passes += 1;

                if self.full_exit {
                    return Ok(());
                }
            }
            if passes > 1 {
                self.log(
                    LogLevel::Debug,
                    "resume_fixpoint",
                    [json_kv("passes", passes)],
                );
            }

            let Some(active) = self.stack.top() else {
                return Ok(());
            };

            self.draw_cascade()?;

            // A change during draw restarts from the resume fixpoint without
            // flushing or processing input.
            if !self.interrupted() {
                self.renderer.update_screen();
                self.metrics.record_frame();
                self.record_audit(CoreAuditEventBuilder::new(CoreAuditStage::FrameFlushed));

                self.apply_framerate(active, start_ticks)?;

                start_ticks = self.platform.ticks();
                if self.config.show_fps {
                    if let Some(fps) = self.fps.update(start_ticks) {
                        self.renderer.set_caption_fps(fps);
                    }
                }

                self.update_cascade()?;
            }

            if self.full_exit || self.stack.len() < initial {
                return Ok(());
            }
        }
    }

    // ----------------------------------------------------------------------
    // Internals
    // ----------------------------------------------------------------------

    fn allocate_id(&mut self) -> ContextId {
        let id = ContextId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Walk subcontext back-references up to the owning context. `None` when
    /// the handle does not name a live node.
    fn resolve_owner(&self, parent: Parent) -> Option<Parent> {
        match parent {
            Parent::Root => Some(Parent::Root),
            Parent::Context(mut id) => loop {
                match &self.nodes.get(&id)?.kind {
                    NodeKind::Context { .. } => return Some(Parent::Context(id)),
                    NodeKind::Subcontext { parent } => id = *parent,
                }
            },
        }
    }

    pub(crate) fn node(&self, id: ContextId) -> Option<&ContextNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn owned_stack(&self, id: ContextId) -> Option<&ContextStack> {
        match self.nodes.get(&id).map(|node| &node.kind) {
            Some(NodeKind::Context { subcontexts, .. }) => Some(subcontexts),
            _ => None,
        }
    }

    pub(crate) fn owned_stack_mut(&mut self, id: ContextId) -> Option<&mut ContextStack> {
        match self.nodes.get_mut(&id).map(|node| &mut node.kind) {
            Some(NodeKind::Context { subcontexts, .. }) => Some(subcontexts),
            _ => None,
        }
    }

    pub(crate) fn root_stack(&self) -> &ContextStack {
        &self.stack
    }

    pub(crate) fn interrupted(&self) -> bool {
        self.context_changed || self.full_exit
    }

    /// Report an internal invariant violation through the single fatal
    /// channel and hand back the error to propagate.
    pub(crate) fn fatal(&self, bug: FatalBug) -> CoreError {
        if let Some(logger) = self.config.logger.as_ref() {
            let mut fields = vec![
                json_kv("code", bug.code()),
                json_str("reason", bug.to_string()),
            ];
            if self.config.dumps_stack_on_fatal() {
                fields.push(json_str("stack", diagnostics::format_stack(self)));
            }
            let _ = logger.log_event(event_with_fields(
                LogLevel::Error,
                CORE_TARGET,
                "fatal",
                fields,
            ));
        }
        CoreError::Fatal(bug)
    }

    pub(crate) fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let _ = logger.log_event(event_with_fields(level, CORE_TARGET, message, fields));
        }
    }

    pub(crate) fn record_audit(&self, builder: CoreAuditEventBuilder) {
        self.audit.record(builder.finish());
    }
}
