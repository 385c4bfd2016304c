//! The three per-frame dispatch passes.
//!
//! Each pass runs the active context's own handler first and then walks its
//! subcontexts, re-reading the stack through the cursor after every call so
//! handlers are free to create or destroy nodes. The first call that sets
//! `context_changed` or `full_exit` ends the pass.

use crate::context::{ContextId, ContextType, KeyInput, MouseInput};
use crate::error::Result;
use crate::logging::{LogLevel, json_str};
use crate::platform::Layer;

use super::Core;
use super::audit::{CoreAuditEventBuilder, CoreAuditStage};

const FPS_COLOR: u8 = 0x0f;

#[derive(Debug, Default, Clone, Copy)]
struct Handled {
    mouse: bool,
    key: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    /// Move on to the next level of the chain.
    Next,
    /// Stack changed or exit requested; leave the pass.
    Aborted,
}

impl Core {
    pub(crate) fn resume_cascade(&mut self) -> Result<()> {
        let Some(ctx) = self.top() else {
            return Ok(());
        };
        self.metrics.record_resume();

        let resume = self.node(ctx).and_then(|node| node.spec.resume.clone());
        if let Some(resume) = resume {
            resume(self, ctx)?;
        }
        if self.interrupted() {
            self.note_abort("resume");
            return Ok(());
        }

        self.walk_subcontexts(ctx, "resume", |core, sub| {
            match core.node(sub).and_then(|node| node.spec.resume.clone()) {
                Some(resume) => resume(core, sub),
                None => Ok(()),
            }
        })?;
        Ok(())
    }

    pub(crate) fn draw_cascade(&mut self) -> Result<()> {
        let Some(ctx) = self.top() else {
            return Ok(());
        };

        let draw = self.node(ctx).and_then(|node| node.spec.draw.clone());
        if let Some(draw) = draw {
            draw(self, ctx)?;
        }
        if self.interrupted() {
            self.note_abort("draw");
            return Ok(());
        }

        let completed = self.walk_subcontexts(ctx, "draw", |core, sub| {
            match core.node(sub).and_then(|node| node.spec.draw.clone()) {
                Some(draw) => {
                    core.renderer.select_layer(Layer::Ui);
                    draw(core, sub)
                }
                None => Ok(()),
            }
        })?;

        if completed && self.config.show_fps && self.context_type(ctx) != Some(ContextType::Editor)
        {
            let readout = format!("  {:.2}  ", self.fps.average());
            self.renderer.select_layer(Layer::Ui);
            self.renderer.write_string(&readout, 0, 0, FPS_COLOR);
        }
        Ok(())
    }

    /// Input pass. Levels run innermost first: newest subcontext down to the
    /// oldest, then the owning context.
    ///
    /// Per level the order is idle, then click or drag, then key. A consumed
    /// idle vetoes mouse and key handling for every remaining level; a
    /// consumed mouse or key handler does the same for its own kind. A key
    /// nobody consumed is offered to the global hotkeys.
    pub(crate) fn update_cascade(&mut self) -> Result<()> {
        let Some(ctx) = self.top() else {
            return Ok(());
        };
        self.metrics.record_update();

        let mut key = KeyInput {
            code: self.platform.key(),
            modifiers: self.platform.modifiers(),
            exit_requested: self.platform.exit_status(),
        };
        let (x, y) = self.platform.mouse_position();
        let mouse = MouseInput {
            press: self.platform.mouse_press(),
            dragging: self.platform.mouse_drag(),
            x,
            y,
        };
        let mut handled = Handled::default();

        let newest = self.subcontexts(ctx).len() as isize - 1;
        if let Some(stack) = self.owned_stack_mut(ctx) {
            stack.set_pos(newest);
        }

        loop {
            let cur = self
                .owned_stack(ctx)
                .and_then(|stack| stack.at_pos())
                .unwrap_or(ctx);

            if self.update_level(cur, &mut key, mouse, &mut handled)? == Level::Aborted {
                self.note_abort("update");
                return Ok(());
            }
            if cur == ctx {
                break;
            }

            // A removal at or before the cursor has already moved it on.
            if let Some(stack) = self.owned_stack_mut(ctx) {
                if stack.at_pos() == Some(cur) {
                    stack.set_pos(stack.pos() - 1);
                }
            }
        }

        if !handled.key {
            self.dispatch_global_key(ctx, &key)?;
        }
        Ok(())
    }

    fn update_level(
        &mut self,
        cur: ContextId,
        key: &mut KeyInput,
        mouse: MouseInput,
        handled: &mut Handled,
    ) -> Result<Level> {
        let Some(spec) = self.node(cur).map(|node| node.spec.clone()) else {
            return Ok(Level::Next);
        };

        if let Some(idle) = spec.idle.as_ref() {
            if idle(self, cur)?.is_consumed() {
                handled.mouse = true;
                handled.key = true;
            }
            if let Some(level) = self.after_handler(cur) {
                return Ok(level);
            }
        }

        if !handled.mouse {
            let handler = if mouse.dragging && spec.drag.is_some() {
                spec.drag.as_ref()
            } else if mouse.press.is_some() {
                spec.click.as_ref()
            } else {
                None
            };
            if let Some(handler) = handler {
                if handler(self, cur, key, mouse)?.is_consumed() {
                    handled.mouse = true;
                }
                if let Some(level) = self.after_handler(cur) {
                    return Ok(level);
                }
            }
        }

        if !handled.key && key.is_pending() {
            if let Some(on_key) = spec.key.as_ref() {
                if on_key(self, cur, key)?.is_consumed() {
                    handled.key = true;
                }
                if let Some(level) = self.after_handler(cur) {
                    return Ok(level);
                }
            }
        }

        Ok(Level::Next)
    }

    /// Checks made after every update handler: abort on a flag, skip the
    /// rest of the level if the handler destroyed its own node.
    fn after_handler(&self, cur: ContextId) -> Option<Level> {
        if self.interrupted() {
            Some(Level::Aborted)
        } else if !self.contains(cur) {
            Some(Level::Next)
        } else {
            None
        }
    }

    /// Visit the subcontexts of `ctx` oldest first. Returns `false` when the
    /// walk was cut short by a flag.
    fn walk_subcontexts<F>(&mut self, ctx: ContextId, cascade: &str, mut visit: F) -> Result<bool>
    where
        F: FnMut(&mut Core, ContextId) -> Result<()>,
    {
        if let Some(stack) = self.owned_stack_mut(ctx) {
            stack.set_pos(0);
        }

        while let Some(sub) = self.owned_stack(ctx).and_then(|stack| stack.at_pos()) {
            visit(self, sub)?;

            if self.interrupted() {
                self.note_abort(cascade);
                return Ok(false);
            }
            if let Some(stack) = self.owned_stack_mut(ctx) {
                stack.set_pos(stack.pos() + 1);
            }
        }
        Ok(true)
    }

    fn note_abort(&mut self, cascade: &str) {
        self.metrics.record_abort();
        self.record_audit(
            CoreAuditEventBuilder::new(CoreAuditStage::CascadeAborted)
                .detail("cascade", cascade)
                .detail("exit", self.full_exit),
        );
        self.log(
            LogLevel::Trace,
            "cascade_aborted",
            [json_str("cascade", cascade)],
        );
    }
}
