//! Global hotkeys offered a key that no level of the update cascade consumed.

use crossterm::event::{KeyCode, KeyModifiers};

use crate::config::HotkeyGate;
use crate::context::{ContextId, ContextType, KeyInput};
use crate::error::Result;
use crate::logging::{LogLevel, json_str};

use super::Core;
use super::audit::{CoreAuditEventBuilder, CoreAuditStage};
use super::diagnostics;

const HELP_KEY: KeyCode = KeyCode::F(1);
const SETTINGS_KEY: KeyCode = KeyCode::F(2);
const DEBUG_KEY: KeyCode = KeyCode::F(12);

impl Core {
    /// Fires at most one of help, settings, or the debug/screenshot action.
    pub(crate) fn dispatch_global_key(&mut self, active: ContextId, key: &KeyInput) -> Result<()> {
        match key.code {
            Some(HELP_KEY) => {
                if let Some(actions) = self.actions.clone() {
                    if self.allow_help_system() {
                        self.note_hotkey("help");
                        actions.help_system(self, active)?;
                    }
                }
            }
            Some(SETTINGS_KEY) => {
                if let Some(actions) = self.actions.clone() {
                    if self.allow_settings(key.modifiers) {
                        self.note_hotkey("settings");
                        actions.settings_menu(self, active)?;
                    }
                }
            }
            Some(DEBUG_KEY) => {
                if key.modifiers.contains(KeyModifiers::ALT) && self.config.stack_hotkey_enabled() {
                    self.note_hotkey("stack_dump");
                    self.print_stack();
                } else if self.config.allow_screenshots {
                    self.note_hotkey("screenshot");
                    self.renderer.dump_screen();
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub(crate) fn allow_help_system(&self) -> bool {
        if self.is_on_stack(ContextType::HelpSystem) {
            return false;
        }
        self.gate_allows(&self.config.help)
    }

    pub(crate) fn allow_settings(&self, modifiers: KeyModifiers) -> bool {
        if self.is_on_stack(ContextType::Configure) || self.is_on_stack(ContextType::HelpSystem) {
            return false;
        }

        // Ctrl skips the counter gate, except in standalone mode.
        if modifiers.contains(KeyModifiers::CONTROL) && !self.config.standalone_mode {
            return true;
        }
        self.gate_allows(&self.config.settings)
    }

    /// A live game past the gate's version may lock the action behind a
    /// counter while gameplay (or a standalone title screen) is on the stack.
    fn gate_allows(&self, gate: &HotkeyGate) -> bool {
        let world = &self.world;
        if world.is_active() && world.version() >= gate.min_world_version {
            let gated = self.is_on_stack(ContextType::PlayGame)
                || (self.is_on_stack(ContextType::TitleScreen) && self.config.standalone_mode);
            if gated && world.counter(&gate.counter) == 0 {
                return false;
            }
        }
        true
    }

    fn print_stack(&self) {
        let dump = diagnostics::format_stack(self);
        if self.config.logger.is_some() {
            self.log(LogLevel::Info, "stack_dump", [json_str("stack", dump)]);
        } else {
            eprint!("{dump}");
        }
    }

    fn note_hotkey(&self, action: &str) {
        self.record_audit(
            CoreAuditEventBuilder::new(CoreAuditStage::HotkeyTriggered).detail("action", action),
        );
        self.log(
            LogLevel::Debug,
            "hotkey_triggered",
            [json_str("action", action)],
        );
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crossterm::event::{KeyCode, KeyModifiers};

    use crate::config::CoreConfig;
    use crate::context::{ContextId, ContextSpec, ContextType, EventFlow, Parent};
    use crate::error::Result;
    use crate::logging::{Logger, MemorySink};
    use crate::platform::GlobalActions;
    use crate::runtime::Core;
    use crate::testing::{
        InputFrame, Rig, RenderCall, Trace, entries, harness, harness_with, note, trace,
    };

    struct Menus {
        trace: Trace,
    }

    impl GlobalActions for Menus {
        fn help_system(&self, core: &mut Core, _active: ContextId) -> Result<()> {
            note(&self.trace, format!("help:{}", core.help_context().name()));
            Ok(())
        }

        fn settings_menu(&self, _core: &mut Core, _active: ContextId) -> Result<()> {
            note(&self.trace, "settings");
            Ok(())
        }
    }

    fn with_menus(core: &mut Core) -> Trace {
        let log = trace();
        core.set_global_actions(Rc::new(Menus {
            trace: Rc::clone(&log),
        }));
        log
    }

    fn passive() -> ContextSpec {
        ContextSpec::new().on_key(|_, _, _| Ok(EventFlow::Continue))
    }

    /// Run one update pass over a settled stack with `frame` as input.
    fn press(core: &mut Core, rig: &Rig, frame: InputFrame) {
        core.context_changed = false;
        rig.platform.borrow_mut().current = frame;
        core.update_cascade().unwrap();
    }

    fn live_world(rig: &Rig) {
        rig.world.active.set(true);
        rig.world.version.set(0x023C);
    }

    #[test]
    fn unconsumed_f1_opens_help_for_the_newest_page() {
        let (mut core, rig) = harness();
        let log = with_menus(&mut core);
        core.create_context(Parent::Root, &passive(), ContextType::BlockCmd)
            .unwrap();

        press(&mut core, &rig, InputFrame::key(KeyCode::F(1)));

        assert_eq!(entries(&log), vec!["help:Block command"]);
    }

    #[test]
    fn consumed_keys_never_reach_hotkeys() {
        let (mut core, rig) = harness();
        let log = with_menus(&mut core);
        core.create_context(
            Parent::Root,
            &ContextSpec::new().on_key(|_, _, _| Ok(EventFlow::Consumed)),
            ContextType::PlayGame,
        )
        .unwrap();

        press(&mut core, &rig, InputFrame::key(KeyCode::F(1)));
        press(&mut core, &rig, InputFrame::key(KeyCode::F(12)));

        assert!(entries(&log).is_empty());
        assert!(rig.render_calls().is_empty());
    }

    #[test]
    fn help_is_not_reopened_over_itself() {
        let (mut core, _rig) = harness();
        core.create_context(Parent::Root, &passive(), ContextType::HelpSystem)
            .unwrap();
        assert!(!core.allow_help_system());
        assert!(!core.allow_settings(KeyModifiers::NONE));
    }

    #[test]
    fn gameplay_counter_gates_help_in_newer_worlds() {
        let (mut core, rig) = harness();
        core.create_context(Parent::Root, &passive(), ContextType::PlayGame)
            .unwrap();
        live_world(&rig);
        assert!(!core.allow_help_system());

        rig.world.set_counter("HELP_MENU", 1);
        assert!(core.allow_help_system());

        rig.world.set_counter("HELP_MENU", 0);
        rig.world.version.set(0x023B);
        assert!(core.allow_help_system());
    }

    #[test]
    fn gate_only_applies_while_playing() {
        let (mut core, rig) = harness();
        core.create_context(Parent::Root, &passive(), ContextType::TitleScreen)
            .unwrap();
        live_world(&rig);
        assert!(core.allow_help_system());

        core.config_mut().standalone_mode = true;
        assert!(!core.allow_help_system());
    }

    #[test]
    fn ctrl_skips_the_settings_gate_outside_standalone_mode() {
        let (mut core, rig) = harness();
        core.create_context(Parent::Root, &passive(), ContextType::PlayGame)
            .unwrap();
        live_world(&rig);

        assert!(!core.allow_settings(KeyModifiers::NONE));
        assert!(core.allow_settings(KeyModifiers::CONTROL));

        core.config_mut().standalone_mode = true;
        assert!(!core.allow_settings(KeyModifiers::CONTROL));

        rig.world.set_counter("F2_MENU", 1);
        assert!(core.allow_settings(KeyModifiers::NONE));
    }

    #[test]
    fn settings_stay_closed_while_configuring() {
        let (mut core, rig) = harness();
        let log = with_menus(&mut core);
        core.create_context(Parent::Root, &passive(), ContextType::Configure)
            .unwrap();

        press(&mut core, &rig, InputFrame::key(KeyCode::F(2)));
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn f2_opens_settings() {
        let (mut core, rig) = harness();
        let log = with_menus(&mut core);
        core.create_context(Parent::Root, &passive(), ContextType::MainMenu)
            .unwrap();

        press(&mut core, &rig, InputFrame::key(KeyCode::F(2)));
        assert_eq!(entries(&log), vec!["settings"]);
    }

    #[test]
    fn f12_takes_a_screenshot_when_allowed() {
        let (mut core, rig) = harness();
        core.create_context(Parent::Root, &passive(), ContextType::PlayGame)
            .unwrap();

        press(&mut core, &rig, InputFrame::key(KeyCode::F(12)));
        assert_eq!(rig.render_calls(), vec![RenderCall::Screenshot]);

        core.config_mut().allow_screenshots = false;
        press(&mut core, &rig, InputFrame::key(KeyCode::F(12)));
        assert_eq!(rig.render_calls(), vec![RenderCall::Screenshot]);
    }

    #[test]
    fn alt_f12_logs_the_stack() {
        let sink = MemorySink::new();
        let config = CoreConfig {
            debug_hotkeys: true,
            ..CoreConfig::default()
        }
        .with_logger(Logger::new(sink.clone()));
        let (mut core, rig) = harness_with(config);
        core.create_context(Parent::Root, &passive(), ContextType::PlayGame)
            .unwrap();

        press(
            &mut core,
            &rig,
            InputFrame::key_with(KeyCode::F(12), KeyModifiers::ALT),
        );

        assert!(rig.render_calls().is_empty());
        let dump = sink
            .events()
            .into_iter()
            .find(|event| event.message == "stack_dump")
            .unwrap();
        let stack = dump.field("stack").and_then(|v| v.as_str()).unwrap();
        assert!(stack.contains("Gameplay"));
    }
}
