use std::cell::Cell;
use std::rc::Rc;

use crossterm::event::KeyCode;

use context_core::{
    BufferedCoreAudit, ContextSpec, ContextType, Core, CoreConfig, EventFlow, FileSink, Layer,
    Logger, NoWorld, Parent, TerminalPlatform, TerminalRenderer, TerminalSession,
};

const WHITE: u8 = 0x0F;
const CYAN: u8 = 0x0B;
const YELLOW: u8 = 0x0E;
const DIALOG_ROW: u32 = 8;
const DIALOG_WIDTH: usize = 28;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let log_path = std::env::temp_dir().join("context_core_terminal_demo.log");
    let logger = Logger::new(FileSink::new(&log_path, 64 * 1024)?);
    let mut config = CoreConfig::default().with_logger(logger);
    config.show_fps = true;

    let audit = Rc::new(BufferedCoreAudit::new());
    let result = {
        let _session = TerminalSession::enter()?;
        let mut core = Core::with_config(
            Rc::new(NoWorld),
            TerminalRenderer::stdout(),
            TerminalPlatform::new(),
            config,
        );
        core.set_audit(audit.clone());

        let menu = core.create_context(Parent::Root, &main_menu(), ContextType::MainMenu)?;
        core.create_subcontext(menu, &frame_counter())?;
        core.run()
    };

    for event in audit.events() {
        let details = event
            .details
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("[AUDIT] {:?} {details}", event.stage);
    }
    println!("log written to {}", log_path.display());
    result?;
    Ok(())
}

fn main_menu() -> ContextSpec {
    ContextSpec::new()
        .on_resume(|core, _| {
            // Blank whatever a closed dialog left behind.
            let blank = " ".repeat(DIALOG_WIDTH);
            for row in DIALOG_ROW..DIALOG_ROW + 4 {
                core.renderer().write_string(&blank, 4, row, WHITE);
            }
            Ok(())
        })
        .on_draw(|core, _| {
            let renderer = core.renderer();
            renderer.select_layer(Layer::Ui);
            renderer.write_string("context_core terminal demo", 2, 1, WHITE);
            renderer.write_string("d: open a dialog   q: quit", 2, 3, CYAN);
            Ok(())
        })
        .on_key(|core, id, key| match key.code {
            Some(KeyCode::Char('q')) => {
                core.exit();
                Ok(EventFlow::Consumed)
            }
            Some(KeyCode::Char('d')) => {
                core.create_context(id, &dialog(), ContextType::DialogBox)?;
                Ok(EventFlow::Consumed)
            }
            _ => Ok(EventFlow::Continue),
        })
}

/// Subcontext that draws alongside the menu and counts the frames it saw.
fn frame_counter() -> ContextSpec {
    let frames = Rc::new(Cell::new(0u64));
    let drawn = Rc::clone(&frames);
    ContextSpec::new()
        .on_draw(move |core, _| {
            drawn.set(drawn.get() + 1);
            let line = format!("frames drawn: {}", drawn.get());
            core.renderer().write_string(&line, 2, 5, YELLOW);
            Ok(())
        })
        .on_idle(|_, _| Ok(EventFlow::Continue))
}

fn dialog() -> ContextSpec {
    ContextSpec::new()
        .on_draw(|core, _| {
            let renderer = core.renderer();
            renderer.select_layer(Layer::Ui);
            let lines = [
                "+--------------------------+",
                "| dialog is active         |",
                "| esc: close               |",
                "+--------------------------+",
            ];
            for (row, line) in (DIALOG_ROW..).zip(lines) {
                renderer.write_string(line, 4, row, WHITE);
            }
            Ok(())
        })
        .on_key(|core, id, key| {
            if key.code == Some(KeyCode::Esc) {
                core.destroy_context(id)?;
            }
            Ok(EventFlow::Consumed)
        })
}
