//! Human-readable dump of the whole context tree.

use std::fmt::Write;

use crate::context::ContextId;

use super::{Core, NodeKind};

const HEADER: &str = "CONTEXT STACK    | Res Drw Idl Key Clk Drg Dst | Fr. ";
const DIVIDER: &str = "-----------------|-----------------------------|-----";
const SUBCONTEXT_NAME: &str = "  -> subcontext";

/// One line per node: contexts newest first, each preceded by its own
/// subcontexts newest first.
pub fn format_stack(core: &Core) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    out.push_str(DIVIDER);
    out.push('\n');

    for ctx in core.root_stack().iter().rev() {
        for sub in core.subcontexts(ctx).iter().rev() {
            write_line(&mut out, core, *sub);
        }
        write_line(&mut out, core, ctx);
    }
    out.push('\n');
    out
}

fn write_line(out: &mut String, core: &Core, id: ContextId) {
    let Some(node) = core.node(id) else {
        return;
    };
    let (name, framerate) = match &node.kind {
        NodeKind::Context {
            context_type,
            framerate,
            ..
        } => (context_type.name(), framerate.label()),
        NodeKind::Subcontext { .. } => (SUBCONTEXT_NAME, "-"),
    };

    let spec = &node.spec;
    let yes = |present: bool| if present { "Yes" } else { "" };
    let drag = match (spec.drag.is_some(), spec.click_drag_shared()) {
        (true, true) => "<- ",
        (true, false) => "Yes",
        (false, _) => "",
    };

    let _ = writeln!(
        out,
        "{:<16.16} | {:>3} {:>3} {:>3} {:>3} {:>3} {:>3} {:>3} | {:<3} ",
        name,
        yes(spec.resume.is_some()),
        yes(spec.draw.is_some()),
        yes(spec.idle.is_some()),
        yes(spec.key.is_some()),
        yes(spec.click.is_some()),
        drag,
        yes(spec.destroy.is_some()),
        framerate,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextSpec, ContextType, EventFlow, FramerateMode, Parent};
    use crate::testing::harness;

    #[test]
    fn dump_lists_subcontexts_above_their_owner() {
        let (mut core, _rig) = harness();
        let game = core
            .create_context(
                Parent::Root,
                &ContextSpec::new()
                    .framerate(FramerateMode::Speed)
                    .on_draw(|_, _| Ok(()))
                    .on_key(|_, _, _| Ok(EventFlow::Continue)),
                ContextType::PlayGame,
            )
            .unwrap();
        core.create_subcontext(
            game,
            &ContextSpec::new().on_mouse(|_, _, _, _| Ok(EventFlow::Continue)),
        )
        .unwrap();

        let dump = format_stack(&core);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], DIVIDER);
        assert_eq!(
            lines[2],
            "  -> subcontext  |                 Yes <-      | -   "
        );
        assert_eq!(
            lines[3],
            "Gameplay         |     Yes     Yes             | MZX "
        );
    }

    #[test]
    fn long_names_are_truncated() {
        let (mut core, _rig) = harness();
        core.create_context(
            Parent::Root,
            &ContextSpec::new().on_idle(|_, _| Ok(EventFlow::Continue)),
            ContextType::GlobalSettings2,
        )
        .unwrap();
        let dump = format_stack(&core);
        assert!(dump.contains("Global settings2 | "));
        assert!(dump.contains("| UI  "));
    }
}
