//! Step handler functions and table builder.
//!
//! Each step is three plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  IDLE ──[select_cover, LED3 not alone]──▶ RESETTING ◀─────────────┐
//!    │                                          │ [released]        │
//!    │                                          ▼                   │
//!    │                                   AWAIT_LED_STABLE           │
//!    │                                          │ [settle delay]    │
//!    │                                          ▼                   │
//!    │   [failed: max presses] ◀──────────── CHECK_LED ──[dark]─────┘
//!    │                                          │ [LED3 alone]
//!    └──[select_cover, LED3 alone]──▶ AWAIT_RELEASE ◀───────────┐
//!                                       │ [released, more]      │
//!                                       ▼                [gap elapsed]
//!                                AWAIT_NEXT_PRESS ──────────────┘
//!
//!  AWAIT_RELEASE / CHECK_LED ──[no presses left]──▶ IDLE (completed)
//! ```

use super::context::{SelectContext, SelectOutcome};
use super::{SelectStep, StepDescriptor};
use crate::pins::LED3_COVER_INDEX;
use log::{debug, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_step_table() -> [StepDescriptor; SelectStep::COUNT] {
    [
        StepDescriptor {
            id: SelectStep::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        StepDescriptor {
            id: SelectStep::Resetting,
            name: "Resetting",
            on_enter: Some(resetting_enter),
            on_exit: None,
            on_update: resetting_update,
        },
        StepDescriptor {
            id: SelectStep::AwaitLedStable,
            name: "AwaitLedStable",
            on_enter: None,
            on_exit: None,
            on_update: await_led_stable_update,
        },
        StepDescriptor {
            id: SelectStep::CheckLed,
            name: "CheckLed",
            on_enter: None,
            on_exit: None,
            on_update: check_led_update,
        },
        StepDescriptor {
            id: SelectStep::AwaitRelease,
            name: "AwaitRelease",
            on_enter: Some(await_release_enter),
            on_exit: None,
            on_update: await_release_update,
        },
        StepDescriptor {
            id: SelectStep::AwaitNextPress,
            name: "AwaitNextPress",
            on_enter: None,
            on_exit: None,
            on_update: await_next_press_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut SelectContext) {
    // A cancelled sequence must not leave a press behind.
    ctx.press_select = false;
}

fn idle_update(_ctx: &mut SelectContext) -> Option<SelectStep> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RESET PHASE: step the remote until LED3 lights alone (channel 3)
// ═══════════════════════════════════════════════════════════════════════════

fn resetting_enter(ctx: &mut SelectContext) {
    ctx.reset_presses += 1;
    ctx.press_select = true;
    debug!("select: reset press #{}", ctx.reset_presses);
}

fn resetting_update(ctx: &mut SelectContext) -> Option<SelectStep> {
    if ctx.press_select || ctx.button_busy {
        return None;
    }
    Some(SelectStep::AwaitLedStable)
}

fn await_led_stable_update(ctx: &mut SelectContext) -> Option<SelectStep> {
    (ctx.ms_in_step() >= ctx.led_stable_delay_ms).then_some(SelectStep::CheckLed)
}

fn check_led_update(ctx: &mut SelectContext) -> Option<SelectStep> {
    if ctx.at_led3_channel() {
        ctx.cover = LED3_COVER_INDEX;
        info!(
            "select: channel {} reached after {} reset presses",
            LED3_COVER_INDEX, ctx.reset_presses
        );
        if ctx.presses_remaining == 0 {
            ctx.outcome = Some(SelectOutcome::Completed {
                cover: ctx.cover,
                presses: 0,
            });
            return Some(SelectStep::Idle);
        }
        info!(
            "select: {} presses to channel {}",
            ctx.presses_remaining, ctx.target
        );
        return Some(SelectStep::AwaitRelease);
    }

    if ctx.reset_presses >= ctx.max_reset_presses {
        warn!(
            "select: reset failed after {} presses, LED3 never lit alone",
            ctx.reset_presses
        );
        ctx.outcome = Some(SelectOutcome::Failed {
            target: ctx.target,
            reset_presses: ctx.reset_presses,
        });
        return Some(SelectStep::Idle);
    }

    Some(SelectStep::Resetting)
}

// ═══════════════════════════════════════════════════════════════════════════
//  SELECTION PHASE: counted presses from channel 3 to the target
// ═══════════════════════════════════════════════════════════════════════════

fn await_release_enter(ctx: &mut SelectContext) {
    ctx.press_select = true;
}

fn await_release_update(ctx: &mut SelectContext) -> Option<SelectStep> {
    if ctx.press_select || ctx.button_busy {
        return None;
    }

    ctx.presses_done += 1;
    ctx.presses_remaining = ctx.presses_remaining.saturating_sub(1);
    ctx.cover = (ctx.cover + 1) % ctx.cover_count;
    debug!(
        "select: press complete, channel now {}, {} remaining",
        ctx.cover, ctx.presses_remaining
    );

    if ctx.presses_remaining > 0 {
        return Some(SelectStep::AwaitNextPress);
    }

    ctx.cover = ctx.target;
    ctx.outcome = Some(SelectOutcome::Completed {
        cover: ctx.target,
        presses: ctx.presses_done,
    });
    Some(SelectStep::Idle)
}

fn await_next_press_update(ctx: &mut SelectContext) -> Option<SelectStep> {
    let gap = ctx.press_duration_ms + ctx.press_margin_ms;
    (ctx.ms_in_step() >= gap).then_some(SelectStep::AwaitRelease)
}
