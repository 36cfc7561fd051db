use crate::input::Controller;
use crate::util::emitter::ListenerId;

use super::arena::SharedArena;
use super::Side;

/// Drive the fighter on `side` from `controller`. The same wiring serves a
/// local keyboard and a remote opponent.
pub fn bind_controller(controller: &Controller, arena: SharedArena, side: Side) -> ListenerId {
    controller.on_any(move |event| {
        arena.lock().fighter_mut(side).handle_input(*event);
    })
}
