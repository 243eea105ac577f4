//! Window events routed into the runtime's pointer state.

use winit::event::{ElementState, MouseButton, Touch, TouchPhase, WindowEvent};

use crate::device::RenderDevice;
use crate::runtime::Runtime;

/// Pointer updates extracted from a window event, in window pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Moved { x: f32, y: f32 },
    Button { down: bool },
}

impl PointerEvent {
    /// Translate a window event. Only cursor movement, the primary button and
    /// single-finger touch produce pointer events; a touch produces its
    /// movement first.
    pub fn from_window_event(event: &WindowEvent) -> Vec<PointerEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => vec![PointerEvent::Moved {
                x: position.x as f32,
                y: position.y as f32,
            }],
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => vec![PointerEvent::Button {
                down: *state == ElementState::Pressed,
            }],
            WindowEvent::Touch(Touch {
                phase, location, id: 0, ..
            }) => {
                let moved = PointerEvent::Moved {
                    x: location.x as f32,
                    y: location.y as f32,
                };
                match phase {
                    TouchPhase::Started => vec![moved, PointerEvent::Button { down: true }],
                    TouchPhase::Moved => vec![moved],
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        vec![moved, PointerEvent::Button { down: false }]
                    }
                }
            }
            _ => Vec::new(),
        }
    }

    pub fn apply<D: RenderDevice>(self, runtime: &mut Runtime<D>) {
        match self {
            PointerEvent::Moved { x, y } => runtime.pointer_moved(x, y),
            PointerEvent::Button { down } => runtime.pointer_button(down),
        }
    }
}

/// Feed a window event into `runtime`. Returns true if it changed pointer state.
pub fn handle_event<D: RenderDevice>(runtime: &mut Runtime<D>, event: &WindowEvent) -> bool {
    let events = PointerEvent::from_window_event(event);
    let handled = !events.is_empty();
    for e in events {
        e.apply(runtime);
    }
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use glam::Vec2;

    #[test]
    fn pointer_events_reach_the_context() {
        let mut rt = Runtime::new(HeadlessDevice::new(200, 100));
        PointerEvent::Moved { x: 50.0, y: 25.0 }.apply(&mut rt);
        PointerEvent::Button { down: true }.apply(&mut rt);

        let pointer = rt.context().pointer;
        assert_eq!(pointer.position, Vec2::new(0.25, 0.25));
        assert_eq!(pointer.velocity, Vec2::new(0.25, 0.25));
        assert!(pointer.down);

        PointerEvent::Moved { x: 100.0, y: 25.0 }.apply(&mut rt);
        PointerEvent::Button { down: false }.apply(&mut rt);
        let pointer = rt.context().pointer;
        assert_eq!(pointer.velocity, Vec2::new(0.5, 0.25));
        assert!(!pointer.down);
    }
}
