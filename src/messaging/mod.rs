/// Messaging module for Event/Command architecture
///
/// This module implements the Event/Command segregation pattern:
/// - **Events**: Notifications of things that happened (past tense, broadcast)
/// - **Commands**: Requests to perform actions (imperative, targeted)
///
/// ## Architecture
///
/// ```text
/// ┌──────────────┐   Command    ┌────────┐    Event     ┌───────────┐
/// │ Presentation │ ───────────> │ Engine │ ───────────> │ Event Bus │
/// │    layer     │              │        │              │           │
/// └──────────────┘              └────────┘              └───────────┘
///        ▲                                                    │
///        └──────────────── snapshot on event ─────────────────┘
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let (rx, _id) = engine.subscribe();
///
/// engine.execute(Command::Play { id });
///
/// while let Ok(event) = rx.recv() {
///     match event {
///         Event::PositionsChanged { .. } => redraw(engine.snapshot()),
///         _ => {}
///     }
/// }
/// ```

pub mod bus;
pub mod commands;
pub mod events;

// Re-export commonly used types
pub use bus::{EventBus, SubscriberId};
pub use commands::Command;
pub use events::Event;
