//! # P300 Speller Core Library
//!
//! This library provides the trial scheduling and session state machine of a
//! P300 speller: a grid of symbols flashed in randomized groups while an
//! external classifier infers which symbol the user attends to.
//!
//! ## Architecture
//!
//! - **Speller**: Session state machine sequencing calibration and free-running
//!   test cycles, interruptible by predictions at fixed checkpoints
//! - **Scheduler**: FIFO queue that owns the stimulus surface and orders every
//!   visual change
//! - **Sampler / Groups**: Jittered durations and per-round random partitions
//! - **Channel**: Outbound events and inbound classifier messages
//!
//! ## Key Components
//!
//! - [`Speller`]: Session state machine
//! - [`CooperativeScheduler`]: Ordered visual task queue
//! - [`Config`]: Session configuration management
//! - [`EventSink`]: Trait for event transports
//! - [`StimulusSurface`]: Trait for the rendering collaborator

pub mod alphabet;
pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod groups;
pub mod lifecycle;
pub mod sampler;
pub mod scheduler;
pub mod speller;
pub mod surface;

pub use alphabet::Alphabet;
pub use channel::{EventSink, JsonLinesSink, MemorySink, ModelMessage, TracingSink};
pub use config::{Config, SessionOptions, StimulusStyle};
pub use error::{ChannelError, ConfigError, CoreError, SchedulerError, SurfaceError, ValidationError};
pub use events::{Event, StampedEvent};
pub use groups::Groups;
pub use lifecycle::{Lifecycle, LifecycleDispatcher, LifecycleKind};
pub use sampler::JitterRange;
pub use scheduler::{CooperativeScheduler, Ticket};
pub use speller::{SessionStatus, Speller, FEEDBACK_LENGTH};
pub use surface::{HeadlessSurface, RecordingSurface, StimulusSurface, SurfaceOp};
