/// Completion handle for `Engine::add_sound`
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::error::AddSoundError;
use crate::state::{Sound, SoundId};

pub type AddSoundResult = Result<Sound, AddSoundError>;

/// Resolves once the sound's metadata is known and it is on the board, or
/// with the reason it never made it
#[derive(Debug)]
pub struct AddSoundTicket {
    id: SoundId,
    name: String,
    result: Receiver<AddSoundResult>,
}

impl AddSoundTicket {
    pub(crate) fn new(id: SoundId, name: String, result: Receiver<AddSoundResult>) -> Self {
        Self { id, name, result }
    }

    /// Id the sound will have once loaded
    pub fn id(&self) -> SoundId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the sound is loaded or has failed
    pub fn wait(self) -> AddSoundResult {
        self.result
            .recv()
            .unwrap_or(Err(AddSoundError::EngineShutDown))
    }

    /// Block for at most `timeout`; `None` while still loading
    pub fn wait_timeout(&self, timeout: Duration) -> Option<AddSoundResult> {
        match self.result.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(AddSoundError::EngineShutDown)),
        }
    }

    /// Non-blocking check
    pub fn try_result(&self) -> Option<AddSoundResult> {
        match self.result.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(AddSoundError::EngineShutDown)),
        }
    }
}
