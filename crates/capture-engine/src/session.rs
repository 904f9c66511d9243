//! Capture session runner.
//!
//! A session drives one [`CaptureController`] from a command channel. User
//! commands and forced-stop expiries are handled one at a time on the same
//! task, so no handler ever interleaves with another. Finished blobs go to
//! the output channel; the session publishes its state after every handler.
//! Dropping every [`CaptureHandle`] ends the session and releases the device.

use cheezy_common::error::{CheezyError, CheezyResult};
use cheezy_experience_model::MediaBlob;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::controller::{CaptureController, OpenOutcome, RecordingId};
use crate::state::{CaptureKind, CaptureState};

/// Commands accepted by a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCommand {
    Open(CaptureKind),
    CapturePhoto,
    StartRecording,
    StopRecording,
    Reset,
    Close,
}

/// Sending side of a running session.
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    commands: mpsc::Sender<CaptureCommand>,
    state: watch::Receiver<CaptureState>,
}

impl CaptureHandle {
    pub async fn send(&self, command: CaptureCommand) -> CheezyResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CheezyError::capture("capture session has ended"))
    }

    pub async fn open(&self, kind: CaptureKind) -> CheezyResult<()> {
        self.send(CaptureCommand::Open(kind)).await
    }

    pub async fn capture_photo(&self) -> CheezyResult<()> {
        self.send(CaptureCommand::CapturePhoto).await
    }

    pub async fn start_recording(&self) -> CheezyResult<()> {
        self.send(CaptureCommand::StartRecording).await
    }

    pub async fn stop_recording(&self) -> CheezyResult<()> {
        self.send(CaptureCommand::StopRecording).await
    }

    pub async fn close(&self) -> CheezyResult<()> {
        self.send(CaptureCommand::Close).await
    }

    /// Latest published state.
    pub fn state(&self) -> CaptureState {
        *self.state.borrow()
    }

    /// Wait until the session reports `target`.
    pub async fn wait_for(&mut self, target: CaptureState) -> CheezyResult<()> {
        self.wait_until(|s| s == target).await.map(|_| ())
    }

    /// Wait until the published state satisfies `done`, and return it.
    pub async fn wait_until(
        &mut self,
        mut done: impl FnMut(CaptureState) -> bool,
    ) -> CheezyResult<CaptureState> {
        self.state
            .wait_for(|s| done(*s))
            .await
            .map(|s| *s)
            .map_err(|_| CheezyError::capture("capture session has ended"))
    }
}

/// Runs a controller against a command channel.
pub struct CaptureSession {
    controller: CaptureController,
    commands: mpsc::Receiver<CaptureCommand>,
    output: mpsc::UnboundedSender<MediaBlob>,
    state: watch::Sender<CaptureState>,
}

impl CaptureSession {
    /// Spawn a session on the current runtime.
    ///
    /// Returns the command handle, the stream of finished blobs, and the
    /// task handle, which resolves once the session has torn down.
    pub fn spawn(
        controller: CaptureController,
    ) -> (
        CaptureHandle,
        mpsc::UnboundedReceiver<MediaBlob>,
        JoinHandle<()>,
    ) {
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(controller.state());

        let session = Self {
            controller,
            commands: commands_rx,
            output: output_tx,
            state: state_tx,
        };
        let task = tokio::spawn(session.run());

        let handle = CaptureHandle {
            commands: commands_tx,
            state: state_rx,
        };
        (handle, output_rx, task)
    }

    async fn run(mut self) {
        tracing::info!("Capture session started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                Some(id) = self.controller.next_timeout() => self.on_timeout(id),
            }
            self.state.send_replace(self.controller.state());
        }

        self.controller.close();
        self.state.send_replace(self.controller.state());
        tracing::info!("Capture session ended");
    }

    async fn handle(&mut self, command: CaptureCommand) {
        tracing::debug!(?command, state = ?self.controller.state(), "Capture command");
        let result = match command {
            CaptureCommand::Open(kind) => match self.controller.open(kind).await {
                Ok(OpenOutcome::Previewing) => Ok(()),
                Ok(OpenOutcome::Delegated(Some(blob))) => {
                    self.emit(blob);
                    Ok(())
                }
                Ok(OpenOutcome::Delegated(None)) => Ok(()),
                Err(e) => Err(e),
            },
            CaptureCommand::CapturePhoto => self.controller.capture_photo().map(|b| self.emit(b)),
            CaptureCommand::StartRecording => self.controller.start_recording().map(|_| ()),
            CaptureCommand::StopRecording => self.controller.stop_recording().map(|b| self.emit(b)),
            CaptureCommand::Reset => self.controller.reset(),
            CaptureCommand::Close => {
                self.controller.close();
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::warn!(?command, error = %e, "Capture command failed");
        }
    }

    fn on_timeout(&mut self, id: RecordingId) {
        match self.controller.on_recording_timeout(id) {
            Ok(Some(blob)) => self.emit(blob),
            Ok(None) => {}
            Err(e) => tracing::warn!(recording = id, error = %e, "Forced stop failed"),
        }
    }

    fn emit(&self, blob: MediaBlob) {
        if self.output.send(blob).is_err() {
            tracing::warn!("Finished media dropped: no consumer");
        }
    }
}
