//! Capture with the synthetic camera and upload what comes out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cheezy_capture_engine::backend::SyntheticDevices;
use cheezy_capture_engine::{
    CaptureConfig, CaptureController, CaptureKind, CaptureSession, CaptureState, OpenOutcome,
    CAMERA_UNAVAILABLE,
};
use cheezy_common::config::AppConfig;
use cheezy_common::error::CheezyResult;
use cheezy_experience_model::MediaBlob;
use cheezy_platform_core::MediaPicker;

use super::{print_receipt, ConsoleNotifier, Stores};

pub struct CaptureArgs {
    pub kind: CaptureKind,
    pub stop_after: Option<f64>,
    pub deny_permission: bool,
    pub width: u32,
    pub height: u32,
    pub pick: Option<PathBuf>,
    pub name: Option<String>,
    pub caption: Option<String>,
}

/// Native picker stand-in that returns a file given on the command line.
struct FilePicker {
    path: Option<PathBuf>,
}

#[async_trait::async_trait]
impl MediaPicker for FilePicker {
    async fn pick(&self) -> CheezyResult<Option<MediaBlob>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("picked")
            .to_string();
        Ok(Some(MediaBlob::from_file(name, None, data)))
    }
}

pub async fn run(config: &AppConfig, args: CaptureArgs) -> anyhow::Result<()> {
    let stores = Stores::open(config)?;
    let pipeline = stores.pipeline(config);

    let devices = if args.deny_permission {
        SyntheticDevices::denying()
    } else {
        SyntheticDevices::new(args.width, args.height)
    };
    let controller = CaptureController::new(
        Arc::new(devices.clone()),
        CaptureConfig {
            settings: config.capture.clone(),
            policy: config.device,
        },
    )
    .with_picker(Arc::new(FilePicker { path: args.pick }))
    .with_notifier(Arc::new(ConsoleNotifier));

    if config.device.uses_native_picker() {
        println!("Device policy delegates capture to the native picker");
        let mut controller = controller;
        match controller.open(args.kind).await? {
            OpenOutcome::Delegated(Some(blob)) => {
                let receipt = pipeline.upload(&blob, args.name, args.caption).await?;
                print_receipt(&receipt)?;
            }
            OpenOutcome::Delegated(None) => println!("Nothing picked."),
            OpenOutcome::Previewing => controller.close(),
        }
        return Ok(());
    }

    let (handle, finished, session) = CaptureSession::spawn(controller);
    let uploader = {
        let pipeline = pipeline.clone();
        let (name, caption) = (args.name, args.caption);
        tokio::spawn(async move { pipeline.consume(finished, name, caption).await })
    };

    let mut watcher = handle.clone();
    handle.open(args.kind).await?;
    let opened = watcher
        .wait_until(|s| matches!(s, CaptureState::Previewing | CaptureState::Error))
        .await?;

    if opened == CaptureState::Previewing {
        match args.kind {
            CaptureKind::Photo => handle.capture_photo().await?,
            CaptureKind::Video => {
                handle.start_recording().await?;
                let started = tokio::time::timeout(
                    Duration::from_secs(5),
                    watcher.wait_until(|s| s != CaptureState::Previewing),
                )
                .await
                .map_err(|_| anyhow::anyhow!("Recorder did not start"))??;
                if started != CaptureState::Recording {
                    anyhow::bail!("Recorder did not start ({started:?})");
                }
                println!(
                    "Recording... (Ctrl+C to stop, hard cap {}s)",
                    config.capture.max_recording_secs
                );

                let stop_after = args.stop_after;
                let manual_stop = async move {
                    match stop_after {
                        Some(secs) => tokio::time::sleep(Duration::from_secs_f64(secs.max(0.0))).await,
                        None => {
                            let _ = tokio::signal::ctrl_c().await;
                        }
                    }
                };
                tokio::select! {
                    _ = manual_stop => handle.stop_recording().await?,
                    state = watcher.wait_until(|s| s != CaptureState::Recording) => {
                        if state? == CaptureState::Idle {
                            println!("Recording cap reached");
                        }
                    }
                }
            }
        }
        handle.close().await?;
    }

    drop(watcher);
    drop(handle);
    session.await?;

    let results = uploader.await?;
    if opened == CaptureState::Error {
        anyhow::bail!(CAMERA_UNAVAILABLE);
    }
    if results.is_empty() {
        println!("No media was produced");
    }
    for result in results {
        match result {
            Ok(receipt) => print_receipt(&receipt)?,
            Err(e) => eprintln!("{e}"),
        }
    }
    tracing::debug!(
        streams = devices.streams_opened(),
        released = devices.tracks_released(),
        "Synthetic device usage"
    );
    Ok(())
}
