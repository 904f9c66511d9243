//! Check configuration, storage and the capture backend.

use std::path::Path;

use cheezy_capture_engine::backend::SyntheticDevices;
use cheezy_common::config::{config_file_path, AppConfig};
use cheezy_experience_model::FeedView;
use cheezy_platform_core::{MediaDevices, StreamConstraints};
use cheezy_store::{FileBlobStore, JsonlRecordStore};

pub async fn run(config: &AppConfig, explicit: Option<&Path>) -> anyhow::Result<()> {
    println!("Cheezy System Check");
    println!("{}", "=".repeat(50));

    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[OK] Config: defaults ({} not found)", config_path.display());
    }

    let mut healthy = true;

    match FileBlobStore::new(&config.storage) {
        Ok(blobs) => println!("[OK] Blob store: {}", blobs.root().display()),
        Err(e) => {
            healthy = false;
            println!("[FAIL] Blob store: {e}");
        }
    }

    match JsonlRecordStore::new(&config.storage)
        .and_then(|records| records.snapshot(&config.storage.collection))
    {
        Ok(snapshot) => {
            let view = FeedView::from_snapshot(&snapshot);
            println!(
                "[OK] Records: {} experiences in '{}'",
                view.len(),
                config.storage.collection
            );
            if !view.rejected().is_empty() {
                println!("[WARN] {} malformed records are skipped:", view.rejected().len());
                for rejected in view.rejected() {
                    println!("     {}: {}", rejected.id, rejected.reason);
                }
            }
        }
        Err(e) => {
            healthy = false;
            println!("[FAIL] Records: {e}");
        }
    }

    let policy = &config.device;
    println!();
    println!("Device policy: {:?}", policy.form_factor);
    println!("  Native picker capture: {}", policy.uses_native_picker());
    println!("  Stack layout forced:   {}", policy.forces_stack_layout());
    println!("  Idle auto-advance:     {}", policy.auto_advances());

    let devices = SyntheticDevices::new(config.capture.fallback_width, config.capture.fallback_height);
    match devices.request_stream(StreamConstraints::audio_video()).await {
        Ok(mut stream) => {
            let (w, h) = stream.dimensions().unwrap_or((0, 0));
            stream.stop_tracks();
            println!("[OK] Capture backend: {} ({w}x{h})", devices.name());
        }
        Err(e) => {
            healthy = false;
            println!("[FAIL] Capture backend: {e}");
        }
    }

    println!();
    if healthy {
        println!("Everything looks good. Cheezy is ready.");
    } else {
        println!("Some checks failed. See above for details.");
    }
    Ok(())
}
