use anyhow::Result;
use clap::Parser;
use tracing::info;

use voicenote::{
    AudioFileStore, AudioSettings, GestureEvent, GrantAll, Message, RecordingState,
    SessionController, SineSourceFactory,
};

/// Scripted walkthrough of the voice-message recording core: record two
/// segments, concatenate them, crop the result and send it.
#[derive(Parser)]
#[command(name = "voicenote", version)]
struct Args {
    /// Directory recordings are written to
    #[arg(long, default_value = "recordings")]
    output_dir: String,

    /// Crop position in seconds applied before sending
    #[arg(long, default_value_t = 1.0)]
    crop_to: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let settings = AudioSettings::default();
    let store = AudioFileStore::new(&args.output_dir)?;

    // Synthetic capture: a 2.0s segment followed by a 1.5s re-record.
    let sources = SineSourceFactory::new(440.0, 0.5, 2.0);
    sources.script_segment(2.0);
    sources.script_segment(1.5);

    let (controller, mut updates) =
        SessionController::new(settings, store, Box::new(sources), Box::new(GrantAll));

    tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            match serde_json::to_string(&update) {
                Ok(json) => info!("update: {}", json),
                Err(_) => info!("update: {:?}", update),
            }
        }
    });

    info!("Recording first segment");
    controller.handle(GestureEvent::RecordPressed).await?;
    controller.handle(GestureEvent::RecordReleased).await?;

    if let Some((path, duration)) = controller.pending_clip().await {
        info!("Pending clip: {:?} ({:.2}s)", path, duration);
    }

    info!("Re-recording a second segment on top");
    controller.handle(GestureEvent::RecordPressed).await?;
    controller.handle(GestureEvent::RecordReleased).await?;

    if let Some((path, duration)) = controller.pending_clip().await {
        info!("After concatenation: {:?} ({:.2}s)", path, duration);
    }

    info!("Cropping to {:.2}s", args.crop_to);
    controller
        .handle(GestureEvent::CropSliderChanged(args.crop_to))
        .await?;
    controller.handle(GestureEvent::CropConfirmed).await?;

    info!("Playing back the cropped clip");
    controller.handle(GestureEvent::PlayTapped).await?;
    while controller.state().await == RecordingState::Playing {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    info!("Sending");
    let pending = controller.pending_clip().await;
    controller.handle(GestureEvent::SendTapped).await?;

    if let Some((path, duration)) = pending {
        let message = Message::audio(path, duration);
        info!("Appended to conversation: {}", message.display_text());
    }

    Ok(())
}
