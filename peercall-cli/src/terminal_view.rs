use async_trait::async_trait;
use colored::*;
use peercall::client::media::{CaptureDevice, CapturedMedia, RemoteStream, TrackSettings};
use peercall::client::{CallView, NegotiationPhase};

/// Prints call progress to the terminal.
pub struct TerminalView;

#[async_trait]
impl CallView for TerminalView {
    async fn show_devices(&self, devices: &[CaptureDevice]) {
        println!("{}", "🎥 Capture devices".cyan().bold());
        for device in devices {
            let label = if device.label.is_empty() {
                "(name hidden)".dimmed().to_string()
            } else {
                device.label.bold().to_string()
            };
            println!("   {}  {}", label, device.device_id.dimmed());
        }
    }

    async fn render_local(&self, media: &CapturedMedia) {
        println!(
            "{} {}",
            "● Local".green().bold(),
            media.device().label
        );
    }

    async fn render_remote(&self, stream: RemoteStream) {
        println!(
            "{} stream {}",
            "● Remote".green().bold(),
            stream.stream_id()
        );
        tokio::spawn(async move {
            if let Some(settings) = stream.wait_for_settings().await {
                println!("{} {}", "   Remote video is".dimmed(), settings);
            }
        });
    }

    async fn resize(&self, settings: TrackSettings) {
        println!("{} {}", "↔ View".cyan(), settings);
    }

    async fn notify_error(&self, message: String) {
        eprintln!("{} {}", "✖".red().bold(), message);
    }

    async fn phase_changed(&self, phase: NegotiationPhase) {
        let phase = match phase {
            NegotiationPhase::Connected => phase.to_string().green(),
            NegotiationPhase::Negotiating => phase.to_string().yellow(),
            NegotiationPhase::Idle => phase.to_string().normal(),
        };
        println!("{} {}", "📞 Call".bold(), phase);
    }
}
