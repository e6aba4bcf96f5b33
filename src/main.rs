//! Headless demo: run the simulator for a few seconds and save the last
//! frame as a PNG.
//!
//! Run with: `cargo run --release [size]`

use std::sync::mpsc;
use std::time::{Duration, Instant};
use wavepool::{Engine, Rgb, SourceKind, Vec2};

const RUN_FOR: Duration = Duration::from_secs(4);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let size: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(300);

    println!("=== wavepool demo ===");
    println!("Grid: {}x{}", size, size);
    println!("Sources: center point + sweeping point");
    println!("Running for {:?}...", RUN_FOR);

    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    let center = size as f32 / 2.0;

    let engine = Engine::builder()
        .with_size(size)
        .with_threads(4)
        .with_ips(100)
        .with_fps(25)
        .with_oscillator(0, |o| {
            o.active(true)
                .anchors(Vec2::new(center, center), Vec2::ZERO)
                .period(30)
                .amplitude(6.0);
        })
        .with_oscillator(1, |o| {
            o.active(true)
                .source(SourceKind::MovingPoint)
                .anchors(
                    Vec2::new(size as f32 * 0.2, size as f32 * 0.2),
                    Vec2::new(size as f32 * 0.8, size as f32 * 0.2),
                )
                .period(24)
                .amplitude(4.0)
                .move_period(400);
        })
        .with_visuals(|v| {
            v.crest_color(Rgb::from_hex(0xd8ecff))
                .trough_color(Rgb::from_hex(0x03182e))
                .amplitude_multiplier(14.0);
        })
        .on_frame(move |rgb| {
            let _ = tx.send(rgb.to_vec());
        })
        .build()?;

    engine.start();

    let deadline = Instant::now() + RUN_FOR;
    let mut frames = 0u32;
    let mut last_frame = None;
    while Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(frame) => {
                frames += 1;
                last_frame = Some(frame);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    engine.stop();
    let steps = engine.tick();
    engine.dispose();

    println!("Completed {} steps, received {} frames", steps, frames);

    if let Some(frame) = last_frame {
        let image = image::RgbImage::from_raw(size as u32, size as u32, frame)
            .ok_or("frame buffer size mismatch")?;
        image.save("wavepool.png")?;
        println!("Saved final frame to wavepool.png");
    } else {
        println!("No frame was painted");
    }
    Ok(())
}
