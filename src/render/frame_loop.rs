//! Fixed-rate render loop.
//!
//! Each tick: advance playback by one frame period, pull a spectrum frame,
//! map it onto the scene, and emit a snapshot. Time comes from the frame
//! counter, so output is independent of how fast the host runs.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;

use super::mapping::map_frame;
use super::scene::Scene;
use super::snapshot::{FrameRecord, SnapshotWriter, SpectrumMode};
use crate::audio::spectrum::{SignalHandle, SpectrumSource};
use crate::config::VisualConfig;
use crate::playback::controller::PlaybackController;
use crate::playback::element::AudioElement;

#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub fps: u32,
    pub duration_secs: f32,
    /// Toggle playback off once this much time has elapsed.
    pub pause_at: Option<f32>,
}

impl LoopSettings {
    pub fn total_frames(&self) -> u64 {
        (self.duration_secs.max(0.0) * self.fps as f32).round() as u64
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoopSummary {
    pub frames: u64,
    pub live_frames: u64,
    pub synthetic_frames: u64,
}

pub fn progress_bar(total_frames: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_frames);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

pub struct FrameLoop<'a> {
    pub source: &'a mut SpectrumSource,
    pub scene: &'a mut Scene,
    pub visual: &'a VisualConfig,
    pub settings: &'a LoopSettings,
}

impl FrameLoop<'_> {
    pub fn run<A, W>(
        &mut self,
        controller: &mut PlaybackController<A>,
        writer: &mut SnapshotWriter<W>,
        progress: &ProgressBar,
    ) -> Result<LoopSummary>
    where
        A: AudioElement + SignalHandle,
        W: Write,
    {
        let fps = self.settings.fps.max(1);
        let dt = 1.0 / fps as f32;
        let total = self.settings.total_frames();
        let mut paused = false;
        let mut summary = LoopSummary::default();

        for k in 0..total {
            let elapsed = k as f32 * dt;
            if k > 0 {
                controller.tick(dt);
            }
            if controller.state().has_preview && controller.element().ended() {
                log::info!("Preview ended at {:.2}s", elapsed);
                break;
            }
            if let Some(at) = self.settings.pause_at {
                if !paused && elapsed >= at {
                    paused = true;
                    if controller.state().is_playing {
                        controller.toggle_play_pause()?;
                        log::info!("Paused at {:.2}s", elapsed);
                    }
                }
            }

            let demo_mode = controller.state().demo_mode;
            let element = controller.element();
            let live = !demo_mode && element.is_decoding();
            let frame = self.source.next_frame(Some(element as &dyn SignalHandle), demo_mode, elapsed);
            *self.scene = map_frame(self.scene, &frame, self.visual);

            let mode = if live && self.source.is_bound() {
                summary.live_frames += 1;
                SpectrumMode::Live
            } else {
                summary.synthetic_frames += 1;
                SpectrumMode::Synthetic
            };

            writer.write_frame(&FrameRecord {
                frame: k,
                time: elapsed,
                mode,
                average: frame.average(),
                scene: &*self.scene,
            })?;
            summary.frames += 1;
            progress.set_position(k + 1);
        }

        self.source.release();
        progress.finish_with_message("Rendering complete");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::AudioData;
    use crate::audio::spectrum::SyntheticGenerator;
    use crate::catalog::model::Track;
    use crate::config::{AudioConfig, VisualConfig};
    use crate::playback::element::{ClipLoader, PlaybackError, PreviewElement};

    const RATE: u32 = 8000;

    struct SineLoader {
        seconds: f32,
    }

    impl ClipLoader for SineLoader {
        fn load(&self, _src: &str) -> Result<AudioData, PlaybackError> {
            let len = (self.seconds * RATE as f32) as usize;
            let samples = (0..len)
                .map(|n| 0.5 * (std::f32::consts::TAU * 440.0 * n as f32 / RATE as f32).sin())
                .collect();
            Ok(AudioData { samples, sample_rate: RATE })
        }
    }

    fn track(preview: Option<&str>) -> Track {
        Track {
            id: "t".into(),
            name: "T".into(),
            artists: Vec::new(),
            album: None,
            preview_url: preview.map(str::to_string),
            duration_ms: 30_000,
        }
    }

    fn run(
        clip_seconds: f32,
        preview: Option<&str>,
        settings: LoopSettings,
    ) -> (LoopSummary, Vec<serde_json::Value>, Scene) {
        let mut controller = PlaybackController::new(PreviewElement::new(SineLoader { seconds: clip_seconds }));
        let _ = controller.select_track(track(preview));

        let visual = VisualConfig::default();
        let mut source = SpectrumSource::with_generator(AudioConfig::default(), SyntheticGenerator::seeded(3));
        let mut scene = Scene::new(visual.bar_count);
        let mut writer = SnapshotWriter::new(Vec::new());

        let summary = FrameLoop {
            source: &mut source,
            scene: &mut scene,
            visual: &visual,
            settings: &settings,
        }
        .run(&mut controller, &mut writer, &ProgressBar::hidden())
        .unwrap();
        assert!(!source.is_bound());

        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        let records = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        (summary, records, scene)
    }

    fn modes(records: &[serde_json::Value]) -> Vec<&str> {
        records.iter().map(|r| r["mode"].as_str().unwrap()).collect()
    }

    #[test]
    fn demo_runs_full_duration_synthetic() {
        let settings = LoopSettings { fps: 10, duration_secs: 1.5, pause_at: None };
        let (summary, records, scene) = run(1.0, None, settings);
        assert_eq!(summary.frames, 15);
        assert_eq!(summary.synthetic_frames, 15);
        assert!(modes(&records).iter().all(|m| *m == "synthetic"));
        assert!(scene.group.rotation.y > 15.0 * 0.005);
        assert_eq!(records[3]["frame"], 3);
    }

    #[test]
    fn live_preview_stops_when_clip_ends() {
        let settings = LoopSettings { fps: 10, duration_secs: 2.0, pause_at: None };
        let (summary, records, _) = run(0.5, Some("https://x/preview.mp3"), settings);
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.live_frames, 5);
        assert!(modes(&records).iter().all(|m| *m == "live"));
    }

    #[test]
    fn pause_switches_to_synthetic() {
        let settings = LoopSettings { fps: 10, duration_secs: 1.0, pause_at: Some(0.5) };
        let (summary, records, _) = run(10.0, Some("https://x/preview.mp3"), settings);
        assert_eq!(summary.frames, 10);
        let modes = modes(&records);
        assert!(modes[..5].iter().all(|m| *m == "live"));
        assert!(modes[5..].iter().all(|m| *m == "synthetic"));
    }

    #[test]
    fn total_frames_rounds() {
        let settings = LoopSettings { fps: 60, duration_secs: 0.51, pause_at: None };
        assert_eq!(settings.total_frames(), 31);
        let negative = LoopSettings { fps: 60, duration_secs: -1.0, pause_at: None };
        assert_eq!(negative.total_frames(), 0);
    }
}
