//! Maps one spectrum frame onto the scene.
//!
//! The mapping is a pure function of the previous scene and the frame, so the
//! render loop can hold the scene by value and replace it every frame. Bar
//! rotation and group spin accumulate across frames; everything else is
//! recomputed from the frame alone.

use std::f32::consts::TAU;

use super::scene::{Hsl, Scene, Vec3};
use crate::audio::spectrum::SpectrumFrame;
use crate::config::VisualConfig;

/// Base spin per frame, before loudness is added.
const GROUP_SPIN: f32 = 0.005;

pub fn map_frame(prev: &Scene, frame: &SpectrumFrame, visual: &VisualConfig) -> Scene {
    let mut next = prev.clone();
    apply_frame(&mut next, frame, visual);
    next
}

pub fn apply_frame(scene: &mut Scene, frame: &SpectrumFrame, visual: &VisualConfig) {
    let avg = frame.average();
    let frame_len = frame.len().max(1) as f32;

    scene.group.rotation.y += GROUP_SPIN + avg / 10000.0;

    for bar in scene.bars.iter_mut() {
        let i = bar.index;
        let freq = normalized(frame, i);

        bar.transform.scale = Vec3::new(0.5 + freq * 0.5, 0.1 + freq * 3.0, 0.5 + freq * 0.5);

        let position = i as f32 / frame_len;
        bar.color = Hsl::new(position * 360.0, 50.0 + freq * 50.0, 30.0 + freq * 40.0);

        let angle = position * TAU;
        let radius = 2.0 + freq;
        bar.transform.position = Vec3::new(radius * angle.cos(), freq * 2.0 - 1.0, radius * angle.sin());

        bar.transform.rotation.x += freq * 0.1;
        bar.transform.rotation.z += freq * 0.05;
    }

    let bass = frame.get(visual.sphere_bin) as f32;
    scene.sphere.radius = 0.5 + bass / 500.0;
    scene.sphere.emissive_intensity = bass / 255.0 * 0.5;

    scene.ring.emissive_intensity = normalized(frame, visual.ring_bin) * 0.3;

    for (light, &bin) in scene.lights.iter_mut().zip(visual.light_bins.iter()) {
        light.intensity = 1.0 + normalized(frame, bin);
    }
}

fn normalized(frame: &SpectrumFrame, index: usize) -> f32 {
    frame.get(index) as f32 / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of(len: usize, f: impl Fn(usize) -> u8) -> SpectrumFrame {
        SpectrumFrame::new((0..len).map(f).collect())
    }

    #[test]
    fn bar_scales_stay_bounded() {
        let visual = VisualConfig::default();
        for level in [0u8, 1, 64, 128, 200, 254, 255] {
            let mut scene = Scene::new(32);
            apply_frame(&mut scene, &frame_of(128, |_| level), &visual);
            for bar in &scene.bars {
                let s = bar.transform.scale;
                assert!((0.1..=3.1).contains(&s.y), "y={}", s.y);
                assert!((0.5..=1.0).contains(&s.x));
                assert!((0.5..=1.0).contains(&s.z));
            }
        }
    }

    #[test]
    fn silent_frame_rests_bars_on_inner_circle() {
        let mut scene = Scene::new(32);
        apply_frame(&mut scene, &frame_of(128, |_| 0), &VisualConfig::default());
        let bar = &scene.bars[0];
        assert_eq!(bar.transform.position, Vec3::new(2.0, -1.0, 0.0));
        assert_eq!(bar.transform.scale, Vec3::new(0.5, 0.1, 0.5));
        assert_eq!(bar.color, Hsl::new(0.0, 50.0, 30.0));
        assert!((scene.group.rotation.y - 0.005).abs() < 1e-7);
    }

    #[test]
    fn full_bar_uses_frame_length_for_placement() {
        let mut scene = Scene::new(32);
        apply_frame(&mut scene, &frame_of(128, |_| 255), &VisualConfig::default());
        let bar = &scene.bars[16];
        // bar 16 of a 128-sample frame sits an eighth of a turn round
        let angle = 16.0 / 128.0 * TAU;
        assert!((bar.transform.position.x - 3.0 * angle.cos()).abs() < 1e-5);
        assert!((bar.transform.position.z - 3.0 * angle.sin()).abs() < 1e-5);
        assert!((bar.transform.position.y - 1.0).abs() < 1e-6);
        assert!((bar.color.h - 45.0).abs() < 1e-4);
        assert_eq!(bar.color.s, 100.0);
        assert_eq!(bar.color.l, 70.0);
    }

    #[test]
    fn fixed_bins_drive_sphere_ring_and_lights() {
        let frame = frame_of(128, |i| match i {
            2 => 250,
            10 => 51,
            15 => 255,
            20 => 102,
            _ => 0,
        });
        let mut scene = Scene::new(32);
        apply_frame(&mut scene, &frame, &VisualConfig::default());
        assert!((scene.sphere.radius - 1.0).abs() < 1e-6);
        assert!((scene.sphere.emissive_intensity - 250.0 / 255.0 * 0.5).abs() < 1e-6);
        assert!((scene.ring.emissive_intensity - 0.3).abs() < 1e-6);
        assert!((scene.lights[0].intensity - 1.2).abs() < 1e-6);
        assert!((scene.lights[1].intensity - 1.4).abs() < 1e-6);
    }

    #[test]
    fn rotation_accumulates_across_frames() {
        let visual = VisualConfig::default();
        let loud = frame_of(128, |_| 255);
        let mut scene = Scene::new(32);
        apply_frame(&mut scene, &loud, &visual);
        apply_frame(&mut scene, &loud, &visual);
        assert!((scene.bars[3].transform.rotation.x - 0.2).abs() < 1e-6);
        assert!((scene.bars[3].transform.rotation.z - 0.1).abs() < 1e-6);
        assert!((scene.group.rotation.y - 2.0 * (0.005 + 0.0255)).abs() < 1e-6);
    }

    #[test]
    fn samples_past_the_bars_only_feed_the_average() {
        let visual = VisualConfig::default();
        let quiet = frame_of(128, |_| 0);
        let tail_loud = frame_of(128, |i| if i >= 32 { 255 } else { 0 });

        let a = map_frame(&Scene::new(32), &quiet, &visual);
        let b = map_frame(&Scene::new(32), &tail_loud, &visual);
        assert_eq!(a.bars, b.bars);
        assert!(b.group.rotation.y > a.group.rotation.y);
    }

    #[test]
    fn map_frame_is_deterministic_and_leaves_previous_untouched() {
        let visual = VisualConfig::default();
        let frame = frame_of(128, |i| (i * 2) as u8);
        let prev = Scene::new(32);
        let a = map_frame(&prev, &frame, &visual);
        let b = map_frame(&prev, &frame, &visual);
        assert_eq!(a, b);
        assert_eq!(prev, Scene::new(32));
    }

    #[test]
    fn configured_bins_are_respected() {
        let visual = VisualConfig {
            bar_count: 8,
            sphere_bin: 0,
            ring_bin: 1,
            light_bins: [2, 3],
        };
        let frame = frame_of(8, |i| if i == 0 { 255 } else { 0 });
        let mut scene = Scene::new(visual.bar_count);
        apply_frame(&mut scene, &frame, &visual);
        assert!((scene.sphere.radius - 1.01).abs() < 1e-6);
        assert_eq!(scene.ring.emissive_intensity, 0.0);
        assert_eq!(scene.lights[0].intensity, 1.0);
    }
}
