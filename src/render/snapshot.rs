use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::scene::Scene;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumMode {
    Live,
    Synthetic,
}

/// One rendered frame as written to the snapshot stream.
#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
    pub frame: u64,
    pub time: f32,
    pub mode: SpectrumMode,
    pub average: f32,
    pub scene: &'a Scene,
}

/// Writes scene snapshots as JSON lines, one per frame.
pub struct SnapshotWriter<W: Write> {
    out: W,
    frames: u64,
}

impl SnapshotWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create snapshot file: {}", path.display()))?;
        log::info!("Writing scene snapshots to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, frames: 0 }
    }

    pub fn write_frame(&mut self, record: &FrameRecord<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, record).context("Failed to serialize frame")?;
        self.out.write_all(b"\n").context("Failed to write frame")?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush().context("Failed to flush snapshots")?;
        log::info!("Snapshot stream complete: {} frames", self.frames);
        Ok(self.out)
    }
}
