use std::io::Write;

use tracing::debug;

use super::{Frame, Renderer};

/// Writes frames to the log at debug level.
#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: u64,
}

impl LogRenderer {
    /// Creates a log renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self { frames: 0 }
    }

    /// Frames logged so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, frame: &Frame) -> std::io::Result<()> {
        self.frames += 1;
        debug!(
            index = frame.index,
            elapsed_ms = frame.elapsed_ms,
            phase = %frame.phase,
            color = %frame.bulb.color,
            opacity = frame.bulb.opacity,
            brightness = frame.bulb.brightness,
            pendulum = frame.pendulum_angle,
            "frame"
        );
        Ok(())
    }
}

/// Writes each frame as one JSON object per line.
#[derive(Debug)]
pub struct JsonlRenderer<W: Write> {
    writer: W,
}

impl<W: Write> JsonlRenderer<W> {
    /// Creates a renderer writing to `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Renderer for JsonlRenderer<W> {
    fn render(&mut self, frame: &Frame) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Writes one aligned text line per frame.
#[derive(Debug)]
pub struct TextRenderer<W: Write> {
    writer: W,
}

impl<W: Write> TextRenderer<W> {
    /// Creates a renderer writing to `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    #[allow(clippy::cast_precision_loss)]
    fn render(&mut self, frame: &Frame) -> std::io::Result<()> {
        let halo = frame
            .bulb
            .halo_opacity
            .map_or_else(|| "   -".to_string(), |h| format!("{h:4.2}"));
        let headline = if frame.params.headline.text_shadow.is_some() {
            "lit"
        } else {
            "dim"
        };
        write!(
            self.writer,
            "{:>8.3}s  {:<10}  bulb {} op {:4.2} br {:4.2} halo {}  swing {:>6.1}°  {}",
            frame.elapsed_ms as f64 / 1000.0,
            frame.phase.as_str(),
            frame.bulb.color,
            frame.bulb.opacity,
            frame.bulb.brightness,
            halo,
            frame.pendulum_angle,
            headline,
        )?;
        if let Some(projectile) = frame.projectile {
            write!(self.writer, "  projectile x {:>7.1}", projectile.x)?;
        }
        writeln!(self.writer)
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}
