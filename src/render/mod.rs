//! Frame sampling and renderers
//!
//! A [`Frame`] is everything needed to paint one instant of the scene. It
//! is sampled from a sequencer through `&self` accessors only, so rendering
//! at any rate never changes the sequence.

mod frame;
mod renderers;

pub use frame::{Frame, cycle_progress, sample_frame};
pub use renderers::{JsonlRenderer, LogRenderer, TextRenderer};

/// Consumer of sampled frames.
pub trait Renderer {
    /// Paints one frame.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the frame cannot be written.
    fn render(&mut self, frame: &Frame) -> std::io::Result<()>;

    /// Flushes buffered output. The default does nothing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if flushing fails.
    fn finish(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, frame: &Frame) -> std::io::Result<()> {
        (**self).render(frame)
    }

    fn finish(&mut self) -> std::io::Result<()> {
        (**self).finish()
    }
}
