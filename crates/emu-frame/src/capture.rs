//! Headless capture: PNG screenshots of the framebuffer.

use std::error::Error;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use frame_core::Surface;

use crate::frame::Frame;
use crate::video::DISPLAY_SIZE;

/// Save the framebuffer as a PNG, scaled up by an integer factor.
///
/// The framebuffer holds one byte per pixel (0 or 1); pixels are written
/// as black and white RGBA.
///
/// # Errors
///
/// Returns file or encoder errors.
pub fn save_screenshot<S: Surface>(
    frame: &Frame<S>,
    path: &Path,
    scale: u32,
) -> Result<(), Box<dyn Error>> {
    let scale = scale.max(1);
    let size = DISPLAY_SIZE * scale;
    let fb = frame.framebuffer();

    let file = fs::File::create(path)?;
    let w = BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, size, size);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;

    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let src = (y / scale) * DISPLAY_SIZE + (x / scale);
            let value = if fb[src as usize] != 0 { 0xFF } else { 0x00 };
            rgba.extend_from_slice(&[value, value, value, 0xFF]);
        }
    }

    writer.write_image_data(&rgba)?;
    Ok(())
}
