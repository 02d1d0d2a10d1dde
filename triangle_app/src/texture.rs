//! Pixels for the textured quad

use thiserror::Error;

/// Failure to produce quad pixels from a file
#[derive(Error, Debug)]
pub enum TextureLoadError {
    /// The file could not be opened or decoded
    #[error("Failed to load texture {path}: {source}")]
    Decode {
        /// File that was requested
        path: String,
        /// Decoder error
        source: image::ImageError,
    },
}

/// Tightly packed RGBA8 pixels
pub struct Pixels {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// `width * height * 4` bytes, row-major
    pub rgba: Vec<u8>,
}

/// Black and white checkerboard with `cells` squares per side
pub fn checkerboard(size: u32, cells: u32) -> Pixels {
    let cell = (size / cells.max(1)).max(1);
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);

    for y in 0..size {
        for x in 0..size {
            let value = if (x / cell + y / cell) % 2 == 0 { 255 } else { 32 };
            rgba.extend_from_slice(&[value, value, value, 255]);
        }
    }

    Pixels {
        width: size,
        height: size,
        rgba,
    }
}

/// Decode an image file into RGBA8
pub fn load_png(path: &str) -> Result<Pixels, TextureLoadError> {
    let decoded = image::open(path).map_err(|source| TextureLoadError::Decode {
        path: path.to_string(),
        source,
    })?;
    let rgba = decoded.to_rgba8();

    Ok(Pixels {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkerboard_size_and_cells() {
        let pixels = checkerboard(8, 2);
        assert_eq!(pixels.rgba.len(), 8 * 8 * 4);
        // Top-left cell is light, the one to its right is dark
        assert_eq!(pixels.rgba[0], 255);
        assert_eq!(pixels.rgba[4 * 4], 32);
        // Alpha is always opaque
        assert!(pixels.rgba.chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_png("does/not/exist.png").is_err());
    }
}
