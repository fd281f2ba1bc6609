use crate::glyph::GlyphRamp;
use crate::raster::Raster;

/// Render a grayscale raster into a text frame: one line per pixel row,
/// one glyph per pixel, each row terminated by `\n`.
pub fn render_frame(raster: &Raster, ramp: &GlyphRamp) -> String {
    let (w, h) = (raster.width(), raster.height());
    let mut out = String::with_capacity((w as usize + 1) * h as usize);
    for y in 0..h {
        for &luma in raster.row(y) {
            out.push(ramp.map(luma));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Raster {
        let pixels = (0..width * height)
            .map(|i| ((i * 37) % 256) as u8)
            .collect();
        Raster::new(width, height, pixels).unwrap()
    }

    #[test]
    fn output_shape_matches_raster() {
        let ramp = GlyphRamp::default();
        for (w, h) in [(1, 1), (1, 7), (9, 1), (13, 4), (100, 56)] {
            let frame = render_frame(&gradient(w, h), &ramp);
            let lines: Vec<&str> = frame.lines().collect();
            assert_eq!(lines.len(), h as usize, "{}x{}", w, h);
            assert!(lines.iter().all(|l| l.chars().count() == w as usize));
            assert!(frame.ends_with('\n'));
        }
    }

    #[test]
    fn maps_each_pixel_in_reading_order() {
        let ramp = GlyphRamp::new("#. ").unwrap();
        let raster = Raster::new(3, 2, vec![0, 128, 255, 255, 0, 128]).unwrap();
        assert_eq!(render_frame(&raster, &ramp), "#. \n #.\n");
    }

    #[test]
    fn rendering_is_deterministic() {
        let ramp = GlyphRamp::default();
        let raster = gradient(17, 9);
        assert_eq!(render_frame(&raster, &ramp), render_frame(&raster, &ramp));
    }
}
