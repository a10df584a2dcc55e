use std::{fs, path::Path};

use anyhow::{Context, Result};
use archive::Roster;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use canvas::{CanvasSurface, GrayMix, Headless, Highlight};
use image::RgbaImage;
use log::{info, warn};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Reads a base image from a PNG file or from a file holding the PNG as
/// base64 text.
pub fn load_base_image(path: &Path) -> Result<RgbaImage> {
    let bytes =
        fs::read(path).with_context(|| format!("read base image '{}'", path.display()))?;

    decode_base_image(&bytes).with_context(|| format!("decode base image '{}'", path.display()))
}

pub fn decode_base_image(bytes: &[u8]) -> Result<RgbaImage> {
    let png = if bytes.starts_with(PNG_SIGNATURE) {
        bytes.to_vec()
    } else {
        decode_base64(bytes).context("base image is neither PNG nor base64")?
    };

    Ok(CanvasSurface::load_base_image(&png, Headless)?.into_image())
}

/// Decodes base64 text, ignoring whitespace and a `data:...,` prefix.
pub(crate) fn decode_base64(text: &[u8]) -> Result<Vec<u8>> {
    let text: Vec<u8> = text
        .iter()
        .copied()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    let payload = match text.iter().position(|byte| *byte == b',') {
        Some(comma) if text.starts_with(b"data:") => &text[comma + 1..],
        _ => &text[..],
    };

    STANDARD.decode(payload).context("not valid base64")
}

/// Loads the players file and, if given, the handles CSV.
pub fn load_roster(players: Option<&Path>, handles: Option<&Path>) -> Result<Roster> {
    let mut roster = match players {
        Some(path) => Roster::load(path)
            .with_context(|| format!("read players '{}'", path.display()))?,
        None => Roster::default(),
    };

    if let Some(path) = handles {
        let count = roster
            .load_handles(path)
            .with_context(|| format!("read handles '{}'", path.display()))?;
        info!("loaded {} handles", count);
    }

    Ok(roster)
}

/// Highlights the player behind `address`. An address the roster does not
/// know highlights nobody.
pub fn highlight_for(address: Option<&str>, roster: &Roster, mix: GrayMix) -> Highlight {
    let Some(address) = address else {
        return Highlight::none().with_mix(mix);
    };

    match roster.index_of(address) {
        Some(index) => {
            info!("highlighting {} (player #{})", address, index);
            Highlight::target(index).with_mix(mix)
        }
        None => {
            warn!("{} is not in the players file, highlighting nobody", address);
            Highlight::none().with_mix(mix)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use super::*;

    fn png() -> Vec<u8> {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn reads_png_and_base64() {
        let png = png();
        let encoded = STANDARD.encode(&png);
        let wrapped = format!(
            "data:image/png;base64,{}\n{}\n",
            &encoded[..10],
            &encoded[10..]
        );

        for input in [png.clone(), encoded.into_bytes(), wrapped.into_bytes()] {
            let image = decode_base_image(&input).unwrap();
            assert_eq!(image.dimensions(), (3, 2));
            assert_eq!(image.get_pixel(2, 1).0, [10, 20, 30, 255]);
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_base_image(b"not an image at all!").is_err());
    }

    #[test]
    fn loads_base_image_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&png()).unwrap();

        assert_eq!(load_base_image(file.path()).unwrap().dimensions(), (3, 2));
    }

    #[test]
    fn unknown_address_highlights_nobody() {
        let roster = Roster::from_addresses("tz1a\ntz1b\n");

        assert_eq!(
            highlight_for(Some("tz1b"), &roster, GrayMix::Legacy).target_player(),
            Some(1)
        );
        assert_eq!(
            highlight_for(Some("tz1c"), &roster, GrayMix::Legacy).target_player(),
            None
        );
        let nobody = Highlight::none().with_mix(GrayMix::Standard);
        assert_eq!(highlight_for(None, &roster, GrayMix::Standard), nobody);
    }

    #[test]
    fn roster_with_handles() {
        let mut players = tempfile::NamedTempFile::new().unwrap();
        writeln!(players, "tz1a\ntz1b").unwrap();
        let mut handles = tempfile::NamedTempFile::new().unwrap();
        writeln!(handles, "bob,tz1b").unwrap();

        let roster = load_roster(Some(players.path()), Some(handles.path())).unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.display_name(1).unwrap(), "@bob as tz1b");
        assert!(load_roster(None, None).unwrap().is_empty());
    }
}
