use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use archive::HistoryPacker;
use chrono::NaiveDateTime;
use colors_transform::Color;
use log::{info, warn};
use structures::Rgba;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f UTC", "%Y-%m-%d %H:%M:%S%.f"];

/// One row of a placement log: `timestamp,address,#rrggbb,"x,y"`.
#[derive(Debug, PartialEq, Eq)]
pub struct Placement {
    pub placed_at: NaiveDateTime,
    pub address: String,
    pub color: Rgba,
    pub x: u32,
    pub y: u32,
}

fn field<'a>(record: &'a csv::StringRecord, index: usize, name: &str) -> Result<&'a str> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| anyhow!("missing {} column", name))
}

fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .ok_or_else(|| anyhow!("bad timestamp '{}'", text))
}

pub(crate) fn parse_color(text: &str) -> Result<Rgba> {
    let parsed = colors_transform::Rgb::from_hex_str(text)
        .map_err(|_| anyhow!("bad color '{}'", text))?;

    Ok([
        parsed.get_red() as u8,
        parsed.get_green() as u8,
        parsed.get_blue() as u8,
        0xff,
    ])
}

fn parse_coords(text: &str) -> Result<(u32, u32)> {
    let clean = text.replace('"', "");
    let parts: Vec<&str> = clean.split(',').map(str::trim).collect();

    match parts.as_slice() {
        [x, y] => Ok((
            x.parse().with_context(|| format!("bad x coordinate '{}'", x))?,
            y.parse().with_context(|| format!("bad y coordinate '{}'", y))?,
        )),
        _ => bail!("expected a single 'x,y' pair, got '{}'", text),
    }
}

pub fn parse_placement(record: &csv::StringRecord) -> Result<Placement> {
    let (x, y) = parse_coords(field(record, 3, "coordinate")?)?;

    Ok(Placement {
        placed_at: parse_timestamp(field(record, 0, "timestamp")?)?,
        address: field(record, 1, "address")?.to_string(),
        color: parse_color(field(record, 2, "color")?)?,
        x,
        y,
    })
}

/// Packs a CSV placement log into a history and its players file. Rows that
/// cannot be parsed are skipped.
pub fn pack(in_file: &Path, out_file: &Path, players_file: &Path) -> Result<()> {
    let file = File::open(in_file).with_context(|| format!("open '{}'", in_file.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut packer = HistoryPacker::new();
    let mut skipped = 0;
    for (line, result) in reader.records().enumerate() {
        let placement = result
            .map_err(anyhow::Error::from)
            .and_then(|record| parse_placement(&record));

        match placement {
            Ok(placement) => packer.add_placement(
                placement.x,
                placement.y,
                placement.color,
                &placement.address,
                placement.placed_at,
            ),
            Err(err) => {
                warn!("skipping row {}: {:#}", line + 2, err);
                skipped += 1;
            }
        }
    }

    let placements = packer.num_placements();
    let out = File::create(out_file).with_context(|| format!("create '{}'", out_file.display()))?;
    let (_, roster) = packer.finalize(BufWriter::new(out))?;

    let players =
        File::create(players_file).with_context(|| format!("create '{}'", players_file.display()))?;
    roster.write_addresses(BufWriter::new(players))?;

    info!(
        "packed {} placements from {} players ({} rows skipped)",
        placements,
        roster.len(),
        skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Write};

    use archive::{HistoryReader, Roster};
    use structures::PixelRecord;

    use super::*;

    fn record(fields: &[&str]) -> csv::StringRecord {
        csv::StringRecord::from(fields.to_vec())
    }

    #[test]
    fn parses_a_row() {
        let placement = parse_placement(&record(&[
            "2022-04-04 00:53:51.577 UTC",
            "tz1abc",
            "#FF4500",
            "42,1999",
        ]))
        .unwrap();

        assert_eq!(placement.address, "tz1abc");
        assert_eq!(placement.color, [0xff, 0x45, 0x00, 0xff]);
        assert_eq!((placement.x, placement.y), (42, 1999));
        assert_eq!(
            placement.placed_at.format("%H:%M:%S%.3f").to_string(),
            "00:53:51.577"
        );
    }

    #[test]
    fn timestamps_without_fraction() {
        assert!(parse_timestamp("2022-04-04 00:53:51 UTC").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn rejects_rectangles_and_bad_colors() {
        assert!(parse_coords("1,2,3,4").is_err());
        assert!(parse_coords("1").is_err());
        assert!(parse_coords("-1,2").is_err());
        assert!(parse_color("orange").is_err());
    }

    #[test]
    fn packs_sorted_history_and_players() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("log.csv");
        let history_path = dir.path().join("history.bin");
        let players_path = dir.path().join("players.txt");

        let mut csv = fs::File::create(&csv_path).unwrap();
        writeln!(csv, "timestamp,user_id,pixel_color,coordinate").unwrap();
        writeln!(csv, "2022-04-04 00:00:02.000 UTC,tz1b,#000000,\"1,1\"").unwrap();
        writeln!(csv, "2022-04-04 00:00:01.000 UTC,tz1a,#FFFFFF,\"0,0\"").unwrap();
        writeln!(csv, "garbage,tz1c,#FFFFFF,\"0,0\"").unwrap();
        writeln!(csv, "2022-04-04 00:00:03.000 UTC,tz1b,#FF0000,\"2,0\"").unwrap();
        drop(csv);

        pack(&csv_path, &history_path, &players_path).unwrap();

        let history = HistoryReader::open(&history_path).unwrap();
        let records: Vec<PixelRecord> = history.iter().collect();
        assert_eq!(
            records,
            vec![
                PixelRecord::new(0, 0, [255, 255, 255, 255], 1),
                PixelRecord::new(1, 1, [0, 0, 0, 255], 0),
                PixelRecord::new(2, 0, [255, 0, 0, 255], 0),
            ]
        );

        let roster = Roster::load(&players_path).unwrap();
        assert_eq!(roster.address(0), Some("tz1b"));
        assert_eq!(roster.address(1), Some("tz1a"));
    }
}
