//! Minimal headless soundboard session.
//!
//! Plays one or more WAV loops from a directory, solos the last one after a
//! few seconds, and prints band-energy bars the whole time:
//!
//! ```text
//! cargo run --example board_demo -- ./assets dungeon tavern
//! ```

use std::time::Duration;

use anyhow::{bail, Context, Result};
use ember_core::{BoardConfig, CellId, CpalSink, Soundboard, WavLoader};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(root) = args.next() else {
        bail!("usage: board_demo <asset-dir> <cell> [cell...]");
    };
    let cells: Vec<CellId> = args.map(CellId::from).collect();
    if cells.is_empty() {
        bail!("no cells named; pass WAV basenames from {root}");
    }

    let sink = CpalSink::new().context("opening audio output")?;
    let board = Soundboard::new(
        BoardConfig::snappy(),
        Box::new(WavLoader::new(&root)),
        Box::new(sink),
    )?;

    for cell in &cells {
        board
            .activate(cell)
            .with_context(|| format!("activating {cell}"))?;
    }

    for second in 0..10 {
        if second == 6 {
            // Isolate the last cell for the tail of the session
            board.solo(cells.last().expect("cells is non-empty"))?;
        }
        print_bars(&board);
        std::thread::sleep(Duration::from_secs(1));
    }

    Ok(())
}

fn print_bars(board: &Soundboard) {
    const GLYPHS: [char; 5] = [' ', '.', ':', '|', '#'];

    let energies = board.band_energies();
    let mut cells: Vec<_> = energies.keys().collect();
    cells.sort();

    for cell in cells {
        let bars: String = energies[cell]
            .iter()
            .map(|&energy| {
                let level = (energy / 10.0).clamp(0.0, 1.0);
                GLYPHS[(level * (GLYPHS.len() - 1) as f32).round() as usize]
            })
            .collect();
        println!("{cell:>12} [{bars}]");
    }
    println!();
}
