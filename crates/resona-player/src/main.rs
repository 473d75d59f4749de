//! Resona command-line player
//!
//! Plays an audio file through the effect chain, with optional live
//! spectrum display from the default capture device. Effect stages are
//! enabled from the command line; levels are in [0, 1].

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use resona_core::audio::{self, CaptureConfig, PlaybackConfig};
use resona_core::decoder::FileSource;
use resona_core::{DisplayMode, EffectChain, SampleSource, StageControl};

/// Matches the feel of the desktop player this replaces
const LATENCY_HINT_MS: f32 = 150.0;
/// Terminal columns for the spectrum row
const SPECTRUM_COLS: usize = 72;
const METER_GLYPHS: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

struct Args {
    file: PathBuf,
    device: Option<String>,
    stages: Vec<(StageFlag, f32)>,
    spectrum: bool,
    bars: bool,
}

#[derive(Clone, Copy)]
enum StageFlag {
    Echo,
    Reverb,
    Tremolo,
    Chorus,
    Compressor,
}

fn usage() -> &'static str {
    "usage: resona-player [options] <file>\n\
     \n\
     options:\n\
       --echo <level>        enable the echo stage\n\
       --reverb <level>      enable the reverb stage\n\
       --tremolo <level>     enable the tremolo stage\n\
       --chorus <level>      enable the chorus stage\n\
       --compressor <level>  enable the compressor stage\n\
       --spectrum            show a live spectrum of the capture device\n\
       --bars                frequency-bar spectrum instead of the warped line\n\
       --device <name>       output device (default: system default)\n\
       --list-devices        list output devices and exit"
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut file = None;
    let mut device = None;
    let mut stages = Vec::new();
    let mut spectrum = false;
    let mut bars = false;

    let level_arg = |args: &mut dyn Iterator<Item = String>, flag: &str| -> Result<f32> {
        let value = args
            .next()
            .with_context(|| format!("{flag} needs a level argument"))?;
        let level: f32 = value
            .parse()
            .with_context(|| format!("{flag}: '{value}' is not a number"))?;
        if !(0.0..=1.0).contains(&level) {
            bail!("{flag}: level must be in [0, 1], got {level}");
        }
        Ok(level)
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--echo" => stages.push((StageFlag::Echo, level_arg(&mut args, "--echo")?)),
            "--reverb" => stages.push((StageFlag::Reverb, level_arg(&mut args, "--reverb")?)),
            "--tremolo" => stages.push((StageFlag::Tremolo, level_arg(&mut args, "--tremolo")?)),
            "--chorus" => stages.push((StageFlag::Chorus, level_arg(&mut args, "--chorus")?)),
            "--compressor" => {
                stages.push((StageFlag::Compressor, level_arg(&mut args, "--compressor")?))
            }
            "--spectrum" => spectrum = true,
            "--bars" => bars = true,
            "--device" => device = Some(args.next().context("--device needs a name")?),
            "--list-devices" => {
                for name in audio::device::list_output_devices()? {
                    println!("{name}");
                }
                std::process::exit(0);
            }
            "--help" | "-h" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other if !other.starts_with('-') && file.is_none() => {
                file = Some(PathBuf::from(other));
            }
            other => bail!("unexpected argument '{other}'\n{}", usage()),
        }
    }

    Ok(Args {
        file: file.with_context(|| format!("no input file given\n{}", usage()))?,
        device,
        stages,
        spectrum,
        bars,
    })
}

/// Compress a frame's dB values into one terminal row
fn spectrum_row(values: &[f32], floor: f32, cols: usize) -> String {
    let group = (values.len() / cols).max(1);
    values
        .chunks(group)
        .take(cols)
        .map(|chunk| {
            let peak = chunk.iter().copied().fold(floor, f32::max);
            let norm = ((peak - floor) / -floor).clamp(0.0, 1.0);
            let idx = (norm * (METER_GLYPHS.len() - 1) as f32).round() as usize;
            METER_GLYPHS[idx]
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;

    let source = FileSource::open(&args.file)
        .with_context(|| format!("cannot play {}", args.file.display()))?;
    let duration = source.duration_frames();
    let source_rate = source.format().sample_rate;

    let (chain, controls) = EffectChain::new(Box::new(source));
    for &(flag, level) in &args.stages {
        let control: &StageControl = match flag {
            StageFlag::Echo => &controls.echo,
            StageFlag::Reverb => &controls.reverb,
            StageFlag::Tremolo => &controls.tremolo,
            StageFlag::Chorus => &controls.chorus,
            StageFlag::Compressor => &controls.compressor,
        };
        control.configure(true, level);
    }

    let mut playback_config = PlaybackConfig::default().with_latency_hint_ms(LATENCY_HINT_MS);
    if let Some(device) = &args.device {
        playback_config = playback_config.with_device(device.clone());
    }
    let handle = audio::start_playback(chain, &playback_config)?;

    let capture = if args.spectrum {
        let mode = if args.bars {
            DisplayMode::frequency_bars()
        } else {
            DisplayMode::zone_warp()
        };
        match audio::start_capture(mode, &CaptureConfig::default()) {
            Ok((capture_handle, frames)) => Some((capture_handle, frames, mode)),
            Err(e) => {
                log::warn!("spectrum view unavailable: {e}");
                None
            }
        }
    } else {
        None
    };

    while !handle.is_finished() {
        match &capture {
            Some((_handle, frames, mode)) => {
                if let Ok(frame) = frames.recv_timeout(Duration::from_millis(50)) {
                    let row = spectrum_row(&frame.values, mode.floor_db(), SPECTRUM_COLS);
                    print!("\r[{row}] {:6.1}s", handle.position_seconds());
                } else {
                    print!("\r{:6.1}s", handle.position_seconds());
                }
            }
            None => {
                std::thread::sleep(Duration::from_millis(200));
                match duration {
                    Some(total) => print!(
                        "\r{:6.1}s / {:.1}s",
                        handle.position_seconds(),
                        total as f64 / source_rate as f64
                    ),
                    None => print!("\r{:6.1}s", handle.position_seconds()),
                }
            }
        }
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }
    println!();

    if handle.has_failed() {
        bail!("playback stopped early: source read failed");
    }
    log::info!("done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spectrum_row_spans_the_glyph_range() {
        let floor = -80.0;
        let silent = vec![floor; 144];
        assert_eq!(spectrum_row(&silent, floor, 72), " ".repeat(72));

        let loud = vec![0.0; 144];
        assert_eq!(spectrum_row(&loud, floor, 72), "@".repeat(72));
    }

    #[test]
    fn spectrum_row_handles_short_frames() {
        let row = spectrum_row(&[-40.0; 10], -80.0, 72);
        assert_eq!(row.chars().count(), 10);
        assert!(row.chars().all(|c| c == METER_GLYPHS[METER_GLYPHS.len() / 2]));
    }
}
