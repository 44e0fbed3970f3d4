//! chunkanim CLI - inspect and sample animation containers.

use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context};
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use chunkanim::anim::io::{animation_names, read_animation, save_animations_with};
use chunkanim::prelude::*;

fn init_tracing(level: &str) {
    // RUST_LOG wins over the flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chunkanim={}", level)));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut config: Option<PathBuf> = None;
    let mut filtered_args: Vec<&str> = Vec::new();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            "--config" | "-c" => match iter.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => {
                    eprintln!("Error: --config needs a path");
                    process::exit(1);
                }
            },
            _ => filtered_args.push(arg),
        }
    }
    init_tracing(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let settings = match load_settings(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    let result = match filtered_args[0] {
        "info" | "i" => match filtered_args.get(1) {
            Some(file) => cmd_info(file, &settings),
            None => usage("info <file>"),
        },
        "anims" | "a" => match filtered_args.get(1) {
            Some(file) => cmd_anims(file, &settings),
            None => usage("anims <file>"),
        },
        "sample" | "s" => match (filtered_args.get(1), filtered_args.get(2), filtered_args.get(3)) {
            (Some(file), Some(name), Some(time)) => cmd_sample(file, name, time, &settings),
            _ => usage("sample <file> <animation> <time>"),
        },
        "demo" | "d" => match filtered_args.get(1) {
            Some(out) => cmd_demo(out, &settings),
            None => usage("demo <out>"),
        },
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn usage(text: &str) -> anyhow::Result<()> {
    bail!("missing arguments\nUsage: chunkanim {}", text)
}

fn load_settings(path: Option<PathBuf>) -> anyhow::Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load(&path).with_context(|| format!("loading {}", path.display()))?,
        None => Settings::from_env().context("loading settings from CHUNKANIM_CONFIG")?,
    };
    debug!(?settings, "settings");
    Ok(settings)
}

fn print_help() {
    println!("chunkanim - chunked animation container toolkit");
    println!();
    println!("USAGE:");
    println!("    chunkanim [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>                Show header and chunk table");
    println!("    a, anims  <file>                List animations and their tracks");
    println!("    s, sample <file> <anim> <time>  Evaluate every track of an animation");
    println!("    d, demo   <out>                 Write a small demo container");
    println!("    h, help                         Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose        Debug logging");
    println!("    -vv, --trace         Trace logging");
    println!("    -q, --quiet          Errors only");
    println!("    -c, --config <json>  Settings file (default: $CHUNKANIM_CONFIG)");
}

fn cmd_info(file: &str, settings: &Settings) -> anyhow::Result<()> {
    let reader = ChunkReader::open_with(file, &settings.reader).with_context(|| format!("opening {}", file))?;
    let index = reader.index();

    println!("File:     {}", file);
    println!("Version:  {}", reader.version());
    println!("Size:     {} bytes", reader.stream_len());
    println!("Index at: {}", reader.index_offset());
    println!("Chunks:   {}", index.len());
    println!();
    println!("{:>4}  {:<16}  {:>10}  {:>10}  label", "#", "id", "offset", "length");
    for (i, (record, label)) in index.entries().enumerate() {
        println!(
            "{:>4}  {}  {:>10}  {:>10}  {}",
            i,
            record.id,
            record.offset,
            record.length,
            label.unwrap_or("?")
        );
    }
    Ok(())
}

fn cmd_anims(file: &str, settings: &Settings) -> anyhow::Result<()> {
    let mut reader =
        ChunkReader::open_with(file, &settings.reader).with_context(|| format!("opening {}", file))?;
    let names = animation_names(&mut reader)?;
    if names.is_empty() {
        println!("No animations in {}", file);
        return Ok(());
    }

    let rate = settings.playback.sample_rate;
    for name in &names {
        let anim = read_animation(&mut reader, name)?;
        let frames = (anim.duration() * rate).ceil() as u64;
        println!(
            "{}  duration {}s ({} frames @ {} fps){}",
            anim.name(),
            anim.duration(),
            frames,
            rate,
            if anim.is_looping() { "  loop" } else { "" }
        );
        for track in anim.tracks() {
            println!(
                "    {:<20} {:<6} {:<7} {} keys",
                track.key,
                track.data.kind(),
                track.data.interpolation(),
                track.data.len()
            );
        }
    }
    Ok(())
}

fn cmd_sample(file: &str, name: &str, time: &str, settings: &Settings) -> anyhow::Result<()> {
    let time: f32 = time.parse().with_context(|| format!("invalid time '{}'", time))?;
    let mut reader =
        ChunkReader::open_with(file, &settings.reader).with_context(|| format!("opening {}", file))?;
    let anim = read_animation(&mut reader, name)?;

    println!("{} @ {}s", anim.name(), time);
    for (key, value) in anim.evaluate(time) {
        println!("    {} = {}", key, value);
    }
    Ok(())
}

fn cmd_demo(out: &str, settings: &Settings) -> anyhow::Result<()> {
    let height = Track::<f32>::with_keys(Interpolation::Spline, [(0.0, 0.0), (0.5, 2.0), (1.0, 0.0)])?;
    let squash = Track::with_keys(
        Interpolation::Linear,
        [(0.0, Vec3::new(1.2, 0.8, 1.2)), (0.25, Vec3::ONE), (1.0, Vec3::new(1.2, 0.8, 1.2))],
    )?;
    let airborne = Track::with_keys(Interpolation::None, [(0.0, false), (0.1, true), (0.9, false)])?;
    let bounce = Animation::new("bounce", 1.0)?
        .with_looping(true)?
        .with_track("height", height)?
        .with_track("scale", squash)?
        .with_track("airborne", airborne)?;

    let spin = Track::with_keys(
        Interpolation::Spline,
        [
            (0.0, Quat::IDENTITY),
            (1.0, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
            (2.0, Quat::from_rotation_y(std::f32::consts::PI)),
        ],
    )?;
    let fade = Track::with_keys(Interpolation::Linear, [(0.0, Color::WHITE), (2.0, Color::TRANSPARENT)])?;
    let frame = Track::with_keys(Interpolation::Linear, [(0.0, 0), (2.0, 48)])?;
    let turn = Animation::new("turn", 2.0)?
        .with_track("rotation", spin)?
        .with_track("tint", fade)?
        .with_track("frame", frame)?;

    save_animations_with(out, &[bounce, turn], &settings.writer).with_context(|| format!("writing {}", out))?;
    info!(path = out, "wrote demo container");
    Ok(())
}
