use clap::{App, Arg, ArgMatches};
use failure::{format_err, Error};
use log::{info, LevelFilter};
use num::complex::Complex64;
use std::env;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use escapetime::{Formula, Fractal, Palette, Renderer, Seed, Viewport};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex64> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex64 { re, im }),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_positive(s: &str, isnotanumber_err: &str, isnotpositive_err: &str) -> Result<(), String> {
    match f64::from_str(s) {
        Ok(f) if f > 0.0 && f.is_finite() => Ok(()),
        Ok(_) => Err(isnotpositive_err.to_string()),
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const CENTER: &str = "center";
const RANGE: &str = "range";
const ZOOM: &str = "zoom";
const FORMULA: &str = "formula";
const PARAM: &str = "param";
const SEED: &str = "seed";
const DIVERGENCE: &str = "divergence";
const ITERATIONS: &str = "iterations";
const PALETTE: &str = "palette";
const INVERT: &str = "invert";
const THREADS: &str = "threads";
const VERBOSITY: &str = "verbosity";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();
    let formulas = Formula::names();
    let palettes = Palette::names();

    App::new("escapetime")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Escape-time fractal renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file; the format follows the extension"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1920x1080")
                .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(CENTER)
                .long(CENTER)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0,0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse center point"))
                .help("Point of the complex plane at the middle of the image"),
        )
        .arg(
            Arg::with_name(RANGE)
                .long(RANGE)
                .short("r")
                .takes_value(true)
                .default_value("1.5,1.5")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse axis ranges"))
                .help("Half-width and half-height of the window at zoom 1"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .long(ZOOM)
                .short("z")
                .takes_value(true)
                .default_value("1")
                .validator(|s| {
                    validate_positive(&s, "Could not parse zoom", "Zoom must be greater than 0")
                })
                .help("Magnification"),
        )
        .arg(
            Arg::with_name(FORMULA)
                .long(FORMULA)
                .short("f")
                .takes_value(true)
                .default_value("mandelbrot")
                .possible_values(&formulas)
                .help("Recurrence to iterate"),
        )
        .arg(
            Arg::with_name(PARAM)
                .long(PARAM)
                .short("p")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0,0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse parameter"))
                .help("Complex parameter handed to the recurrence"),
        )
        .arg(
            Arg::with_name(SEED)
                .long(SEED)
                .takes_value(true)
                .possible_values(&["coordinate", "parameter"])
                .help("First iterate; defaults to the formula's usual choice"),
        )
        .arg(
            Arg::with_name(DIVERGENCE)
                .long(DIVERGENCE)
                .short("d")
                .takes_value(true)
                .default_value("1000")
                .validator(|s| {
                    validate_positive(
                        &s,
                        "Could not parse divergence threshold",
                        "Divergence threshold must be greater than 0",
                    )
                })
                .help("Magnitude past which a point has escaped"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("20")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        1_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 1000000",
                    )
                })
                .help("Maximum number of iterations per point"),
        )
        .arg(
            Arg::with_name(PALETTE)
                .long(PALETTE)
                .short("m")
                .takes_value(true)
                .default_value("twilight")
                .possible_values(&palettes)
                .help("Color map"),
        )
        .arg(
            Arg::with_name(INVERT)
                .long(INVERT)
                .help("Read the color map from the far end"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads to use in solver; defaults to one per CPU"),
        )
        .arg(
            Arg::with_name(VERBOSITY)
                .long(VERBOSITY)
                .short("v")
                .takes_value(true)
                .default_value("warn")
                .possible_values(&["off", "error", "warn", "info", "debug", "trace"])
                .help("Log level; RUST_LOG overrides it"),
        )
        .get_matches()
}

fn value<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, Error> {
    matches
        .value_of(name)
        .ok_or_else(|| format_err!("Missing value for --{}", name))
}

fn init_logging(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::from_str(level).unwrap_or(LevelFilter::Warn));
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn run() -> Result<(), Error> {
    let matches = args();
    init_logging(value(&matches, VERBOSITY)?);

    let (width, height) = parse_pair::<u16>(value(&matches, SIZE)?, 'x')
        .ok_or_else(|| format_err!("Error parsing image dimensions"))?;
    let center = parse_complex(value(&matches, CENTER)?)
        .ok_or_else(|| format_err!("Error parsing center point"))?;
    let range = parse_pair::<f64>(value(&matches, RANGE)?, ',')
        .ok_or_else(|| format_err!("Error parsing axis ranges"))?;
    let zoom = f64::from_str(value(&matches, ZOOM)?)?;
    let formula = Formula::from_str(value(&matches, FORMULA)?).map_err(|e| format_err!("{}", e))?;
    let param = parse_complex(value(&matches, PARAM)?)
        .ok_or_else(|| format_err!("Error parsing parameter"))?;
    let seed = match matches.value_of(SEED) {
        Some("coordinate") => Seed::Coordinate,
        Some("parameter") => Seed::Parameter,
        _ => formula.default_seed(),
    };
    let divergence = f64::from_str(value(&matches, DIVERGENCE)?)?;
    let iterations = usize::from_str(value(&matches, ITERATIONS)?)?;
    let threads = match matches.value_of(THREADS) {
        Some(threads) => usize::from_str(threads)?,
        None => num_cpus::get(),
    };
    let palette = Palette::named(value(&matches, PALETTE)?)?;
    let output = value(&matches, OUTPUT)?;

    let (width, height) = (usize::from(width), usize::from(height));
    let fractal = Fractal::new(formula, param, divergence, iterations, seed)?;
    let viewport = Viewport::new(width, height, center, range, zoom)?;
    let renderer = Renderer::new(fractal, viewport, palette, matches.is_present(INVERT))?;

    info!(
        "Rendering {} ({:?} seed, parameter {}) at {}x{} on {} threads",
        formula, seed, param, width, height, threads
    );
    let started = Instant::now();
    let done = AtomicUsize::new(0);
    let step = (height / 10).max(1);
    let image = renderer.render_with_progress(threads, |_| {
        let rows = done.fetch_add(1, Ordering::Relaxed) + 1;
        if rows % step == 0 || rows == height {
            info!("{}/{} rows", rows, height);
        }
    })?;
    info!("Rendered in {:?}", started.elapsed());

    image.save(output)?;
    info!("Wrote {}", output);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        for cause in e.iter_causes() {
            eprintln!("caused by: {}", cause);
        }
        std::process::exit(1);
    }
}
