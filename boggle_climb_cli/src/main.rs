use std::fs::File;
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use boggle_climb::{
    load_words, read_score_log_file, run_search, BigramFrequencies, Board, BoggleError, DiceSet,
    Improvement, ScoreCurve, SearchParams, Solver, REFERENCE_SCORE, TREND_HORIZON_S,
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::combinators::LogCoord;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::IntoLogRange;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TITLE: &str = "Plot to convince my wife I need to upgrade my computer";
const X_AXIS_MIN_S: f64 = 1e-1;
const SERIES_COLOR: RGBColor = RGBColor(0xc0, 0x51, 0x31);
const REFERENCE_COLOR: RGBColor = RGBColor(0x6c, 0x6f, 0x70);
const TREND_COLOR: RGBColor = RGBColor(0xef, 0x82, 0x00);

#[derive(Parser, Debug)]
#[command(author, version, about = "Boggle hill-climb search and reporting CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the hill-climb search, appending each new best score to the log
    Search(SearchArgs),
    /// Score a single board file against the dictionary
    Score(ScoreArgs),
    /// Render the score log as the annotated score-over-time chart
    Report(ReportArgs),
}

#[derive(Parser, Debug)]
struct SearchArgs {
    /// Output score log CSV path (`-` for stdout)
    #[arg(short, long, default_value = "boggle.csv", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Dictionary word list, one word per line
    #[arg(long, default_value = "dictionaries/enable1.txt", value_hint = ValueHint::FilePath)]
    dictionary: PathBuf,

    /// Dice set to roll boards from
    #[arg(long, value_enum, default_value_t = DiceOpt::Classic)]
    dice: DiceOpt,

    /// Worker thread count (defaults to available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Stop after this many seconds (runs until killed if omitted)
    #[arg(long)]
    duration: Option<u64>,

    /// Seconds between random restarts
    #[arg(long, default_value_t = 300)]
    restart: u64,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct ScoreArgs {
    /// Board file to score
    #[arg(value_hint = ValueHint::FilePath)]
    board: PathBuf,

    /// Dictionary word list, one word per line
    #[arg(long, default_value = "dictionaries/enable1.txt", value_hint = ValueHint::FilePath)]
    dictionary: PathBuf,

    /// Print every found word with its points
    #[arg(long, action = ArgAction::SetTrue)]
    words: bool,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct ReportArgs {
    /// Input score log CSV
    #[arg(default_value = "boggle.csv", value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output PNG figure path
    #[arg(short, long, default_value = "score.png", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Optional SVG figure path
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DiceOpt {
    Classic,
    Classic83,
    Master,
    Big,
}

impl From<DiceOpt> for DiceSet {
    fn from(value: DiceOpt) -> Self {
        match value {
            DiceOpt::Classic => DiceSet::Classic1992,
            DiceOpt::Classic83 => DiceSet::Classic1983,
            DiceOpt::Master => DiceSet::Master,
            DiceOpt::Big => DiceSet::Big,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Search(args) => args.verbose,
        Command::Score(args) => args.verbose,
        Command::Report(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Search(args) => handle_search(args),
        Command::Score(args) => handle_score(args),
        Command::Report(args) => handle_report(args),
    }
}

fn handle_search(args: SearchArgs) -> Result<()> {
    let words = load_words(&args.dictionary)?;
    let dice: DiceSet = args.dice.into();
    let (rows, cols) = dice.dims();
    let solver = Solver::new(rows, cols, &words)?;
    let freqs = BigramFrequencies::from_words(&words, rows * cols);
    info!("Dictionary loaded: {} words", words.len());

    let mut params = SearchParams {
        dice,
        ..SearchParams::default()
    };
    if let Some(workers) = args.workers {
        params.workers = workers;
    }
    params.duration = args.duration.map(Duration::from_secs);
    params.restart_interval = Duration::from_secs(args.restart.max(1));
    params.seed = args.seed;

    let summary = if args.output.as_os_str() == "-" {
        let stdout = io::stdout();
        let handle = stdout.lock();
        let mut writer = csv::Writer::from_writer(handle);
        run_search(&solver, &freqs, &params, |imp| {
            write_improvement(&mut writer, imp)
        })?
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("failed to create {}", args.output.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        let summary = run_search(&solver, &freqs, &params, |imp| {
            write_improvement(&mut writer, imp)
        })?;
        info!("Wrote score log: {}", args.output.display());
        summary
    };

    info!(
        "Best score {} after {} improvements in {:.1} s",
        summary.best_score,
        summary.improvements,
        summary.elapsed.as_secs_f64()
    );
    if !summary.best_cells.is_empty() {
        info!("Best board: {}", summary.best_cells.join(" "));
    }
    Ok(())
}

fn write_improvement<W: Write>(
    writer: &mut csv::Writer<W>,
    improvement: &Improvement,
) -> Result<(), BoggleError> {
    let mut record = vec![
        improvement.epoch.to_string(),
        improvement.elapsed_ms.to_string(),
        improvement.score.to_string(),
    ];
    record.extend(improvement.cells.iter().cloned());
    writer
        .write_record(&record)
        .and_then(|_| writer.flush().map_err(csv::Error::from))
        .map_err(|e| BoggleError::LogWrite(e.to_string()))?;
    info!(
        "New best score {} at {} ms",
        improvement.score, improvement.elapsed_ms
    );
    Ok(())
}

fn handle_score(args: ScoreArgs) -> Result<()> {
    let board = Board::from_file(&args.board)?;
    let solver = Solver::from_word_file(board.rows(), board.cols(), &args.dictionary)?;
    let solution = solver.solve(&board)?;

    println!("{}", board);
    println!("score: {}", solution.score);
    if args.words {
        for found in &solution.words {
            println!("{:>4}  {}", found.points, found.word);
        }
    }
    info!("Found {} words", solution.words.len());
    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<()> {
    let observations = read_score_log_file(&args.input)?;
    let curve = ScoreCurve::from_observations(&observations)?;
    info!(
        "Score log parsed: {} observations, best {:.0} at {:.1} s",
        curve.len(),
        curve.y_max(),
        curve.x_max()
    );

    render_chart_guard(&curve, &args.output, ChartKind::Png)
        .map_err(|err| anyhow!("failed to render {}: {}", args.output.display(), err))?;
    info!("Wrote plot: {}", args.output.display());

    if let Some(path) = args.svg.as_ref() {
        render_chart_guard(&curve, path, ChartKind::Svg)
            .map_err(|err| anyhow!("failed to render {}: {}", path.display(), err))?;
        info!("Wrote plot: {}", path.display());
    }
    Ok(())
}

enum ChartKind {
    Png,
    Svg,
}

fn render_chart_guard(curve: &ScoreCurve, path: &Path, kind: ChartKind) -> Result<(), String> {
    let render =
        || -> Result<(), String> { render_report(curve, path, kind).map_err(|e| e.to_string()) };
    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn render_report(curve: &ScoreCurve, path: &Path, kind: ChartKind) -> Result<()> {
    match kind {
        ChartKind::Png => {
            let root = BitMapBackend::new(path, (1280, 760)).into_drawing_area();
            draw_report(root, curve)
        }
        ChartKind::Svg => {
            let root = SVGBackend::new(path, (1280, 760)).into_drawing_area();
            draw_report(root, curve)
        }
    }
}

type ReportCoord = Cartesian2d<LogCoord<f64>, RangedCoordf64>;

fn draw_report<DB>(root: DrawingArea<DB, plotters::coord::Shift>, curve: &ScoreCurve) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let area = root;
    area.fill(&WHITE)?;

    let y_top = curve.y_max().max(REFERENCE_SCORE) * 1.08;

    let mut chart = ChartBuilder::on(&area)
        .margin(25)
        .caption(
            TITLE,
            FontDesc::new(FontFamily::SansSerif, 24.0, FontStyle::Normal),
        )
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d((X_AXIS_MIN_S..TREND_HORIZON_S).log_scale(), 0.0..y_top)?;

    chart
        .configure_mesh()
        .light_line_style(&TRANSPARENT)
        .bold_line_style(&TRANSPARENT)
        .x_desc("simulation time (s)")
        .y_desc("best score so far")
        .x_label_formatter(&|v| format!("{:.0e}", v))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .axis_desc_style(
            FontDesc::new(FontFamily::SansSerif, 18.0, FontStyle::Normal).color(&BLACK.mix(0.85)),
        )
        .label_style(
            FontDesc::new(FontFamily::SansSerif, 15.0, FontStyle::Normal).color(&BLACK.mix(0.85)),
        )
        .draw()?;

    // dotted gridlines on the decade ticks
    for exp in -1..=17 {
        let x = 10f64.powi(exp);
        chart.draw_series(DashedLineSeries::new(
            vec![(x, 0.0), (x, y_top)],
            2,
            4,
            REFERENCE_COLOR.mix(0.5).stroke_width(1),
        ))?;
    }

    // dashed benchmark line
    chart.draw_series(DashedLineSeries::new(
        vec![
            (X_AXIS_MIN_S, REFERENCE_SCORE),
            (TREND_HORIZON_S, REFERENCE_SCORE),
        ],
        8,
        6,
        REFERENCE_COLOR.stroke_width(1),
    ))?;

    // the observed series; the log axis cannot place t = 0, so clip below the
    // axis minimum
    let series: Vec<(f64, f64)> = curve.points().filter(|(t, _)| *t >= X_AXIS_MIN_S).collect();
    chart.draw_series(LineSeries::new(series, SERIES_COLOR.stroke_width(2)))?;

    // dotted trend from the best observation out to the benchmark
    let [from, to] = curve.trend_to_reference();
    chart.draw_series(DashedLineSeries::new(
        vec![from, to],
        2,
        5,
        TREND_COLOR.stroke_width(2),
    ))?;

    draw_label(&area, &chart, (0.5, 2000.0), "my simulations", &SERIES_COLOR)?;
    draw_label(
        &area,
        &chart,
        (0.5, 4300.0),
        "best score from Sedgewick & Wayne students",
        &REFERENCE_COLOR,
    )?;
    draw_label(
        &area,
        &chart,
        (1e10, 2500.0),
        "performance required\nto beat S&W students\nbefore sun goes nova",
        &TREND_COLOR,
    )?;

    area.present()?;
    Ok(())
}

/// Annotated text on a white box, anchored at a data coordinate.
fn draw_label<DB>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    chart: &ChartContext<'_, DB, ReportCoord>,
    pos: (f64, f64),
    text: &str,
    color: &RGBColor,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let style = FontDesc::new(FontFamily::SansSerif, 16.0, FontStyle::Normal).color(color);
    let lines: Vec<&str> = text.split('\n').collect();

    let mut width = 0u32;
    let mut line_height = 0u32;
    for line in &lines {
        let (w, h) = area.estimate_text_size(line, &style)?;
        width = width.max(w);
        line_height = line_height.max(h);
    }

    let (px, py) = chart.backend_coord(&pos);
    let pad = 4i32;
    let total_height = line_height as i32 * lines.len() as i32;
    area.draw(&Rectangle::new(
        [
            (px - pad, py - pad),
            (px + width as i32 + pad, py + total_height + pad),
        ],
        WHITE.filled(),
    ))?;
    for (i, line) in lines.iter().enumerate() {
        area.draw(&Text::new(
            *line,
            (px, py + i as i32 * line_height as i32),
            style.clone(),
        ))?;
    }
    Ok(())
}
