//! The `sensenav` command line tool.
//!
//! ```shell
//! cargo run --bin sensenav -- analyze --scenario complex-3d
//! cargo run --bin sensenav -- --mode unified -d 6 render -p cloud.ron -o out.wav
//! cargo run --bin sensenav -- boundary -x 100 -y 50 --width 80 --height 60 --depth 0.5
//! cargo run --bin sensenav -- depth -i map.ron -o closest.wav
//! cargo run --bin sensenav -- --seed 4 render --ring 24 -o ring.wav
//! RUST_LOG=info cargo run --bin sensenav -- listen --port /dev/ttyUSB0
//! ```

use clap::Parser;
use log::{debug, error, info, warn};
use serial2::SerialPort;
use std::{fs, io, path::Path, process::ExitCode, time::Duration};

use sensenav::{
    args::{
        BoundaryCommand, CommandTask, DemoCommand, DepthCommand, ListenCommand, RenderCommand,
        SenseNavArgs,
    },
    boundary::{process_boundary_obstacle_with, BoundaryInput, BoundingBox},
    config::EngineConfig,
    depth_region::{find_closest_region, DepthMap},
    dummy_cloud::SCENARIOS,
    geometry::SectorMap,
    report::{AnalysisReport, SectorTable},
    sensor_decoder::LineAssembler,
    sequencer::Sequencer,
    wav_writer::write_wav,
    Result,
};

fn main() -> ExitCode {
    env_logger::init();
    let args = SenseNavArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("sensenav: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: SenseNavArgs) -> Result<()> {
    let config = args.engine_config()?;
    debug!("Running with {config:#?}");

    let seed = args.seed;
    match args.command {
        CommandTask::Analyze(source) => {
            let (picked, targets) = config.analyze(source.load(seed)?);
            let report = AnalysisReport::new(&picked, &targets, &config.render.distance_range);
            println!("{}", report.to_ron()?);
        }
        CommandTask::Render(cmd) => render(&config, cmd, seed)?,
        CommandTask::Boundary(cmd) => boundary(&config, cmd)?,
        CommandTask::Depth(cmd) => depth(&config, cmd)?,
        CommandTask::Sectors => {
            println!("{}", SectorTable::new(config.render.distance_range).to_ron()?);
        }
        CommandTask::Listen(cmd) => listen(&config, cmd)?,
        CommandTask::Demo(cmd) => demo(&config, cmd)?,
    }
    Ok(())
}

fn render_to(config: &EngineConfig, picked: &SectorMap, out: &Path) -> Result<()> {
    let audio = Sequencer::new(config.render.clone()).render(picked);
    write_wav(out, &audio)?;
    info!(
        "Wrote {:.2} s of {} audio to {}",
        audio.duration_secs(),
        config.render.mode,
        out.display()
    );
    Ok(())
}

fn render(config: &EngineConfig, cmd: RenderCommand, seed: u64) -> Result<()> {
    let (picked, targets) = config.analyze(cmd.source.load(seed)?);
    for target in &targets {
        info!(
            "#{} {} at {:.2} m (score {:.3})",
            target.rank, target.obstacle.sector, target.obstacle.distance, target.score
        );
    }
    render_to(config, &picked, &cmd.outfile)
}

fn boundary(config: &EngineConfig, cmd: BoundaryCommand) -> Result<()> {
    let input = BoundaryInput {
        bbox: BoundingBox {
            x: cmd.x,
            y: cmd.y,
            width: cmd.width,
            height: cmd.height,
        },
        depth_value: cmd.depth,
        image_width: cmd.image_width,
        image_height: cmd.image_height,
        focal_length: cmd.focal_length,
    };
    report_boundary(config, &input, cmd.outfile.as_deref())
}

/// Classifies a camera obstacle, prints its report and optionally renders it.
fn report_boundary(config: &EngineConfig, input: &BoundaryInput, out: Option<&Path>) -> Result<()> {
    let analysis = process_boundary_obstacle_with(input, config.max_targets)?;
    let report = AnalysisReport::from_boundary(&analysis, &config.render.distance_range);
    println!("{}", report.to_ron()?);

    if let Some(out) = out {
        render_to(config, &analysis.obstacles, out)?;
    }
    Ok(())
}

fn depth(config: &EngineConfig, cmd: DepthCommand) -> Result<()> {
    let map = DepthMap::from_ron(&fs::read_to_string(&cmd.map)?)?;
    let Some(region) = find_closest_region(&map, &config.region) else {
        warn!("No region in {} passed the closeness threshold", cmd.map.display());
        return Ok(());
    };
    info!(
        "Closest region at ({}, {}), {} px, depth {:.2}",
        region.cx, region.cy, region.area, region.depth
    );
    let input = region.to_boundary_input(map.width(), map.height(), cmd.focal_length);
    report_boundary(config, &input, cmd.outfile.as_deref())
}

fn demo(config: &EngineConfig, cmd: DemoCommand) -> Result<()> {
    fs::create_dir_all(&cmd.out_dir)?;
    for scenario in SCENARIOS.iter() {
        info!("Scenario: {scenario}");
        let (picked, _) = config.analyze(scenario.cloud());
        let out = cmd.out_dir.join(format!("{}.wav", scenario.slug));
        render_to(config, &picked, &out)?;
        println!("{}", out.display());
    }
    Ok(())
}

/// Asks the user which serial device to open.
fn prompt_for_port() -> Result<String> {
    println!("Available devices:");
    for port in SerialPort::available_ports()? {
        println!("\t{}", port.to_string_lossy());
    }
    println!("Enter the device name: ");
    let mut device_name = String::new();
    io::stdin().read_line(&mut device_name)?;
    Ok(device_name.trim().to_owned())
}

fn listen(config: &EngineConfig, cmd: ListenCommand) -> Result<()> {
    let name = match cmd.port.or_else(|| config.serial.port.clone()) {
        Some(name) => name,
        None => prompt_for_port()?,
    };
    let baud_rate = cmd.baud_rate.unwrap_or(config.serial.baud_rate);

    let mut port = SerialPort::open(&name, baud_rate)?;
    port.set_read_timeout(Duration::from_secs(1))?;
    info!("Listening on {name} at {baud_rate} baud");

    let mut buffer = [0; 256];
    let mut lines = LineAssembler::new();
    loop {
        let read_len = match port.read(&mut buffer) {
            Ok(0) => {
                warn!("{name} closed");
                return Ok(());
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => return Err(e.into()),
        };

        for reading in lines.push(&buffer[..read_len]) {
            match reading {
                Ok(reading) => {
                    println!("{reading}");
                    debug!("Active switches: {:?}", reading.active().collect::<Vec<_>>());
                }
                Err(e) => warn!("Was unable to parse sensor line: {e}"),
            }
        }
    }
}
