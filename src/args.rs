//! Command line argument parser for SenseNav, using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::EngineConfig;
use crate::dummy_cloud::{random_ring, random_scatter, scenario, SCENARIOS};
use crate::error::{Result, SenseNavError};
use crate::geometry::PointCloud;
use crate::sequencer::Mode;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
/// Turns obstacle positions into spatial audio cues
pub struct SenseNavArgs {
    #[command(subcommand)]
    /// Which task to perform
    pub command: CommandTask,

    /// RON configuration file; flags below override its values
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Render mode: sequential, priority, unified or all
    #[arg(short = 'm', long = "mode", global = true)]
    pub mode: Option<Mode>,

    /// Requested output length, seconds
    #[arg(short = 'd', long = "duration", global = true)]
    pub duration: Option<f64>,

    /// Output sample rate, Hz
    #[arg(long = "samp", global = true)]
    pub sample_rate: Option<u32>,

    /// Number of targets the ranker keeps and the sequential sweep plays
    #[arg(short = 't', long = "targets", global = true)]
    pub max_targets: Option<usize>,

    /// Ignore points behind the listener
    #[arg(long = "ignore-behind", global = true)]
    pub ignore_behind: bool,

    /// Seed for --ring and --scatter clouds
    #[arg(long = "seed", global = true, default_value_t = 0)]
    pub seed: u64,
}

impl SenseNavArgs {
    /// The configuration file (or defaults) with command line overrides
    /// applied.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_path(path)?,
            None => EngineConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.render.mode = mode;
        }
        if let Some(duration) = self.duration {
            config.render.duration = duration;
        }
        if let Some(sample_rate) = self.sample_rate {
            config.render.sample_rate = sample_rate;
        }
        if let Some(max_targets) = self.max_targets {
            config.max_targets = max_targets;
            config.render.sequential.max_targets = max_targets;
        }
        config.ignore_behind |= self.ignore_behind;
        config.validate()?;
        Ok(config)
    }
}

/// The subcommands.
#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Classify a point cloud and print the obstacle report
    #[command(about)]
    Analyze(CloudSource),

    /// Classify a point cloud and render its cues to a WAV file
    #[command(about)]
    Render(RenderCommand),

    /// Classify a bounding-box obstacle from a camera image
    #[command(about)]
    Boundary(BoundaryCommand),

    /// Find the closest region in a depth map and classify it
    #[command(about)]
    Depth(DepthCommand),

    /// Print the sector table
    #[command(about)]
    Sectors,

    /// Print decoded readings from the sensor board
    #[command(about)]
    Listen(ListenCommand),

    /// Render every built-in scenario to WAV files
    #[command(about)]
    Demo(DemoCommand),
}

/// Where the points come from.
#[derive(Debug, Args, Clone)]
#[group(required = true, multiple = false)]
pub struct CloudSource {
    /// RON file holding a list of [x, y, z] rows, in meters
    #[arg(short = 'p', long = "points")]
    pub points: Option<PathBuf>,

    /// Name of a built-in scenario, e.g. front-left or complex-3d
    #[arg(short = 's', long = "scenario")]
    pub scenario: Option<String>,

    /// This many points on a noisy level ring around the listener
    #[arg(long = "ring")]
    pub ring: Option<usize>,

    /// This many points scattered in every direction
    #[arg(long = "scatter")]
    pub scatter: Option<usize>,
}

/// Radius of `--ring` clouds, m
const RING_RADIUS: f64 = 1.5;
/// Jitter of `--ring` points, m
const RING_NOISE: f64 = 0.1;
/// Distances `--scatter` points fall between, m
const SCATTER_RANGE: (f64, f64) = (0.5, 4.0);

impl CloudSource {
    /// Loads the cloud from whichever source was given. `seed` only matters
    /// for the random sources.
    pub fn load(&self, seed: u64) -> Result<PointCloud> {
        if let Some(path) = &self.points {
            return PointCloud::from_ron(&std::fs::read_to_string(path)?);
        }
        if let Some(slug) = &self.scenario {
            return scenario(slug).map(|s| s.cloud()).ok_or_else(|| {
                let known: Vec<&str> = SCENARIOS.iter().map(|s| s.slug).collect();
                SenseNavError::InvalidPointCloud(format!(
                    "no scenario named {slug:?}, try one of {}",
                    known.join(", ")
                ))
            });
        }
        if let Some(n) = self.ring {
            return Ok(random_ring(n, RING_RADIUS, RING_NOISE, seed));
        }
        if let Some(n) = self.scatter {
            return Ok(random_scatter(n, SCATTER_RANGE.0, SCATTER_RANGE.1, seed));
        }
        Err(SenseNavError::InvalidPointCloud(
            "give one of --points, --scenario, --ring or --scatter".to_owned(),
        ))
    }
}

/// Arguments of `render`.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct RenderCommand {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub source: CloudSource,

    /// Filename for the rendered audio to be written to
    #[arg(short = 'o', long = "out")]
    pub outfile: PathBuf,
}

/// Arguments of `boundary`.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct BoundaryCommand {
    /// Left edge of the box, px
    #[arg(short = 'x')]
    pub x: f64,

    /// Top edge of the box, px
    #[arg(short = 'y')]
    pub y: f64,

    /// Box width, px
    #[arg(long = "width")]
    pub width: f64,

    /// Box height, px
    #[arg(long = "height")]
    pub height: f64,

    /// Obstacle depth, m
    #[arg(long = "depth")]
    pub depth: f64,

    /// Image width, px
    #[arg(long = "image-width", default_value_t = 320.0)]
    pub image_width: f64,

    /// Image height, px
    #[arg(long = "image-height", default_value_t = 240.0)]
    pub image_height: f64,

    /// Focal length, px; defaults to the larger image side
    #[arg(short = 'f', long = "focal")]
    pub focal_length: Option<f64>,

    /// Also render the obstacle's cues to this WAV file
    #[arg(short = 'o', long = "out")]
    pub outfile: Option<PathBuf>,
}

/// Arguments of `depth`.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct DepthCommand {
    /// RON file holding `(width: W, height: H, data: [...])`, rows first
    #[arg(short = 'i', long = "map")]
    pub map: PathBuf,

    /// Focal length, px; defaults to the larger image side
    #[arg(short = 'f', long = "focal")]
    pub focal_length: Option<f64>,

    /// Also render the region's cues to this WAV file
    #[arg(short = 'o', long = "out")]
    pub outfile: Option<PathBuf>,
}

/// Arguments of `listen`.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct ListenCommand {
    /// Serial device, e.g. /dev/ttyUSB0; prompted for if not given
    #[arg(long = "port")]
    pub port: Option<String>,

    /// Line speed
    #[arg(short = 'b', long = "baud")]
    pub baud_rate: Option<u32>,
}

/// Arguments of `demo`.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct DemoCommand {
    /// Directory the scenario files are written to
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_source() -> CloudSource {
        CloudSource {
            points: None,
            scenario: None,
            ring: None,
            scatter: None,
        }
    }

    #[test]
    fn render_with_overrides() {
        let args = SenseNavArgs::try_parse_from([
            "sensenav", "render", "--scenario", "front-left", "-o", "out.wav", "--mode", "sequential", "-d", "2.3",
        ])
        .unwrap();
        let config = args.engine_config().unwrap();
        assert_eq!(config.render.mode, Mode::Sequential);
        assert_eq!(config.render.duration, 2.3);
        assert_eq!(config.render.sample_rate, 48000);
        match args.command {
            CommandTask::Render(cmd) => {
                assert_eq!(cmd.outfile, PathBuf::from("out.wav"));
                assert_eq!(cmd.source.load(args.seed).unwrap().len(), 1);
            }
            other => panic!("parsed {other:?}"),
        }
    }

    #[test]
    fn targets_flag_limits_the_sequential_sweep() {
        let args = SenseNavArgs::try_parse_from(["sensenav", "-t", "2", "sectors"]).unwrap();
        let config = args.engine_config().unwrap();
        assert_eq!(config.max_targets, 2);
        assert_eq!(config.render.sequential.max_targets, 2);

        let args = SenseNavArgs::try_parse_from(["sensenav", "sectors"]).unwrap();
        assert_eq!(args.engine_config().unwrap().render.sequential.max_targets, 6);
    }

    #[test]
    fn unrenderable_overrides_are_errors() {
        let cases: [&[&str]; 3] = [
            &["sensenav", "sectors", "--samp", "0"],
            &["sensenav", "sectors", "--duration=-1"],
            &["sensenav", "sectors", "-d", "inf"],
        ];
        for argv in cases {
            let args = SenseNavArgs::try_parse_from(argv).unwrap();
            assert!(
                matches!(args.engine_config(), Err(SenseNavError::InvalidConfig(_))),
                "{argv:?}"
            );
        }
    }

    #[test]
    fn cloud_source_is_required_and_exclusive() {
        assert!(SenseNavArgs::try_parse_from(["sensenav", "analyze"]).is_err());
        assert!(SenseNavArgs::try_parse_from(["sensenav", "analyze", "-s", "overhead", "-p", "a.ron"]).is_err());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(SenseNavArgs::try_parse_from(["sensenav", "sectors", "--mode", "loud"]).is_err());
    }

    #[test]
    fn unknown_scenario_lists_the_known_ones() {
        let source = CloudSource {
            scenario: Some("nowhere".into()),
            ..no_source()
        };
        let msg = source.load(0).unwrap_err().to_string();
        assert!(msg.contains("complex-3d"));
    }

    #[test]
    fn boundary_defaults_to_a_small_camera() {
        let args = SenseNavArgs::try_parse_from([
            "sensenav", "boundary", "-x", "100", "-y", "50", "--width", "80", "--height", "60", "--depth", "0.5",
        ])
        .unwrap();
        match args.command {
            CommandTask::Boundary(cmd) => {
                assert_eq!((cmd.image_width, cmd.image_height), (320.0, 240.0));
                assert!(cmd.focal_length.is_none());
            }
            other => panic!("parsed {other:?}"),
        }
    }

    #[test]
    fn points_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.ron");
        std::fs::write(&path, "[[2.0, 1.5, 0.0], [-1.0, 0.5, 0.2]]").unwrap();
        let source = CloudSource {
            points: Some(path),
            ..no_source()
        };
        assert_eq!(source.load(0).unwrap().len(), 2);
    }

    #[test]
    fn random_sources_follow_the_seed() {
        let args = SenseNavArgs::try_parse_from(["sensenav", "analyze", "--ring", "12", "--seed", "7"]).unwrap();
        let CommandTask::Analyze(source) = &args.command else {
            panic!("parsed {:?}", args.command);
        };
        let first = source.load(args.seed).unwrap();
        assert_eq!(first.len(), 12);
        assert_eq!(source.load(args.seed).unwrap(), first);
        assert_ne!(source.load(args.seed + 1).unwrap(), first);

        let scatter = CloudSource {
            scatter: Some(20),
            ..no_source()
        };
        let cloud = scatter.load(3).unwrap();
        assert_eq!(cloud.len(), 20);
        assert!(cloud.points().iter().all(|p| (0.5 - 1e-9..=4.0 + 1e-9).contains(&p.range())));
    }

    #[test]
    fn ring_and_scenario_are_exclusive() {
        assert!(SenseNavArgs::try_parse_from(["sensenav", "analyze", "--ring", "4", "-s", "overhead"]).is_err());
    }

    #[test]
    fn depth_takes_a_map_file() {
        let args = SenseNavArgs::try_parse_from(["sensenav", "depth", "-i", "map.ron", "-f", "200"]).unwrap();
        match args.command {
            CommandTask::Depth(cmd) => {
                assert_eq!(cmd.map, PathBuf::from("map.ron"));
                assert_eq!(cmd.focal_length, Some(200.0));
                assert!(cmd.outfile.is_none());
            }
            other => panic!("parsed {other:?}"),
        }
    }
}
