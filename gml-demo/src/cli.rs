use std::path::PathBuf;

use bpaf::{batteries::verbose_by_slice, construct, long, OptionParser, Parser};
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone)]
pub struct Options {
    pub verbosity_level: LevelFilter,
    pub settings_path: Option<PathBuf>,
    pub workers: Option<usize>,
    pub frames: u32,
    pub particles: usize,
}

pub fn options() -> OptionParser<Options> {
    let verbosity_level = verbose_by_slice(
        2,
        [
            LevelFilter::OFF,
            LevelFilter::ERROR,
            LevelFilter::WARN,
            LevelFilter::INFO,
            LevelFilter::DEBUG,
            LevelFilter::TRACE,
        ],
    );

    let settings_path = long("settings")
        .help("Reads the GML configuration from a JSON file, if it exists")
        .argument::<PathBuf>("FILE")
        .complete_shell(bpaf::ShellComp::File { mask: Some("*.json") })
        .optional();

    let workers = long("workers")
        .short('w')
        .help("Amount of worker threads, overrides max_workers of the settings file. Defaults to one per CPU core")
        .argument::<usize>("N")
        .optional();

    let frames = long("frames")
        .help("Amount of frames to simulate")
        .argument::<u32>("N")
        .fallback(60);

    let particles = long("particles")
        .help("Amount of smoke particles alive at once")
        .argument::<usize>("N")
        .fallback(2000);

    construct!(Options {
        verbosity_level,
        settings_path,
        workers,
        frames,
        particles,
    })
    .to_options()
    .descr("Draws smoke particles from worker threads through deferred graphics calls")
}

#[cfg(test)]
mod tests {
    use super::options;

    #[test]
    fn check_bpaf_invariants() {
        options().check_invariants(true);
    }

    #[test]
    fn counts_have_defaults() {
        let options = options().run_inner(&["-w", "3"]).unwrap();
        assert_eq!(Some(3), options.workers);
        assert_eq!(60, options.frames);
        assert_eq!(2000, options.particles);
        assert_eq!(None, options.settings_path);
    }
}
